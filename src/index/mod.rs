pub mod elastic;
pub mod mock;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{error::DriftsyncError, model::IndexMappings, settings::merge::EffectiveSettings};

/// The slice of the store's wire representation the engine consumes: the
/// index-level settings node, the analysis node and the mapping field tree.
/// Fetched on demand and never cached, freshness matters more than speed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveIndexState {
  pub index: Map<String, Value>,
  pub analysis: Map<String, Value>,
  pub properties: Map<String, Value>,
}

/// Capabilities one search store backend supplies to the engine: live state
/// resolution, structural writes, and the native settings model desired
/// fragments must round-trip through.
///
/// `fetch_state` returns `Ok(None)` for an absent index; an unreachable
/// store must surface as an error, the two are never conflated.
#[allow(async_fn_in_trait)]
pub trait SearchStore: Clone + Send + Sync + 'static {
  type NativeSettings: Serialize + DeserializeOwned + Send + Sync;

  fn fetch_state(&self, index: &str) -> impl Future<Output = Result<Option<LiveIndexState>, DriftsyncError>> + Send;
  fn create_index(&self, index: &str, settings: &EffectiveSettings, mappings: &IndexMappings) -> impl Future<Output = Result<(), DriftsyncError>> + Send;
  fn delete_index(&self, index: &str) -> impl Future<Output = Result<(), DriftsyncError>> + Send;
  fn update_settings(&self, index: &str, settings: &EffectiveSettings) -> impl Future<Output = Result<(), DriftsyncError>> + Send;
  fn update_mappings(&self, index: &str, mappings: &IndexMappings) -> impl Future<Output = Result<(), DriftsyncError>> + Send;
}
