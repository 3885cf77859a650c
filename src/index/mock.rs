use std::{
  collections::{HashMap, HashSet},
  sync::{Arc, Mutex},
};

use ahash::RandomState;
use bon::bon;
use serde_json::Value;

use crate::{
  error::DriftsyncError,
  index::{LiveIndexState, SearchStore},
  model::IndexMappings,
  settings::merge::EffectiveSettings,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreOperation {
  Create(String),
  Delete(String),
  UpdateSettings(String),
  UpdateMappings(String),
}

/// In-memory store for tests: serves canned live states and records every
/// structural operation issued against it.
#[derive(Clone, Default)]
pub struct MockedSearchStore {
  states: Arc<Mutex<HashMap<String, LiveIndexState, RandomState>>>,
  failing: Arc<HashSet<String, RandomState>>,
  operations: Arc<Mutex<Vec<StoreOperation>>>,
}

#[bon]
impl MockedSearchStore {
  #[builder]
  pub fn new(states: Option<Vec<(String, LiveIndexState)>>, failing: Option<Vec<String>>) -> MockedSearchStore {
    MockedSearchStore {
      states: Arc::new(Mutex::new(states.unwrap_or_default().into_iter().collect())),
      failing: Arc::new(failing.unwrap_or_default().into_iter().collect()),
      operations: Default::default(),
    }
  }

  pub fn operations(&self) -> Vec<StoreOperation> {
    self.operations.lock().unwrap().clone()
  }

  pub fn state_of(&self, index: &str) -> Option<LiveIndexState> {
    self.states.lock().unwrap().get(index).cloned()
  }

  fn record(&self, operation: StoreOperation) {
    self.operations.lock().unwrap().push(operation);
  }
}

impl SearchStore for MockedSearchStore {
  type NativeSettings = Value;

  async fn fetch_state(&self, index: &str) -> Result<Option<LiveIndexState>, DriftsyncError> {
    if self.failing.contains(index) {
      return Err(DriftsyncError::StoreUnavailable("mocked connection failure".to_string()));
    }

    Ok(self.states.lock().unwrap().get(index).cloned())
  }

  async fn create_index(&self, index: &str, settings: &EffectiveSettings, mappings: &IndexMappings) -> Result<(), DriftsyncError> {
    let properties = serde_json::to_value(&mappings.properties).ok().and_then(|value| value.as_object().cloned()).unwrap_or_default();

    let state = LiveIndexState { index: settings.index.clone(), analysis: settings.analysis.clone(), properties };

    self.states.lock().unwrap().insert(index.to_string(), state);
    self.record(StoreOperation::Create(index.to_string()));

    Ok(())
  }

  async fn delete_index(&self, index: &str) -> Result<(), DriftsyncError> {
    self.states.lock().unwrap().remove(index);
    self.record(StoreOperation::Delete(index.to_string()));

    Ok(())
  }

  async fn update_settings(&self, index: &str, settings: &EffectiveSettings) -> Result<(), DriftsyncError> {
    if let Some(state) = self.states.lock().unwrap().get_mut(index) {
      state.index.extend(settings.index.clone());
      state.analysis.extend(settings.analysis.clone());
    }

    self.record(StoreOperation::UpdateSettings(index.to_string()));

    Ok(())
  }

  async fn update_mappings(&self, index: &str, mappings: &IndexMappings) -> Result<(), DriftsyncError> {
    if let Some(state) = self.states.lock().unwrap().get_mut(index) {
      state.properties = serde_json::to_value(&mappings.properties).ok().and_then(|value| value.as_object().cloned()).unwrap_or_default();
    }

    self.record(StoreOperation::UpdateMappings(index.to_string()));

    Ok(())
  }
}
