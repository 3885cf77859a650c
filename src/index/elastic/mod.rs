mod builder;

pub use builder::EsAuthMethod;

use std::collections::HashMap;

use elasticsearch::{
  Elasticsearch,
  http::response::Response,
  indices::{IndicesCreateParts, IndicesDeleteParts, IndicesGetParts, IndicesPutMappingParts, IndicesPutSettingsParts},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::{
  compare::DYNAMIC_INDEX_SETTINGS,
  error::DriftsyncError,
  index::{LiveIndexState, SearchStore},
  model::IndexMappings,
  settings::merge::EffectiveSettings,
};

/// Store backend over the official Elasticsearch client.
#[derive(Clone)]
pub struct ElasticsearchStore {
  pub es: Elasticsearch,
}

#[derive(Deserialize)]
struct EsErrorResponse {
  error: EsError,
}

#[allow(dead_code)]
#[derive(Deserialize)]
struct EsError {
  #[serde(rename = "type")]
  type_: String,
  reason: String,
}

#[derive(Deserialize)]
struct EsIndexState {
  #[serde(default)]
  settings: EsStateSettings,
  #[serde(default)]
  mappings: EsStateMappings,
}

#[derive(Default, Deserialize)]
struct EsStateSettings {
  #[serde(default)]
  index: Map<String, Value>,
  #[serde(default)]
  analysis: Map<String, Value>,
}

#[derive(Default, Deserialize)]
struct EsStateMappings {
  #[serde(default)]
  properties: Map<String, Value>,
}

impl From<EsIndexState> for LiveIndexState {
  fn from(state: EsIndexState) -> Self {
    let mut index = state.settings.index;
    let mut analysis = state.settings.analysis;

    // On the wire, analysis nests inside the index settings node.
    if let Some(Value::Object(nested)) = index.remove("analysis") {
      analysis.extend(nested);
    }

    LiveIndexState { index, analysis, properties: state.mappings.properties }
  }
}

/// Typed model of the settings body Elasticsearch accepts. Contributed
/// fragments and merge results are round-tripped through it, so a fragment
/// with, say, a scalar where an analyzer map belongs is rejected before any
/// request is issued.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EsIndexSettings {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub index: Option<EsIndexSection>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analysis: Option<EsAnalysisSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EsIndexSection {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub number_of_shards: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub number_of_replicas: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub refresh_interval: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_result_window: Option<Value>,
  #[serde(default, flatten)]
  pub other: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EsAnalysisSection {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analyzer: Option<Map<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub normalizer: Option<Map<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tokenizer: Option<Map<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filter: Option<Map<String, Value>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub char_filter: Option<Map<String, Value>>,
}

impl SearchStore for ElasticsearchStore {
  type NativeSettings = EsIndexSettings;

  #[instrument(skip_all)]
  async fn fetch_state(&self, index: &str) -> Result<Option<LiveIndexState>, DriftsyncError> {
    let response = self
      .es
      .indices()
      .get(IndicesGetParts::Index(&[index]))
      .send()
      .await
      .map_err(|cause| DriftsyncError::StoreUnavailable(cause.to_string()))?;

    if response.status_code() == StatusCode::NOT_FOUND {
      tracing::debug!(index, "no live index");

      return Ok(None);
    }

    if response.status_code() != StatusCode::OK {
      let body: EsErrorResponse = response.json().await?;

      return Err(DriftsyncError::OtherError(anyhow::anyhow!("could not fetch state of '{index}': {}", body.error.reason)));
    }

    let body: HashMap<String, EsIndexState> = response.json().await?;

    match body.into_values().next() {
      Some(state) => {
        tracing::debug!(index, "fetched live index state");

        Ok(Some(state.into()))
      }

      None => Ok(None),
    }
  }

  #[instrument(skip_all)]
  async fn create_index(&self, index: &str, settings: &EffectiveSettings, mappings: &IndexMappings) -> Result<(), DriftsyncError> {
    let body = json!({ "settings": settings, "mappings": mappings });

    let response = self.es.indices().create(IndicesCreateParts::Index(index)).body(body).send().await?;

    ensure_success(response, index, "could not create index").await?;

    tracing::info!(index, "created index");

    Ok(())
  }

  #[instrument(skip_all)]
  async fn delete_index(&self, index: &str) -> Result<(), DriftsyncError> {
    let response = self.es.indices().delete(IndicesDeleteParts::Index(&[index])).send().await?;

    ensure_success(response, index, "could not delete index").await?;

    tracing::info!(index, "deleted index");

    Ok(())
  }

  #[instrument(skip_all)]
  async fn update_settings(&self, index: &str, settings: &EffectiveSettings) -> Result<(), DriftsyncError> {
    // Only dynamic keys go on the wire: when an in-place update was decided,
    // every static setting already matches, and the live-settings API
    // rejects static keys even at their current values.
    let dynamic = settings
      .index
      .iter()
      .filter(|(key, _)| DYNAMIC_INDEX_SETTINGS.contains(&key.as_str()))
      .map(|(key, value)| (key.clone(), value.clone()))
      .collect::<Map<String, Value>>();

    let response = self.es.indices().put_settings(IndicesPutSettingsParts::Index(&[index])).body(json!({ "index": dynamic })).send().await?;

    ensure_success(response, index, "could not update settings").await?;

    tracing::info!(index, "updated index settings");

    Ok(())
  }

  #[instrument(skip_all)]
  async fn update_mappings(&self, index: &str, mappings: &IndexMappings) -> Result<(), DriftsyncError> {
    let response = self.es.indices().put_mapping(IndicesPutMappingParts::Index(&[index])).body(mappings).send().await?;

    ensure_success(response, index, "could not update mappings").await?;

    tracing::info!(index, "updated index mappings");

    Ok(())
  }
}

async fn ensure_success(response: Response, index: &str, action: &str) -> Result<(), DriftsyncError> {
  if response.status_code().is_success() {
    return Ok(());
  }

  let body: EsErrorResponse = response.json().await?;

  Err(DriftsyncError::OtherError(anyhow::anyhow!("{action} '{index}': {}", body.error.reason)))
}
