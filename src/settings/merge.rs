use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use ahash::RandomState;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{
  error::DriftsyncError,
  model::EntityType,
  settings::{ConfigurationContext, SettingsConfigurer},
};

/// Per-entity-type merge result of the common and entity-specific fragments.
/// Serializes to the exact JSON shape of the store's settings-update body, so
/// it can be sent as a request body without further transformation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EffectiveSettings {
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub index: Map<String, Value>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub analysis: Map<String, Value>,
}

/// Overlays an entity-specific fragment onto a copy of the common fragment,
/// one level deep: object-typed children of a shared top-level key overwrite
/// the common object's immediate children wholesale, object-typed children
/// under a new key are inserted as-is. Scalar top-level values in the
/// specific fragment are not applied; the common value, if any, survives.
/// That last point mirrors the historical merge behavior exactly, see the
/// pinning test below before changing it.
pub(crate) fn two_level_merge(common: &Map<String, Value>, specific: &Map<String, Value>) -> Map<String, Value> {
  let mut merged = common.clone();

  for (key, value) in specific {
    if let Value::Object(specific_child) = value {
      match merged.get_mut(key) {
        Some(Value::Object(base_child)) => {
          for (name, child) in specific_child {
            base_child.insert(name.clone(), child.clone());
          }
        }

        _ => {
          merged.insert(key.clone(), Value::Object(specific_child.clone()));
        }
      }
    }
  }

  merged
}

/// Builds the configuration context from the registered configurers and
/// resolves effective settings per entity type.
///
/// `N` is the store backend's native settings model: every contributed
/// fragment must round-trip through it (checked when the registry is built),
/// and so must every merge result (checked on first resolution).
///
/// Resolved settings are cached for the lifetime of the process; nothing is
/// ever evicted, a new deployment restarts the process.
pub struct SettingsRegistry<N> {
  context: ConfigurationContext,
  common: Arc<EffectiveSettings>,
  cache: RwLock<HashMap<EntityType, Arc<EffectiveSettings>, RandomState>>,
  _native: PhantomData<fn() -> N>,
}

impl<N: DeserializeOwned> SettingsRegistry<N> {
  /// Partitions configurers into system and custom, runs system first and
  /// custom second (registration order within each group), then validates
  /// every contributed fragment against the store settings model.
  pub fn build(configurers: Vec<Box<dyn SettingsConfigurer>>) -> Result<SettingsRegistry<N>, DriftsyncError> {
    let (system, custom): (Vec<_>, Vec<_>) = configurers.into_iter().partition(|configurer| configurer.is_system());

    let mut context = ConfigurationContext::default();

    for configurer in system.iter().chain(custom.iter()) {
      configurer.configure(&mut context);
    }

    Self::validate(&context)?;

    tracing::debug!(system = system.len(), custom = custom.len(), entities = context.entity_index.len().max(context.entity_analysis.len()), "built settings configuration context");

    let common = Arc::new(EffectiveSettings { index: context.common_index.clone(), analysis: context.common_analysis.clone() });

    Ok(SettingsRegistry { context, common, cache: RwLock::new(HashMap::default()), _native: PhantomData })
  }

  /// Effective settings for one entity type, computed on first request and
  /// cached afterwards. Two tasks racing the first access may both compute
  /// the value, the computation is pure; the first stored entry wins.
  pub async fn effective_settings(&self, entity: &EntityType) -> Result<Arc<EffectiveSettings>, DriftsyncError> {
    if let Some(cached) = self.cache.read().await.get(entity) {
      return Ok(Arc::clone(cached));
    }

    let computed = self.compute(entity)?;

    let mut cache = self.cache.write().await;

    Ok(Arc::clone(cache.entry(entity.clone()).or_insert(computed)))
  }

  fn compute(&self, entity: &EntityType) -> Result<Arc<EffectiveSettings>, DriftsyncError> {
    let specific_index = self.context.entity_index.get(entity);
    let specific_analysis = self.context.entity_analysis.get(entity);

    if specific_index.is_none() && specific_analysis.is_none() {
      return Ok(Arc::clone(&self.common));
    }

    let index = match specific_index {
      Some(fragment) => two_level_merge(&self.context.common_index, fragment),
      None => self.context.common_index.clone(),
    };

    let analysis = match specific_analysis {
      Some(fragment) => two_level_merge(&self.context.common_analysis, fragment),
      None => self.context.common_analysis.clone(),
    };

    let effective = EffectiveSettings { index, analysis };

    round_trip::<N>(&effective).map_err(|cause| DriftsyncError::SerializationError(entity.to_string(), cause))?;

    tracing::debug!(%entity, "computed effective index settings");

    Ok(Arc::new(effective))
  }

  fn validate(context: &ConfigurationContext) -> Result<(), DriftsyncError> {
    round_trip::<N>(&EffectiveSettings { index: context.common_index.clone(), analysis: context.common_analysis.clone() })
      .map_err(|cause| DriftsyncError::ConfigError(format!("common settings fragment does not fit the store settings model: {cause}")))?;

    for (entity, fragment) in &context.entity_index {
      round_trip::<N>(&EffectiveSettings { index: fragment.clone(), analysis: Map::new() })
        .map_err(|cause| DriftsyncError::ConfigError(format!("index settings fragment for '{entity}' does not fit the store settings model: {cause}")))?;
    }

    for (entity, fragment) in &context.entity_analysis {
      round_trip::<N>(&EffectiveSettings { index: Map::new(), analysis: fragment.clone() })
        .map_err(|cause| DriftsyncError::ConfigError(format!("analysis fragment for '{entity}' does not fit the store settings model: {cause}")))?;
    }

    Ok(())
  }
}

fn round_trip<N: DeserializeOwned>(settings: &EffectiveSettings) -> Result<(), serde_json::Error> {
  serde_json::from_value::<N>(serde_json::to_value(settings)?)?;

  Ok(())
}
