pub mod merge;

use std::collections::HashMap;

use ahash::RandomState;
use serde_json::{Map, Value};

use crate::model::{EntityType, IndexConfigurationRegistry};

/// Pluggable contributor of settings fragments. System configurers run before
/// custom ones, so user-supplied fragments can override framework defaults;
/// within each group, registration order is invocation order.
pub trait SettingsConfigurer: Send + Sync {
  fn is_system(&self) -> bool {
    false
  }

  fn configure(&self, context: &mut ConfigurationContext);
}

/// Shared mutable store of settings fragments, built once per process by
/// running every registered configurer. Conflicting keys are not detected,
/// whichever configurer writes last wins.
#[derive(Debug, Default)]
pub struct ConfigurationContext {
  pub(crate) common_index: Map<String, Value>,
  pub(crate) common_analysis: Map<String, Value>,
  pub(crate) entity_index: HashMap<EntityType, Map<String, Value>, RandomState>,
  pub(crate) entity_analysis: HashMap<EntityType, Map<String, Value>, RandomState>,
}

impl ConfigurationContext {
  /// Global index-level settings fragment, applied to every index.
  pub fn common_index(&mut self) -> &mut Map<String, Value> {
    &mut self.common_index
  }

  /// Global analysis fragment (analyzers, tokenizers, filters).
  pub fn common_analysis(&mut self) -> &mut Map<String, Value> {
    &mut self.common_analysis
  }

  /// Index-level settings fragment for one entity type.
  pub fn index_for(&mut self, entity: &EntityType) -> &mut Map<String, Value> {
    self.entity_index.entry(entity.clone()).or_default()
  }

  /// Analysis fragment for one entity type.
  pub fn analysis_for(&mut self, entity: &EntityType) -> &mut Map<String, Value> {
    self.entity_analysis.entry(entity.clone()).or_default()
  }
}

/// Bridges declarative per-entity overrides carried by `IndexConfiguration`s
/// into the configurer pipeline. Registered like any other custom configurer.
pub struct DeclaredSettingsConfigurer {
  declared: Vec<(EntityType, Option<Map<String, Value>>, Option<Map<String, Value>>)>,
}

impl DeclaredSettingsConfigurer {
  pub fn from_registry(registry: &IndexConfigurationRegistry) -> DeclaredSettingsConfigurer {
    let declared = registry
      .iter()
      .filter(|configuration| configuration.index_settings.is_some() || configuration.analysis_settings.is_some())
      .map(|configuration| (configuration.entity.clone(), configuration.index_settings.clone(), configuration.analysis_settings.clone()))
      .collect();

    DeclaredSettingsConfigurer { declared }
  }
}

impl SettingsConfigurer for DeclaredSettingsConfigurer {
  fn configure(&self, context: &mut ConfigurationContext) {
    for (entity, index, analysis) in &self.declared {
      if let Some(fragment) = index {
        context.index_for(entity).extend(fragment.clone());
      }

      if let Some(fragment) = analysis {
        context.analysis_for(entity).extend(fragment.clone());
      }
    }
  }
}
