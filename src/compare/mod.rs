mod mapping;
mod settings;

pub use mapping::MappingComparator;
pub use settings::{DYNAMIC_INDEX_SETTINGS, EsSettingsComparator, SettingsComparator};

use std::sync::Arc;

use tracing::instrument;

use crate::{
  error::DriftsyncError,
  index::{LiveIndexState, SearchStore},
  model::IndexConfiguration,
  settings::merge::SettingsRegistry,
};

/// Drift between desired and live structure in one domain, ordered by
/// severity: recreation-requiring drift outweighs applicable drift, which
/// outweighs no drift.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ComparingVerdict {
  /// No drift.
  Equal,
  /// Drift exists but can be applied without destroying the index.
  Compatible,
  /// Drift requires full index recreation.
  NotCompatible,
}

impl ComparingVerdict {
  pub fn requires_recreation(self) -> bool {
    self == ComparingVerdict::NotCompatible
  }

  pub fn requires_update(self) -> bool {
    self != ComparingVerdict::Equal
  }
}

/// Per-domain verdict pair produced by one comparison run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfigurationComparingResult {
  pub mapping: ComparingVerdict,
  pub settings: ComparingVerdict,
}

impl ConfigurationComparingResult {
  pub(crate) const RECREATION_REQUIRED: ConfigurationComparingResult = ConfigurationComparingResult { mapping: ComparingVerdict::NotCompatible, settings: ComparingVerdict::NotCompatible };

  pub fn needs_recreation(&self) -> bool {
    self.mapping.requires_recreation() || self.settings.requires_recreation()
  }

  pub fn needs_update(&self) -> bool {
    self.mapping.requires_update() || self.settings.requires_update()
  }

  pub fn mapping_update_required(&self) -> bool {
    self.mapping.requires_update()
  }

  pub fn settings_update_required(&self) -> bool {
    self.settings.requires_update()
  }
}

/// Compares one entity type's desired configuration against the live state
/// held by the store. Store-agnostic: the backend supplies state fetching and
/// its native settings model through `SearchStore`, and the settings drift
/// policy is injected separately.
pub struct IndexConfigurationComparator<S: SearchStore, C: SettingsComparator> {
  store: S,
  settings_registry: Arc<SettingsRegistry<S::NativeSettings>>,
  mapping_comparator: MappingComparator,
  settings_comparator: C,
}

impl<S: SearchStore, C: SettingsComparator> IndexConfigurationComparator<S, C> {
  pub fn new(store: S, settings_registry: Arc<SettingsRegistry<S::NativeSettings>>, settings_comparator: C) -> IndexConfigurationComparator<S, C> {
    IndexConfigurationComparator { store, settings_registry, mapping_comparator: MappingComparator, settings_comparator }
  }

  #[instrument(skip_all, fields(entity = %configuration.entity, index = %configuration.index_name))]
  pub async fn compare(&self, configuration: &IndexConfiguration) -> Result<ConfigurationComparingResult, DriftsyncError> {
    let state = self.store.fetch_state(&configuration.index_name).await?;

    self.compare_against(configuration, state.as_ref()).await
  }

  /// Same comparison against an already-fetched live state. An absent index
  /// short-circuits both domains to incompatible, only creation can help.
  pub async fn compare_against(&self, configuration: &IndexConfiguration, state: Option<&LiveIndexState>) -> Result<ConfigurationComparingResult, DriftsyncError> {
    let Some(state) = state else {
      tracing::debug!(index = %configuration.index_name, "no live index, recreation required");

      return Ok(ConfigurationComparingResult::RECREATION_REQUIRED);
    };

    let desired_settings = self.settings_registry.effective_settings(&configuration.entity).await?;

    let mapping = self.mapping_comparator.compare(&configuration.mappings, &state.properties)?;
    let settings = self.settings_comparator.compare(&desired_settings, state);

    tracing::debug!(?mapping, ?settings, "compared index configuration");

    Ok(ConfigurationComparingResult { mapping, settings })
  }
}
