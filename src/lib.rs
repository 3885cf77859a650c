mod compare;
mod error;
mod index;
mod model;
mod reconcile;
mod settings;

pub mod prelude {
  pub use crate::error::DriftsyncError;

  pub use crate::compare::{ComparingVerdict, ConfigurationComparingResult, DYNAMIC_INDEX_SETTINGS, EsSettingsComparator, IndexConfigurationComparator, MappingComparator, SettingsComparator};
  pub use crate::index::{
    LiveIndexState, SearchStore,
    elastic::{ElasticsearchStore, EsAnalysisSection, EsAuthMethod, EsIndexSection, EsIndexSettings},
    mock::{MockedSearchStore, StoreOperation},
  };
  pub use crate::model::{EntityType, FieldMapping, IndexConfiguration, IndexConfigurationRegistry, IndexMappings};
  pub use crate::reconcile::{IndexReconciler, ReconcileOutcome, SchemaManagementStrategy};
  pub use crate::settings::{
    ConfigurationContext, DeclaredSettingsConfigurer, SettingsConfigurer,
    merge::{EffectiveSettings, SettingsRegistry},
  };
}
