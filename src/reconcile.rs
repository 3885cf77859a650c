use std::sync::Arc;

use tracing::instrument;

use crate::{
  compare::{IndexConfigurationComparator, SettingsComparator},
  error::DriftsyncError,
  index::SearchStore,
  model::{EntityType, IndexConfiguration, IndexConfigurationRegistry},
  settings::merge::SettingsRegistry,
};

/// What the reconciler is allowed to do to a drifted index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SchemaManagementStrategy {
  /// Leave the store untouched, only report.
  None,
  /// Create missing indices, never touch existing ones.
  CreateOnly,
  /// Create missing indices, update or recreate drifted ones.
  #[default]
  CreateOrRecreate,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReconcileOutcome {
  /// Live structure already matches the desired configuration.
  Unchanged,
  /// No index existed, one was created.
  Created,
  /// Drift was applied in place.
  Updated { mapping: bool, settings: bool },
  /// Incompatible drift, the index was deleted and created anew. Documents
  /// are gone; reindexing is the caller's business.
  Recreated,
  /// The strategy forbade the action the drift called for.
  Skipped,
}

/// Drives one reconciliation pass: resolves desired configuration, compares
/// it against the store, and issues whatever structural operations the
/// verdicts and the strategy allow.
pub struct IndexReconciler<S: SearchStore, C: SettingsComparator> {
  store: S,
  settings: Arc<SettingsRegistry<S::NativeSettings>>,
  comparator: IndexConfigurationComparator<S, C>,
  strategy: SchemaManagementStrategy,
}

impl<S: SearchStore, C: SettingsComparator> IndexReconciler<S, C> {
  pub fn new(store: S, settings: Arc<SettingsRegistry<S::NativeSettings>>, settings_comparator: C, strategy: SchemaManagementStrategy) -> IndexReconciler<S, C> {
    let comparator = IndexConfigurationComparator::new(store.clone(), Arc::clone(&settings), settings_comparator);

    IndexReconciler { store, settings, comparator, strategy }
  }

  pub fn comparator(&self) -> &IndexConfigurationComparator<S, C> {
    &self.comparator
  }

  #[instrument(skip_all, fields(entity = %configuration.entity, index = %configuration.index_name))]
  pub async fn reconcile(&self, configuration: &IndexConfiguration) -> Result<ReconcileOutcome, DriftsyncError> {
    if self.strategy == SchemaManagementStrategy::None {
      return Ok(ReconcileOutcome::Skipped);
    }

    let state = self.store.fetch_state(&configuration.index_name).await?;
    let result = self.comparator.compare_against(configuration, state.as_ref()).await?;
    let desired = self.settings.effective_settings(&configuration.entity).await?;

    if state.is_none() {
      self.store.create_index(&configuration.index_name, &desired, &configuration.mappings).await?;

      return Ok(ReconcileOutcome::Created);
    }

    if !result.needs_update() {
      tracing::debug!("index is up to date");

      return Ok(ReconcileOutcome::Unchanged);
    }

    if self.strategy == SchemaManagementStrategy::CreateOnly {
      tracing::warn!(?result, "index has drifted but the strategy only allows creation");

      return Ok(ReconcileOutcome::Skipped);
    }

    if result.needs_recreation() {
      tracing::warn!(?result, "incompatible drift, recreating index");

      self.store.delete_index(&configuration.index_name).await?;
      self.store.create_index(&configuration.index_name, &desired, &configuration.mappings).await?;

      return Ok(ReconcileOutcome::Recreated);
    }

    let (mapping, settings) = (result.mapping_update_required(), result.settings_update_required());

    if settings {
      self.store.update_settings(&configuration.index_name, &desired).await?;
    }

    if mapping {
      self.store.update_mappings(&configuration.index_name, &configuration.mappings).await?;
    }

    Ok(ReconcileOutcome::Updated { mapping, settings })
  }

  /// Reconciles every registered entity type. Entity types are independent,
  /// one failure is reported in its slot and does not abort the others.
  pub async fn reconcile_all(&self, registry: &IndexConfigurationRegistry) -> Vec<(EntityType, Result<ReconcileOutcome, DriftsyncError>)> {
    let mut outcomes = Vec::with_capacity(registry.len());

    for configuration in registry.iter() {
      let outcome = self.reconcile(configuration).await;

      if let Err(cause) = &outcome {
        tracing::error!(entity = %configuration.entity, %cause, "reconciliation failed");
      }

      outcomes.push((configuration.entity.clone(), outcome));
    }

    outcomes
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use serde_json::{Value, json};

  use crate::{
    compare::EsSettingsComparator,
    index::{
      LiveIndexState, SearchStore,
      mock::{MockedSearchStore, StoreOperation},
    },
    model::{EntityType, FieldMapping, IndexConfiguration, IndexConfigurationRegistry, IndexMappings},
    reconcile::{IndexReconciler, ReconcileOutcome, SchemaManagementStrategy},
    settings::{ConfigurationContext, DeclaredSettingsConfigurer, SettingsConfigurer, merge::SettingsRegistry},
  };

  struct CommonConfigurer;

  impl SettingsConfigurer for CommonConfigurer {
    fn is_system(&self) -> bool {
      true
    }

    fn configure(&self, context: &mut ConfigurationContext) {
      context.common_index().extend(json!({ "refresh_interval": "5s", "number_of_shards": 1 }).as_object().cloned().unwrap());
    }
  }

  fn configuration() -> IndexConfiguration {
    IndexConfiguration::builder(EntityType::from("Product"))
      .index_name("products")
      .mappings(IndexMappings::default().with_field("name", FieldMapping::analyzed("text", "standard")))
      .index_settings(json!({ "sorting": { "field": "name" } }).as_object().cloned().unwrap())
      .build()
  }

  fn matching_state() -> LiveIndexState {
    LiveIndexState {
      index: json!({
        "sorting": { "field": "name" },
        "refresh_interval": "5s",
        "number_of_shards": "1",
        "uuid": "nDEJtPssT5ChkrDZ3rtFGg"
      })
      .as_object()
      .cloned()
      .unwrap(),
      analysis: Default::default(),
      properties: json!({ "name": { "type": "text", "analyzer": "standard" } }).as_object().cloned().unwrap(),
    }
  }

  fn reconciler(store: MockedSearchStore, strategy: SchemaManagementStrategy) -> IndexReconciler<MockedSearchStore, EsSettingsComparator> {
    let configurations: IndexConfigurationRegistry = [configuration()].into_iter().collect();
    let configurers: Vec<Box<dyn SettingsConfigurer>> = vec![Box::new(CommonConfigurer), Box::new(DeclaredSettingsConfigurer::from_registry(&configurations))];
    let settings = Arc::new(SettingsRegistry::<Value>::build(configurers).unwrap());

    IndexReconciler::new(store, settings, EsSettingsComparator, strategy)
  }

  #[tokio::test]
  async fn missing_index_is_created() {
    let store = MockedSearchStore::builder().build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::default());

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Created);
    assert_eq!(store.operations(), vec![StoreOperation::Create("products".to_string())]);
    assert_eq!(store.state_of("products").unwrap().properties["name"]["type"], json!("text"));
  }

  #[tokio::test]
  async fn matching_index_is_left_alone() {
    let store = MockedSearchStore::builder().states(vec![("products".to_string(), matching_state())]).build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::default());

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Unchanged);
    assert!(store.operations().is_empty());
  }

  #[tokio::test]
  async fn incompatible_mapping_drift_recreates_the_index() {
    let mut state = matching_state();
    state.properties = json!({ "name": { "type": "keyword" } }).as_object().cloned().unwrap();

    let store = MockedSearchStore::builder().states(vec![("products".to_string(), state)]).build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::default());

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Recreated);
    assert_eq!(store.operations(), vec![StoreOperation::Delete("products".to_string()), StoreOperation::Create("products".to_string())]);
  }

  #[tokio::test]
  async fn dynamic_settings_drift_is_applied_in_place() {
    let mut state = matching_state();
    state.index.insert("refresh_interval".to_string(), json!("1s"));

    let store = MockedSearchStore::builder().states(vec![("products".to_string(), state)]).build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::default());

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Updated { mapping: false, settings: true });
    assert_eq!(store.operations(), vec![StoreOperation::UpdateSettings("products".to_string())]);
    assert_eq!(store.state_of("products").unwrap().index["refresh_interval"], json!("5s"));
  }

  #[tokio::test]
  async fn create_only_strategy_never_touches_an_existing_index() {
    let mut state = matching_state();
    state.properties = json!({ "name": { "type": "keyword" } }).as_object().cloned().unwrap();

    let store = MockedSearchStore::builder().states(vec![("products".to_string(), state)]).build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::CreateOnly);

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped);
    assert!(store.operations().is_empty());

    // Creation is still allowed.
    store.delete_index("products").await.unwrap();

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Created);
  }

  #[tokio::test]
  async fn none_strategy_does_nothing() {
    let store = MockedSearchStore::builder().build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::None);

    let outcome = reconciler.reconcile(&configuration()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped);
    assert!(store.operations().is_empty());
  }

  #[tokio::test]
  async fn one_failing_entity_does_not_abort_the_others() {
    let order = IndexConfiguration::builder(EntityType::from("Order")).index_name("orders").mappings(IndexMappings::default()).build();
    let registry: IndexConfigurationRegistry = [configuration(), order].into_iter().collect();

    let store = MockedSearchStore::builder().failing(vec!["products".to_string()]).build();
    let reconciler = reconciler(store.clone(), SchemaManagementStrategy::default());

    let outcomes = reconciler.reconcile_all(&registry).await;

    assert_eq!(outcomes.len(), 2);

    for (entity, outcome) in outcomes {
      match entity.as_str() {
        "Product" => assert!(outcome.is_err()),
        "Order" => assert_eq!(outcome.unwrap(), ReconcileOutcome::Created),
        other => panic!("unexpected entity: {other}"),
      }
    }
  }
}
