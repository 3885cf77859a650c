use std::sync::Arc;

use driftsync::prelude::*;
use serde_json::{Value, json};

struct DefaultAnalysis;

impl SettingsConfigurer for DefaultAnalysis {
  fn is_system(&self) -> bool {
    true
  }

  fn configure(&self, context: &mut ConfigurationContext) {
    context.common_index().insert("refresh_interval".to_string(), json!("1s"));
    context.common_analysis().insert("analyzer".to_string(), json!({ "folded": { "type": "custom", "tokenizer": "standard", "filter": ["lowercase", "asciifolding"] } }));
  }
}

struct TenantOverrides;

impl SettingsConfigurer for TenantOverrides {
  fn configure(&self, context: &mut ConfigurationContext) {
    context.common_index().insert("refresh_interval".to_string(), json!("5s"));
    context.analysis_for(&EntityType::from("Product")).insert("analyzer".to_string(), json!({ "sku": { "type": "custom", "tokenizer": "keyword", "filter": ["lowercase"] } }));
  }
}

fn configurations() -> IndexConfigurationRegistry {
  [
    IndexConfiguration::builder(EntityType::from("Product"))
      .index_name("products")
      .mappings(IndexMappings::default().with_field("name", FieldMapping::analyzed("text", "folded")).with_field("sku", FieldMapping::of("keyword")))
      .build(),
    IndexConfiguration::builder(EntityType::from("Order"))
      .index_name("orders")
      .mappings(IndexMappings::default().with_field("total", FieldMapping::of("double")))
      .build(),
  ]
  .into_iter()
  .collect()
}

fn reconciler(store: MockedSearchStore) -> IndexReconciler<MockedSearchStore, EsSettingsComparator> {
  let settings = SettingsRegistry::<Value>::build(vec![Box::new(DefaultAnalysis), Box::new(TenantOverrides)]).unwrap();

  IndexReconciler::new(store, Arc::new(settings), EsSettingsComparator, SchemaManagementStrategy::default())
}

#[tokio::test]
async fn bootstrap_then_converge() {
  let store = MockedSearchStore::builder().build();
  let configurations = configurations();

  // First pass on an empty store creates every index.
  for (entity, outcome) in reconciler(store.clone()).reconcile_all(&configurations).await {
    assert_eq!(outcome.unwrap(), ReconcileOutcome::Created, "{entity} should have been created");
  }

  let products = store.state_of("products").unwrap();

  // Custom configurer overrode the system refresh interval, and Product got
  // both the common and its specific analyzer.
  assert_eq!(products.index["refresh_interval"], json!("5s"));
  assert!(products.analysis["analyzer"].get("folded").is_some());
  assert!(products.analysis["analyzer"].get("sku").is_some());

  let orders = store.state_of("orders").unwrap();

  assert!(orders.analysis["analyzer"].get("folded").is_some());
  assert!(orders.analysis["analyzer"].get("sku").is_none());

  // Second pass converges to a no-op.
  for (_, outcome) in reconciler(store.clone()).reconcile_all(&configurations).await {
    assert_eq!(outcome.unwrap(), ReconcileOutcome::Unchanged);
  }
}

#[tokio::test]
async fn mapping_drift_forces_recreation() {
  let store = MockedSearchStore::builder().build();
  let configurations = configurations();

  reconciler(store.clone()).reconcile_all(&configurations).await;

  // A redeploy ships a different mapping for Product.
  let drifted: IndexConfigurationRegistry = configurations
    .iter()
    .cloned()
    .map(|mut configuration| {
      if configuration.entity.as_str() == "Product" {
        let mappings = std::mem::take(&mut configuration.mappings);
        configuration.mappings = mappings.with_field("ean", FieldMapping::of("keyword"));
      }

      configuration
    })
    .collect();

  let outcomes = reconciler(store.clone()).reconcile_all(&drifted).await;

  for (entity, outcome) in outcomes {
    match entity.as_str() {
      "Product" => assert_eq!(outcome.unwrap(), ReconcileOutcome::Recreated),
      _ => assert_eq!(outcome.unwrap(), ReconcileOutcome::Unchanged),
    }
  }

  assert!(store.state_of("products").unwrap().properties.get("ean").is_some());
}
