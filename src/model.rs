use std::{
  collections::{BTreeMap, HashMap},
  fmt::Display,
};

use ahash::RandomState;
use bon::bon;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which one indexable entity type is registered, cached and reconciled.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
  pub fn new(name: impl Into<String>) -> EntityType {
    EntityType(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for EntityType {
  fn from(name: &str) -> Self {
    EntityType(name.to_string())
  }
}

impl Display for EntityType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Mapping definition for a single field. Options beyond the common ones
/// (nested `properties`, `fields`, `index_options`, ...) are kept in the
/// flattened map so they round-trip to the store untouched.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldMapping {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analyzer: Option<String>,
  #[serde(default, flatten, skip_serializing_if = "Map::is_empty")]
  pub options: Map<String, Value>,
}

impl FieldMapping {
  pub fn of(kind: &str) -> FieldMapping {
    FieldMapping { kind: kind.to_string(), analyzer: None, options: Map::new() }
  }

  pub fn analyzed(kind: &str, analyzer: &str) -> FieldMapping {
    FieldMapping { kind: kind.to_string(), analyzer: Some(analyzer.to_string()), options: Map::new() }
  }

  pub fn with_option(mut self, key: &str, value: Value) -> FieldMapping {
    self.options.insert(key.to_string(), value);
    self
  }
}

/// Field tree of one index, serializing to the store's `mappings` body.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct IndexMappings {
  pub properties: BTreeMap<String, FieldMapping>,
}

impl IndexMappings {
  pub fn with_field(mut self, name: &str, mapping: FieldMapping) -> IndexMappings {
    self.properties.insert(name.to_string(), mapping);
    self
  }
}

impl FromIterator<(String, FieldMapping)> for IndexMappings {
  fn from_iter<T: IntoIterator<Item = (String, FieldMapping)>>(fields: T) -> Self {
    IndexMappings { properties: fields.into_iter().collect() }
  }
}

/// Desired structure of one entity type's index: mapping definition plus
/// optional declarative settings overrides. Built once at startup from
/// application metadata and read-only afterwards.
#[derive(Clone, Debug)]
pub struct IndexConfiguration {
  pub entity: EntityType,
  pub index_name: String,
  pub mappings: IndexMappings,
  pub index_settings: Option<Map<String, Value>>,
  pub analysis_settings: Option<Map<String, Value>>,
}

#[bon]
impl IndexConfiguration {
  #[builder]
  pub fn new(
    #[builder(start_fn, into)] entity: EntityType,
    #[builder(into)] index_name: String,
    mappings: IndexMappings,
    index_settings: Option<Map<String, Value>>,
    analysis_settings: Option<Map<String, Value>>,
  ) -> IndexConfiguration {
    IndexConfiguration { entity, index_name, mappings, index_settings, analysis_settings }
  }
}

/// Startup-time collection of one configuration per entity type.
#[derive(Debug, Default)]
pub struct IndexConfigurationRegistry {
  configurations: HashMap<EntityType, IndexConfiguration, RandomState>,
}

impl IndexConfigurationRegistry {
  pub fn register(&mut self, configuration: IndexConfiguration) {
    self.configurations.insert(configuration.entity.clone(), configuration);
  }

  pub fn get(&self, entity: &EntityType) -> Option<&IndexConfiguration> {
    self.configurations.get(entity)
  }

  pub fn iter(&self) -> impl Iterator<Item = &IndexConfiguration> {
    self.configurations.values()
  }

  pub fn len(&self) -> usize {
    self.configurations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.configurations.is_empty()
  }
}

impl FromIterator<IndexConfiguration> for IndexConfigurationRegistry {
  fn from_iter<T: IntoIterator<Item = IndexConfiguration>>(configurations: T) -> Self {
    let mut registry = IndexConfigurationRegistry::default();

    for configuration in configurations {
      registry.register(configuration);
    }

    registry
  }
}
