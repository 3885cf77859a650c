use serde_json::{Map, Value};

use crate::{compare::ComparingVerdict, error::DriftsyncError, model::IndexMappings};

/// Structural comparison of the desired field tree against the live one,
/// restricted to the `properties` sub-tree. Field mapping changes cannot be
/// applied in place on the stores this engine targets, so any drift, added,
/// removed or differently-typed field, means the index has to be rebuilt.
#[derive(Clone, Copy, Debug, Default)]
pub struct MappingComparator;

impl MappingComparator {
  pub fn compare(&self, desired: &IndexMappings, live_properties: &Map<String, Value>) -> Result<ComparingVerdict, DriftsyncError> {
    let desired = serde_json::to_value(&desired.properties).map_err(|cause| DriftsyncError::SerializationError("mappings".to_string(), cause))?;

    match desired.as_object() == Some(live_properties) {
      true => Ok(ComparingVerdict::Equal),
      false => Ok(ComparingVerdict::NotCompatible),
    }
  }
}
