use serde_json::{Map, Value};

use crate::{compare::ComparingVerdict, index::LiveIndexState, settings::merge::EffectiveSettings};

/// Store-specific drift policy for the settings domain. Which setting changes
/// can be applied to a live index and which force a rebuild depends on the
/// backend, so the policy is injected into the configuration comparator.
pub trait SettingsComparator: Send + Sync {
  fn compare(&self, desired: &EffectiveSettings, live: &LiveIndexState) -> ComparingVerdict;
}

/// Index-level settings Elasticsearch can change on a live index.
pub const DYNAMIC_INDEX_SETTINGS: &[&str] = &["number_of_replicas", "refresh_interval", "max_result_window"];

/// Elasticsearch policy: every desired setting must appear in the live tree
/// with an equivalent value (the live tree carries extra store defaults,
/// those are ignored). Drift in a dynamic setting can be applied in place,
/// any other drift, including any analysis drift, requires recreation.
#[derive(Clone, Copy, Debug, Default)]
pub struct EsSettingsComparator;

impl SettingsComparator for EsSettingsComparator {
  fn compare(&self, desired: &EffectiveSettings, live: &LiveIndexState) -> ComparingVerdict {
    let index = compare_subtree(&desired.index, &live.index, |key| DYNAMIC_INDEX_SETTINGS.contains(&key));
    let analysis = compare_subtree(&desired.analysis, &live.analysis, |_| false);

    index.max(analysis)
  }
}

fn compare_subtree(desired: &Map<String, Value>, live: &Map<String, Value>, dynamic: impl Fn(&str) -> bool) -> ComparingVerdict {
  let mut verdict = ComparingVerdict::Equal;

  for (key, value) in desired {
    let matches = live.get(key).is_some_and(|live_value| values_equivalent(value, live_value));

    if !matches {
      verdict = verdict.max(match dynamic(key) {
        true => ComparingVerdict::Compatible,
        false => ComparingVerdict::NotCompatible,
      });
    }
  }

  verdict
}

// The live tree stringifies numbers and booleans ("number_of_shards": "1"),
// and may carry normalized extras next to what was submitted, so scalars are
// compared through their string form and objects as a desired-side subset.
fn values_equivalent(desired: &Value, live: &Value) -> bool {
  match (desired, live) {
    (Value::Object(desired), Value::Object(live)) => desired.iter().all(|(key, value)| live.get(key).is_some_and(|live_value| values_equivalent(value, live_value))),
    (Value::Array(desired), Value::Array(live)) => desired.len() == live.len() && desired.iter().zip(live).all(|(value, live_value)| values_equivalent(value, live_value)),
    (desired, live) => desired == live || scalar_repr(desired).is_some_and(|value| Some(value) == scalar_repr(live)),
  }
}

fn scalar_repr(value: &Value) -> Option<String> {
  match value {
    Value::String(value) => Some(value.clone()),
    Value::Number(value) => Some(value.to_string()),
    Value::Bool(value) => Some(value.to_string()),
    _ => None,
  }
}
