//! Lookups into the originating data model.

use serde_json::{Map, Value};

/// Depth-first search for the object whose `"sid"` equals `sid`.
#[must_use]
pub fn find_by_sid<'a>(model: &'a Value, sid: &str) -> Option<&'a Value> {
	match model {
		Value::Object(object) => {
			if object.get("sid").and_then(Value::as_str) == Some(sid) {
				return Some(model);
			}
			object.values().find_map(|value| find_by_sid(value, sid))
		}
		Value::Array(items) => items.iter().find_map(|item| find_by_sid(item, sid)),
		_ => None,
	}
}

/// Pass-through data for component consumers: identity keys and `_`-prefixed (private) keys are dropped.
///
/// Only the top level is filtered. Non-objects are passed through as-is.
#[must_use]
pub fn sanitize_props(model: &Value) -> Value {
	match model {
		Value::Object(object) => Value::Object(
			object
				.iter()
				.filter(|(key, _)| !matches!(key.as_str(), "sid" | "stype") && !key.starts_with('_'))
				.map(|(key, value)| (key.clone(), value.clone()))
				.collect::<Map<_, _>>(),
		),
		other => other.clone(),
	}
}
