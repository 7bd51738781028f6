use crate::PublicError;
use serde_json::{Map, Value};
use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

/// A predicate over a JSON value.
pub type Guard = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

pub fn string() -> Guard {
	Arc::new(Value::is_string)
}

pub fn number() -> Guard {
	Arc::new(Value::is_number)
}

pub fn boolean() -> Guard {
	Arc::new(Value::is_boolean)
}

pub fn object() -> Guard {
	Arc::new(Value::is_object)
}

/// Matches arrays whose every item matches `item`.
pub fn array(item: Guard) -> Guard {
	Arc::new(move |value: &Value| {
		value
			.as_array()
			.map_or(false, |items| items.iter().all(|v| item(v)))
	})
}

/// Matches objects whose every value matches `item`.
pub fn record(item: Guard) -> Guard {
	Arc::new(move |value: &Value| {
		value
			.as_object()
			.map_or(false, |map| map.values().all(|v| item(v)))
	})
}

pub fn or(first: Guard, second: Guard) -> Guard {
	Arc::new(move |value: &Value| first(value) || second(value))
}

/// What a [`Schema`] expects of one key.
#[derive(Clone)]
pub enum Rule {
	/// The key must be present, with any value.
	Required,
	/// The key is copied over when present.
	Optional,
	/// The key takes this value when absent.
	Default(Value),
	/// The key must be present and match the guard.
	Guard(Guard),
}

impl Debug for Rule {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Rule::Required => f.write_str("Required"),
			Rule::Optional => f.write_str("Optional"),
			Rule::Default(value) => f.debug_tuple("Default").field(value).finish(),
			Rule::Guard(_) => f.write_str("Guard"),
		}
	}
}

/// Checks the shape of a JSON object, key by key.
///
/// ```
/// use trellis::validate::{number, Schema};
/// use serde_json::json;
///
/// let schema = Schema::new()
/// 	.required("name")
/// 	.guard("age", number())
/// 	.default_to("role", "member");
///
/// let user = schema.check(&json!({ "name": "ada", "age": 36 })).unwrap();
/// assert_eq!(user["role"], "member");
///
/// let rejected = schema.check(&json!({ "age": "old" })).unwrap_err();
/// assert_eq!(rejected.status, trellis::StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
	rules: Vec<(String, Rule)>,
}

impl Schema {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn rule(mut self, key: impl Into<String>, rule: Rule) -> Self {
		self.rules.push((key.into(), rule));
		self
	}

	pub fn required(self, key: impl Into<String>) -> Self {
		self.rule(key, Rule::Required)
	}

	pub fn optional(self, key: impl Into<String>) -> Self {
		self.rule(key, Rule::Optional)
	}

	pub fn default_to(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.rule(key, Rule::Default(value.into()))
	}

	pub fn guard(self, key: impl Into<String>, guard: Guard) -> Self {
		self.rule(key, Rule::Guard(guard))
	}

	/// Returns the keys the schema names, with defaults filled in. Keys it does not name are
	/// dropped. Every offending key is listed in the `400 Bad Request` raised on failure.
	pub fn check(&self, payload: &Value) -> Result<Map<String, Value>, PublicError> {
		let object = payload.as_object().ok_or_else(|| wrong_type(payload))?;

		let mut output = Map::new();
		let mut bad = Vec::new();
		for (key, rule) in &self.rules {
			let value = object.get(key);
			match (rule, value) {
				(Rule::Guard(guard), Some(value)) if guard(value) => {
					output.insert(key.clone(), value.clone());
				}
				(Rule::Required, Some(value)) | (Rule::Optional, Some(value)) => {
					output.insert(key.clone(), value.clone());
				}
				(Rule::Default(default), value) => {
					output.insert(key.clone(), value.unwrap_or(default).clone());
				}
				(Rule::Optional, None) => {}
				(Rule::Guard(_), value) | (Rule::Required, value) => {
					bad.push((key.as_str(), value));
				}
			}
		}

		if bad.is_empty() {
			Ok(output)
		} else {
			Err(bad_payload(&bad))
		}
	}
}

/// Passes `payload` through if it matches `guard`.
pub fn validate<'a>(payload: &'a Value, guard: &Guard) -> Result<&'a Value, PublicError> {
	if guard(payload) {
		Ok(payload)
	} else {
		Err(wrong_type(payload))
	}
}

fn wrong_type(payload: &Value) -> PublicError {
	let kind = Value::from(kind(payload));
	bad_payload(&[("type", Some(&kind))])
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

fn bad_payload(bad: &[(&str, Option<&Value>)]) -> PublicError {
	let lines: Vec<String> = bad
		.iter()
		.enumerate()
		.map(|(i, (key, value))| match value {
			Some(value) => format!("{}. key {}, value {}", i, key, value),
			None => format!("{}. key {}, value missing", i, key),
		})
		.collect();

	tracing::debug!(keys = bad.len(), "rejected payload");
	PublicError::bad_request(format!("Bad payload\n\t{}", lines.join("\n\t")))
}
