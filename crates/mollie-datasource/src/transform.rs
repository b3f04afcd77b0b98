//! Field-level coercion between wire and in-memory payment records.
//!
//! The remote API speaks in RFC 3339 timestamps, ISO-8601 durations, and
//! amounts that arrive as numbers or strings. Inbound records are rewritten
//! field by field according to a rule table keyed on the field *name*; the
//! matching is deliberately substring-based to cover consumer-declared
//! entities that follow the same naming convention.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::{ModelSchema, Record};

/// How a matched field is rewritten on the way in.
#[derive(Debug, Clone, Copy)]
enum Coercion {
	/// RFC 3339 string to Unix-epoch milliseconds
	DatetimeMillis,
	/// ISO-8601 duration string to a minute count
	DurationMinutes,
	/// Number-or-string to `f64`
	Float,
}

/// Which field names a rule applies to.
#[derive(Debug, Clone, Copy)]
enum FieldMatch {
	Contains(&'static str),
	Prefix(&'static str),
}

impl FieldMatch {
	fn matches(&self, name: &str) -> bool {
		match self {
			FieldMatch::Contains(needle) => name.contains(needle),
			FieldMatch::Prefix(prefix) => name.starts_with(prefix),
		}
	}
}

/// Inbound coercion rules; first match wins.
const RULES: &[(FieldMatch, Coercion)] = &[
	(FieldMatch::Contains("Datetime"), Coercion::DatetimeMillis),
	(FieldMatch::Contains("Period"), Coercion::DurationMinutes),
	(FieldMatch::Prefix("amount"), Coercion::Float),
];

/// Restrict an outbound payload to the entity's declared properties.
///
/// Unknown fields are dropped and the read-only `details` field is never
/// sent. Payloads for entities without a registered schema pass through
/// unchanged.
pub fn to_data(schema: Option<&ModelSchema>, data: &Record) -> Record {
	let Some(schema) = schema else {
		return data.clone();
	};
	let mut out = Map::new();
	for (key, value) in data {
		if key != "details" && schema.declares(key) {
			out.insert(key.clone(), value.clone());
		}
	}
	out
}

/// Coerce an inbound wire record into its in-memory representation.
///
/// Drops an empty `details` field, then applies the rule table. Values that
/// already carry the coerced type are left alone, so re-applying the
/// transform is a no-op.
pub fn from_data(mut data: Record) -> Record {
	if data.get("details").is_some_and(is_empty_value) {
		data.remove("details");
	}
	for (key, value) in data.iter_mut() {
		let rule = RULES
			.iter()
			.find(|(matcher, _)| matcher.matches(key))
			.map(|(_, coercion)| *coercion);
		if let Some(coercion) = rule {
			if let Some(coerced) = coerce(coercion, value) {
				*value = coerced;
			}
		}
	}
	data
}

fn coerce(rule: Coercion, value: &Value) -> Option<Value> {
	match rule {
		Coercion::DatetimeMillis => {
			let raw = value.as_str()?;
			let parsed = chrono::DateTime::parse_from_rfc3339(raw).ok()?;
			Some(Value::from(parsed.timestamp_millis()))
		}
		Coercion::DurationMinutes => {
			let raw = value.as_str()?;
			Some(Value::from(minutes_from_iso_duration(raw)))
		}
		Coercion::Float => match value {
			Value::String(raw) => raw.trim().parse::<f64>().ok().map(Value::from),
			Value::Number(number) => number.as_f64().map(Value::from),
			_ => None,
		},
	}
}

fn is_empty_value(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(raw) => raw.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
		_ => false,
	}
}

static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"P((([0-9]*\.?[0-9]*)Y)?(([0-9]*\.?[0-9]*)M)?(([0-9]*\.?[0-9]*)W)?(([0-9]*\.?[0-9]*)D)?)?(T(([0-9]*\.?[0-9]*)H)?(([0-9]*\.?[0-9]*)M)?(([0-9]*\.?[0-9]*)S)?)?",
	)
	.expect("duration pattern is valid")
});

/// Extract the minutes component of an ISO-8601 duration.
///
/// Deliberately partial: the date portion and the hour/second components are
/// recognized syntactically but do not contribute to the result. Inputs that
/// are not durations decode to `0`.
pub fn minutes_from_iso_duration(duration: &str) -> f64 {
	DURATION_REGEX
		.captures(duration)
		.and_then(|captures| captures.get(14))
		.and_then(|minutes| minutes.as_str().parse::<f64>().ok())
		.unwrap_or(0.0)
}
