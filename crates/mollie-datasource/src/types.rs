//! Payment model, wire envelopes, entity schemas, and query filters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open JSON record handled by the CRUD façade.
///
/// The façade works on open records rather than typed structs because the
/// inbound coercion rules are keyed by field *name* and must also apply to
/// consumer-declared entities.
pub type Record = Map<String, Value>;

/// Entity name registered for payments by default.
pub const PAYMENT_MODEL: &str = "Payment";

/// Payment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
	Test,
	Live,
}

/// Payment status reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
	Open,
	Pending,
	Cancelled,
	Expired,
	Failed,
	Paid,
	Paidout,
	Refunded,
}

impl PaymentStatus {
	/// Wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			PaymentStatus::Open => "open",
			PaymentStatus::Pending => "pending",
			PaymentStatus::Cancelled => "cancelled",
			PaymentStatus::Expired => "expired",
			PaymentStatus::Failed => "failed",
			PaymentStatus::Paid => "paid",
			PaymentStatus::Paidout => "paidout",
			PaymentStatus::Refunded => "refunded",
		}
	}

	/// True once the payment has been paid; paid payments carry no
	/// `expiryPeriod`.
	pub fn is_paid(&self) -> bool {
		matches!(self, PaymentStatus::Paid)
	}
}

/// URLs attached to a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinks {
	/// Hosted payment screen for the customer
	pub payment_url: String,
	/// Where the customer is sent after completing payment
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_url: Option<String>,
}

/// A payment as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
	/// Server-assigned identifier (`tr_` prefixed)
	pub id: String,
	pub mode: PaymentMode,
	/// Creation timestamp, RFC 3339 on the wire
	pub created_datetime: String,
	pub status: PaymentStatus,
	/// Expiry window as an ISO-8601 duration; absent once paid
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry_period: Option<String>,
	/// Amount in currency units; some paths transmit it as a string
	#[serde(deserialize_with = "amount_from_wire")]
	pub amount: f64,
	#[serde(default)]
	pub description: String,
	/// Open key-value map supplied at creation
	#[serde(default)]
	pub metadata: Map<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<PaymentLinks>,
}

/// Collection envelope returned by the payments resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentList {
	#[serde(default)]
	pub total_count: u64,
	#[serde(default)]
	pub offset: u64,
	#[serde(default)]
	pub count: u64,
	#[serde(default)]
	pub data: Vec<Record>,
}

fn amount_from_wire<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	match &value {
		Value::Number(number) => number
			.as_f64()
			.ok_or_else(|| serde::de::Error::custom("amount is out of range")),
		Value::String(raw) => raw.trim().parse::<f64>().map_err(serde::de::Error::custom),
		_ => Err(serde::de::Error::custom("amount must be a number or a string")),
	}
}

/// Declared properties of an entity persisted through the connector.
#[derive(Debug, Clone)]
pub struct ModelSchema {
	/// Property acting as the entity id
	pub id_property: String,
	/// Declared property names; outbound payloads are restricted to these
	pub properties: Vec<String>,
}

impl ModelSchema {
	pub fn new(
		id_property: impl Into<String>,
		properties: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Self {
			id_property: id_property.into(),
			properties: properties.into_iter().map(Into::into).collect(),
		}
	}

	/// Whether the schema declares a property with this name.
	pub fn declares(&self, name: &str) -> bool {
		self.properties.iter().any(|property| property == name)
	}
}

/// Schema matching the payment fields the remote API accepts or returns.
pub fn payment_schema() -> ModelSchema {
	ModelSchema::new(
		"id",
		[
			"id",
			"mode",
			"createdDatetime",
			"status",
			"expiryPeriod",
			"amount",
			"description",
			"metadata",
			"details",
			"links",
			"method",
			"redirectUrl",
			"webhookUrl",
		],
	)
}

/// Query filter accepted by `all`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filter {
	/// Field constraints; only an id lookup or an empty map is supported
	#[serde(default, rename = "where")]
	pub where_clause: Option<Record>,
	#[serde(default)]
	pub offset: Option<u64>,
	/// Alias for `offset` used by some hosts
	#[serde(default)]
	pub skip: Option<u64>,
	#[serde(default)]
	pub limit: Option<u64>,
}

/// Pagination options mapped onto remote query parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
	pub offset: Option<u64>,
	pub skip: Option<u64>,
	pub limit: Option<u64>,
}

impl Filter {
	/// Filter matching a single entity by id.
	pub fn by_id(id_property: impl Into<String>, id: impl Into<String>) -> Self {
		let mut where_clause = Map::new();
		where_clause.insert(id_property.into(), Value::String(id.into()));
		Self {
			where_clause: Some(where_clause),
			..Self::default()
		}
	}

	/// Pagination slice of this filter.
	pub fn page(&self) -> PageOptions {
		PageOptions {
			offset: self.offset,
			skip: self.skip,
			limit: self.limit,
		}
	}
}
