//! In-process mock engine for the Mollie data-source connector.
//!
//! Substitutes synthesized responses for real network calls: two URL
//! patterns (single payment and payment collection), a volatile id-keyed
//! store that lives for the duration of the process, and hook points for
//! steering or observing synthesis from tests. Built through
//! [`connector_from_settings`] when the `mock` setting is on.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use http::{Method, StatusCode};
use mollie_datasource::{
	ApiRequest, ApiResponse, ConnectorError, ConnectorSettings, HttpGateway, MollieConnector,
	PaymentStatus, Record, SettingsError,
};
use rand::Rng;
use regex::Regex;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

/// Length of generated payment ids (before the `tr_` prefix).
const ID_LENGTH: usize = 10;

const ID_MASK: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Redirect URL attached to synthesized payments.
pub enum RedirectUrl {
	/// The same URL for every payment
	Fixed(String),
	/// Computed from the creation payload
	Compute(Box<dyn Fn(&Record) -> String + Send + Sync>),
}

/// Hook points for tests steering or observing synthesis.
#[derive(Default)]
pub struct MockOptions {
	/// Overrides the synthesized redirect URL
	pub redirect_url: Option<RedirectUrl>,
	/// Status assigned to synthesized payments instead of `open`
	pub status: Option<PaymentStatus>,
	/// Invoked with `(id, status, payload)` on every synthesized response
	pub on_response: Option<Arc<dyn Fn(&str, &str, &Record) + Send + Sync>>,
}

/// In-process gateway serving synthesized Mollie responses.
///
/// The store is unbounded and keyed by payment id; it exists purely for
/// test determinism and is reset by [`clear`](Self::clear) or process exit.
pub struct MockGateway {
	single: Regex,
	collection: Regex,
	store: Arc<RwLock<BTreeMap<String, Record>>>,
	options: MockOptions,
}

impl MockGateway {
	/// Build a gateway whose route patterns match the settings' endpoint
	/// and version.
	pub fn from_settings(settings: &ConnectorSettings) -> Self {
		Self::new(&settings.endpoint, &settings.version)
	}

	pub fn new(endpoint: &str, version: &str) -> Self {
		let base = regex::escape(&format!(
			"{}/{}/payments",
			endpoint.trim_end_matches('/'),
			version
		));
		Self {
			single: Regex::new(&format!("^{base}/([a-zA-Z0-9_]+)$"))
				.expect("single-payment pattern is valid"),
			collection: Regex::new(&format!("^{base}/?$"))
				.expect("collection pattern is valid"),
			store: Arc::new(RwLock::new(BTreeMap::new())),
			options: MockOptions::default(),
		}
	}

	/// Attach hook points.
	pub fn with_options(mut self, options: MockOptions) -> Self {
		self.options = options;
		self
	}

	/// Number of payments currently stored.
	pub async fn payment_count(&self) -> usize {
		self.store.read().await.len()
	}

	/// Stored body for an id, if any.
	pub async fn payment(&self, id: &str) -> Option<Record> {
		self.store.read().await.get(id).cloned()
	}

	/// Drop every stored payment.
	pub async fn clear(&self) {
		self.store.write().await.clear();
	}

	/// Synthesize a full payment record for a creation payload.
	fn synthesize(&self, id: &str, payload: &Record) -> Record {
		let status = self.options.status.unwrap_or(PaymentStatus::Open);
		let metadata = payload
			.get("metadata")
			.cloned()
			.unwrap_or_else(|| json!({}));
		let redirect_url = match &self.options.redirect_url {
			Some(RedirectUrl::Fixed(url)) => url.clone(),
			Some(RedirectUrl::Compute(compute)) => compute(payload),
			None => default_redirect_url(&metadata),
		};

		let mut payment = Map::new();
		payment.insert("id".to_string(), json!(format!("tr_{id}")));
		payment.insert("mode".to_string(), json!("test"));
		payment.insert(
			"createdDatetime".to_string(),
			json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
		);
		payment.insert("status".to_string(), json!(status.as_str()));
		if !status.is_paid() {
			payment.insert("expiryPeriod".to_string(), json!("PT15M"));
		}
		payment.insert(
			"amount".to_string(),
			payload.get("amount").cloned().unwrap_or(json!(0)),
		);
		payment.insert(
			"description".to_string(),
			payload.get("description").cloned().unwrap_or(json!("")),
		);
		payment.insert("metadata".to_string(), metadata);
		payment.insert(
			"links".to_string(),
			json!({
				"paymentUrl": format!("https://www.mollie.com/payscreen/pay/{id}"),
				"redirectUrl": redirect_url,
			}),
		);

		if let Some(observer) = &self.options.on_response {
			observer(id, status.as_str(), payload);
		}
		payment
	}
}

#[async_trait]
impl HttpGateway for MockGateway {
	async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError> {
		// Pagination and count parameters are accepted but never applied.
		let url = request
			.url
			.split('?')
			.next()
			.unwrap_or(request.url.as_str())
			.to_string();

		if let Some(captures) = self.single.captures(&url) {
			let id = captures[1].to_string();
			if request.method == Method::GET {
				return match self.store.read().await.get(&id) {
					Some(payment) => Ok(json_response(
						StatusCode::OK,
						&Value::Object(payment.clone()),
					)),
					None => Ok(ApiResponse::new(StatusCode::NOT_FOUND, Vec::<u8>::new())),
				};
			}
			return Err(no_route(&request.method, &url));
		}

		if self.collection.is_match(&url) {
			if request.method == Method::GET {
				let store = self.store.read().await;
				let data: Vec<Value> = store.values().cloned().map(Value::Object).collect();
				let body = json!({
					"totalCount": data.len(),
					"offset": 0,
					"count": data.len(),
					"data": data,
				});
				return Ok(json_response(StatusCode::OK, &body));
			}
			if request.method == Method::POST {
				let payload = match &request.body {
					Some(Value::Object(payload)) => payload.clone(),
					_ => Map::new(),
				};
				let id = random_id();
				let payment = self.synthesize(&id, &payload);
				let body = Value::Object(payment.clone());
				let key = payment
					.get("id")
					.and_then(Value::as_str)
					.unwrap_or(id.as_str())
					.to_string();
				self.store.write().await.insert(key, payment);
				return Ok(json_response(StatusCode::CREATED, &body));
			}
			return Err(no_route(&request.method, &url));
		}

		Err(no_route(&request.method, &url))
	}
}

/// Build a connector from settings, honoring the `mock` flag.
///
/// With `mock` on, requests are served by a fresh [`MockGateway`];
/// otherwise this defers to [`MollieConnector::from_settings`].
pub fn connector_from_settings(
	settings: ConnectorSettings,
) -> Result<MollieConnector, SettingsError> {
	if settings.mock {
		Ok(connector_with_gateway(settings, MockOptions::default()).0)
	} else {
		MollieConnector::from_settings(settings)
	}
}

/// Build a mock-backed connector and hand back the gateway for inspection.
pub fn connector_with_gateway(
	settings: ConnectorSettings,
	options: MockOptions,
) -> (MollieConnector, Arc<MockGateway>) {
	let gateway = Arc::new(MockGateway::from_settings(&settings).with_options(options));
	let seam: Arc<dyn HttpGateway> = gateway.clone();
	(MollieConnector::with_gateway(settings, seam), gateway)
}

fn default_redirect_url(metadata: &Value) -> String {
	let order = metadata.get("id").and_then(Value::as_str).unwrap_or_default();
	format!("http://localhost/orders/{order}")
}

fn json_response(status: StatusCode, body: &Value) -> ApiResponse {
	ApiResponse::new(status, serde_json::to_vec(body).unwrap_or_default())
}

fn no_route(method: &Method, url: &str) -> ConnectorError {
	ConnectorError::Gateway(format!("no mock route matches {method} {url}"))
}

fn random_id() -> String {
	let mut rng = rand::thread_rng();
	(0..ID_LENGTH)
		.map(|_| ID_MASK[rng.gen_range(0..ID_MASK.len())] as char)
		.collect()
}
