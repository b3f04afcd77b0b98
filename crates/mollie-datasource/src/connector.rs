//! The Mollie connector: request construction, the data-source contract, and
//! the CRUD façade.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use http::Method;
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::error::ConnectorError;
use crate::gateway::{ApiRequest, ApiResponse, HttpGateway, ReqwestGateway};
use crate::settings::{ConnectorSettings, SettingsError};
use crate::transform;
use crate::types::{
	payment_schema, Filter, ModelSchema, PageOptions, PaymentList, Record, PAYMENT_MODEL,
};

/// Resource path segment for payments.
const PAYMENTS_RESOURCE: &str = "payments";

/// Target of a connector request: nothing, a resource id, or a JSON payload.
#[derive(Debug, Clone)]
pub enum RequestTarget {
	None,
	Id(String),
	Payload(Record),
}

/// Contract expected from a data-source connector by the host framework.
///
/// Verbs the remote API cannot perform return
/// [`ConnectorError::Unsupported`] instead of pretending to succeed.
#[async_trait]
pub trait DataSourceConnector: Send + Sync {
	/// Create an entity; yields the server-assigned id.
	async fn create(&self, model: &str, data: &Record) -> Result<String, ConnectorError>;

	/// Persist changes to an existing entity.
	async fn save(&self, model: &str, data: &Record) -> Result<Record, ConnectorError>;

	/// Fetch a single entity by id; `None` when the response carries no body.
	async fn find(&self, model: &str, id: &str) -> Result<Option<Record>, ConnectorError>;

	/// Whether an entity with this id exists.
	async fn exists(&self, model: &str, id: &str) -> Result<bool, ConnectorError>;

	/// Query entities by filter.
	async fn all(&self, model: &str, filter: &Filter) -> Result<Vec<Record>, ConnectorError>;

	/// Count entities.
	async fn count(&self, model: &str) -> Result<u64, ConnectorError>;

	/// Delete a single entity by id.
	async fn destroy(&self, model: &str, id: &str) -> Result<(), ConnectorError>;

	/// Delete every entity matching the clause.
	async fn destroy_all(&self, model: &str, where_clause: &Record) -> Result<(), ConnectorError>;

	/// Partially update an entity by id.
	async fn update_attributes(
		&self,
		model: &str,
		id: &str,
		data: &Record,
	) -> Result<Record, ConnectorError>;

	/// Outbound payload coercion hook.
	fn to_data(&self, model: &str, data: &Record) -> Record;

	/// Inbound record coercion hook.
	fn from_data(&self, model: &str, data: Record) -> Record;
}

/// Data-source connector for the Mollie payments API.
pub struct MollieConnector {
	settings: ConnectorSettings,
	gateway: Arc<dyn HttpGateway>,
	models: HashMap<String, ModelSchema>,
	endpoint_override: RwLock<Option<String>>,
	client_info: String,
}

impl MollieConnector {
	/// Build a connector talking to the real API.
	///
	/// Refuses settings with `mock` enabled; the mock engine lives in the
	/// mocks crate, which owns the flag-honoring constructor.
	pub fn from_settings(settings: ConnectorSettings) -> Result<Self, SettingsError> {
		settings.validate()?;
		if settings.mock {
			return Err(SettingsError::MockUnavailable);
		}
		let gateway = Arc::new(ReqwestGateway::from_settings(&settings)?);
		Ok(Self::with_gateway(settings, gateway))
	}

	/// Build a connector around an explicit gateway.
	pub fn with_gateway(settings: ConnectorSettings, gateway: Arc<dyn HttpGateway>) -> Self {
		let mut models = HashMap::new();
		models.insert(PAYMENT_MODEL.to_string(), payment_schema());
		Self {
			settings,
			gateway,
			models,
			endpoint_override: RwLock::new(None),
			client_info: client_info(),
		}
	}

	/// Register the schema for an entity persisted through this connector.
	pub fn register_model(&mut self, name: impl Into<String>, schema: ModelSchema) {
		self.models.insert(name.into(), schema);
	}

	pub fn settings(&self) -> &ConnectorSettings {
		&self.settings
	}

	pub(crate) fn gateway(&self) -> &Arc<dyn HttpGateway> {
		&self.gateway
	}

	/// Endpoint currently in effect: the override if one is set, otherwise
	/// the configured endpoint.
	pub fn effective_endpoint(&self) -> String {
		// Recover from poisoned lock to prevent cascading panics
		let guard = self
			.endpoint_override
			.read()
			.unwrap_or_else(|err| err.into_inner());
		guard
			.clone()
			.unwrap_or_else(|| self.settings.endpoint.clone())
	}

	/// Point the connector at a substitute endpoint, e.g. a local test
	/// server. An empty string resets to the configured endpoint.
	pub fn set_endpoint(&self, endpoint: impl Into<String>) {
		let endpoint = endpoint.into();
		let mut guard = self
			.endpoint_override
			.write()
			.unwrap_or_else(|err| err.into_inner());
		*guard = if endpoint.is_empty() { None } else { Some(endpoint) };
	}

	/// Restore the configured endpoint.
	pub fn reset_endpoint(&self) {
		self.set_endpoint("");
	}

	/// Build an authenticated request for `resource` under the effective
	/// endpoint and configured version.
	///
	/// A `Payload` target becomes the JSON body; pagination options map onto
	/// the remote `offset`/`count` query parameters, and the query is
	/// omitted entirely when none apply.
	pub fn request(
		&self,
		method: Method,
		resource: &str,
		target: RequestTarget,
		sub_resource: Option<&str>,
		page: Option<&PageOptions>,
	) -> ApiRequest {
		let mut url = format!(
			"{}/{}/{}",
			self.effective_endpoint().trim_end_matches('/'),
			self.settings.version,
			resource
		);
		if let RequestTarget::Id(id) = &target {
			url.push('/');
			url.push_str(id);
		}
		if let Some(sub) = sub_resource {
			url.push('/');
			url.push_str(sub);
		}

		let mut request = ApiRequest::new(method, url)
			.header("Accept", "application/json")
			.header(
				"Authorization",
				format!("Bearer {}", self.settings.apikey.expose_secret()),
			)
			.header("User-Agent", user_agent())
			.header("X-Mollie-Client-Info", self.client_info.clone());

		if let RequestTarget::Payload(payload) = target {
			request = request.json(Value::Object(payload));
		}

		if let Some(page) = page {
			if let Some(offset) = page.offset.or(page.skip) {
				request = request.query_param("offset", offset.to_string());
			}
			if let Some(limit) = page.limit {
				request = request.query_param("count", limit.to_string());
			}
		}

		request
	}

	/// Send a request and normalize non-success responses.
	async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError> {
		tracing::debug!(method = %request.method, url = %request.url, "dispatching request");
		let response = self.gateway.send(request).await?;
		if response.status.is_success() {
			Ok(response)
		} else {
			Err(remote_error(&response))
		}
	}
}

#[async_trait]
impl DataSourceConnector for MollieConnector {
	async fn create(&self, model: &str, data: &Record) -> Result<String, ConnectorError> {
		let payload = self.to_data(model, data);
		let request = self.request(
			Method::POST,
			PAYMENTS_RESOURCE,
			RequestTarget::Payload(payload),
			None,
			None,
		);
		let response = self.dispatch(request).await?;
		let body: Value = response.json()?;
		body.get("id")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| ConnectorError::Gateway("created payment carries no id".to_string()))
	}

	async fn save(&self, _model: &str, _data: &Record) -> Result<Record, ConnectorError> {
		Err(ConnectorError::Unsupported("save"))
	}

	async fn find(&self, model: &str, id: &str) -> Result<Option<Record>, ConnectorError> {
		let request = self.request(
			Method::GET,
			PAYMENTS_RESOURCE,
			RequestTarget::Id(id.to_string()),
			None,
			None,
		);
		let response = self.dispatch(request).await?;
		if response.is_empty_body() {
			return Ok(None);
		}
		let record: Record = response.json()?;
		Ok(Some(self.from_data(model, record)))
	}

	async fn exists(&self, model: &str, id: &str) -> Result<bool, ConnectorError> {
		Ok(self.find(model, id).await?.is_some())
	}

	async fn all(&self, model: &str, filter: &Filter) -> Result<Vec<Record>, ConnectorError> {
		let id_property = self
			.models
			.get(model)
			.map(|schema| schema.id_property.as_str())
			.unwrap_or("id");
		match &filter.where_clause {
			Some(where_clause) if !where_clause.is_empty() => {
				match where_clause.get(id_property).and_then(Value::as_str) {
					// A literal id degrades to a single find; not-found and
					// failures both yield an empty list, never an error.
					Some(id) => Ok(match self.find(model, id).await {
						Ok(Some(item)) => vec![item],
						_ => Vec::new(),
					}),
					None => Err(ConnectorError::Unsupported("all with a non-id where clause")),
				}
			}
			_ => {
				let request = self.request(
					Method::GET,
					PAYMENTS_RESOURCE,
					RequestTarget::None,
					None,
					Some(&filter.page()),
				);
				let response = self.dispatch(request).await?;
				let list: PaymentList = response.json()?;
				Ok(list
					.data
					.into_iter()
					.map(|item| self.from_data(model, item))
					.collect())
			}
		}
	}

	async fn count(&self, _model: &str) -> Result<u64, ConnectorError> {
		let request = self
			.request(Method::GET, PAYMENTS_RESOURCE, RequestTarget::None, None, None)
			.query_param("count", "1");
		let response = self.dispatch(request).await?;
		let list: PaymentList = response.json()?;
		Ok(list.total_count)
	}

	async fn destroy(&self, _model: &str, _id: &str) -> Result<(), ConnectorError> {
		Err(ConnectorError::Unsupported("destroy"))
	}

	async fn destroy_all(
		&self,
		_model: &str,
		_where_clause: &Record,
	) -> Result<(), ConnectorError> {
		Err(ConnectorError::Unsupported("destroy_all"))
	}

	async fn update_attributes(
		&self,
		_model: &str,
		_id: &str,
		_data: &Record,
	) -> Result<Record, ConnectorError> {
		Err(ConnectorError::Unsupported("update_attributes"))
	}

	fn to_data(&self, model: &str, data: &Record) -> Record {
		transform::to_data(self.models.get(model), data)
	}

	fn from_data(&self, _model: &str, data: Record) -> Record {
		transform::from_data(data)
	}
}

/// Normalize a remote failure into [`ConnectorError::Remote`].
///
/// A body of the shape `{"error": {"message": ...}}` surfaces the remote
/// message and the whole `error` object as details; anything else gets a
/// default message. Transport internals never leave this function.
fn remote_error(response: &ApiResponse) -> ConnectorError {
	let status = response.status.as_u16();
	if let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(&response.body) {
		if let Some(Value::Object(error)) = body.get("error") {
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("request rejected by the remote API")
				.to_string();
			return ConnectorError::Remote {
				status,
				message,
				details: Value::Object(error.clone()),
			};
		}
	}
	ConnectorError::Remote {
		status,
		message: format!("request failed with status {status}"),
		details: Value::Null,
	}
}

pub(crate) fn user_agent() -> String {
	format!("mollie-datasource/{} rust", env!("CARGO_PKG_VERSION"))
}

fn client_info() -> String {
	[
		std::env::consts::OS,
		std::env::consts::ARCH,
		std::env::consts::FAMILY,
	]
	.join(" ")
}
