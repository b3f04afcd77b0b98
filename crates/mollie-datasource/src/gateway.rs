//! HTTP transport seam: plain-data requests and responses, the gateway
//! trait, and the reqwest-backed implementation.
//!
//! The connector builds [`ApiRequest`] values and hands them to an
//! [`HttpGateway`] for execution. Keeping the request as plain data makes it
//! composable before dispatch and lets the mocks crate substitute an
//! in-process gateway without touching the connector.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConnectorError;
use crate::settings::{CertSource, ConnectorSettings, SettingsError, TlsPolicy};

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct ApiRequest {
	pub method: Method,
	/// Target URL without the query string
	pub url: String,
	pub headers: Vec<(String, String)>,
	/// Query parameters; empty means no query string at all
	pub query: Vec<(String, String)>,
	/// JSON request body, if any
	pub body: Option<Value>,
}

impl ApiRequest {
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: Vec::new(),
			query: Vec::new(),
			body: None,
		}
	}

	/// Append a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// Append a query parameter.
	pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));
		self
	}

	/// Attach a JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}

	/// Full URL including the encoded query string.
	pub fn url_with_query(&self) -> String {
		if self.query.is_empty() {
			return self.url.clone();
		}
		let encoded = serde_urlencoded::to_string(&self.query).unwrap_or_default();
		format!("{}?{}", self.url, encoded)
	}

	/// Equivalent `curl` invocation for operator debugging.
	///
	/// The authorization header is redacted; the output is log-only and has
	/// no effect on dispatch.
	pub fn to_curl(&self) -> String {
		let mut parts = vec![format!("curl -X {} '{}'", self.method, self.url_with_query())];
		for (name, value) in &self.headers {
			let shown = if name.eq_ignore_ascii_case("authorization") {
				"Bearer <redacted>"
			} else {
				value.as_str()
			};
			parts.push(format!("-H '{name}: {shown}'"));
		}
		if let Some(body) = &self.body {
			parts.push(format!("-d '{body}'"));
		}
		parts.join(" ")
	}
}

/// An HTTP response as plain data.
#[derive(Debug, Clone)]
pub struct ApiResponse {
	pub status: StatusCode,
	pub body: Bytes,
}

impl ApiResponse {
	pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}

	/// True when the body carries no bytes or only an empty JSON object.
	pub fn is_empty_body(&self) -> bool {
		if self.body.is_empty() {
			return true;
		}
		matches!(
			serde_json::from_slice::<Value>(&self.body),
			Ok(Value::Object(map)) if map.is_empty()
		)
	}

	/// Decode the body as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T, ConnectorError> {
		serde_json::from_slice(&self.body).map_err(ConnectorError::from)
	}

	/// Body as text, lossily decoded.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Transport seam between the connector and the network.
///
/// The production implementation is [`ReqwestGateway`]; the mocks crate
/// provides an in-process substitute so tests never leave the process.
#[async_trait]
pub trait HttpGateway: Send + Sync {
	async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError>;
}

/// Gateway executing requests over a `reqwest` client.
pub struct ReqwestGateway {
	client: reqwest::Client,
	debug: bool,
}

impl ReqwestGateway {
	/// Build a gateway from the settings' TLS policy and diagnostic flag.
	pub fn from_settings(settings: &ConnectorSettings) -> Result<Self, SettingsError> {
		Ok(Self {
			client: build_client(&settings.tls)?,
			debug: settings.debug,
		})
	}
}

fn build_client(tls: &TlsPolicy) -> Result<reqwest::Client, SettingsError> {
	let mut builder = reqwest::Client::builder();
	if tls.danger_accept_invalid_certs {
		builder = builder.danger_accept_invalid_certs(true);
	}
	if let Some(source) = &tls.extra_root_cert {
		let pem = match source {
			CertSource::Pem(pem) => pem.clone().into_bytes(),
			CertSource::File(path) => std::fs::read(path)
				.map_err(|err| SettingsError::InvalidCertificate(err.to_string()))?,
		};
		let certificate = reqwest::Certificate::from_pem(&pem)
			.map_err(|err| SettingsError::InvalidCertificate(err.to_string()))?;
		builder = builder.add_root_certificate(certificate);
	}
	builder
		.build()
		.map_err(|err| SettingsError::Client(err.to_string()))
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
	async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ConnectorError> {
		let mut pending = self.client.request(request.method.clone(), &request.url);
		for (name, value) in &request.headers {
			pending = pending.header(name.as_str(), value.as_str());
		}
		if !request.query.is_empty() {
			pending = pending.query(&request.query);
		}
		if let Some(body) = &request.body {
			pending = pending.json(body);
		}
		let response = pending.send().await?;
		let status = response.status();
		let body = response.bytes().await?;
		if self.debug {
			tracing::debug!(status = status.as_u16(), "request: {}", request.to_curl());
		}
		Ok(ApiResponse::new(status, body))
	}
}
