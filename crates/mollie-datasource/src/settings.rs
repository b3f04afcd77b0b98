//! Connector configuration.
//!
//! Settings carry everything the connector needs to reach the Mollie API:
//! the API key (held as a [`SecretString`] and only exposed while building
//! the authorization header), endpoint and version, the per-client TLS
//! trust policy, diagnostic and mock flags, and the legacy payment-link
//! settings.

use std::env;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Production API root used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.mollie.nl";

/// API version segment used when none is configured.
pub const DEFAULT_VERSION: &str = "v1";

/// Default link-generation endpoint.
pub const DEFAULT_PAYLINK_ENDPOINT: &str = "https://www.mollie.com/xml/ideal";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum SettingsError {
	/// No API key was provided
	#[error("cannot initialize the connector without an API key")]
	MissingApiKey,

	/// Mock mode requested from the crate that has no mock engine
	#[error("mock mode is enabled; build the connector through the mocks crate")]
	MockUnavailable,

	/// The configured extra root certificate could not be loaded
	#[error("invalid certificate: {0}")]
	InvalidCertificate(String),

	/// The HTTP client could not be constructed
	#[error("failed to build HTTP client: {0}")]
	Client(String),
}

/// Source of an extra root certificate for TLS verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertSource {
	/// PEM data supplied inline
	Pem(String),
	/// Path to a PEM file on disk
	File(PathBuf),
}

/// Per-client TLS trust policy.
///
/// Scoped to the connector's own HTTP client; configuring one connector
/// never changes process-global verification state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsPolicy {
	/// Disable certificate verification for this client only
	#[serde(default)]
	pub danger_accept_invalid_certs: bool,
	/// Extra root certificate trusted in addition to the default roots
	#[serde(default)]
	pub extra_root_cert: Option<CertSource>,
}

/// Settings for the legacy payment-link endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaylinkSettings {
	/// Link-generation endpoint
	#[serde(default = "default_paylink_endpoint")]
	pub endpoint: String,
	/// Partner id sent with link requests
	#[serde(default)]
	pub partnerid: Option<String>,
	/// Profile key for accounts with multiple payment profiles
	#[serde(default)]
	pub profile_key: Option<String>,
}

impl Default for PaylinkSettings {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_PAYLINK_ENDPOINT.to_string(),
			partnerid: None,
			profile_key: None,
		}
	}
}

/// Connector settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorSettings {
	/// Mollie API key (`test_...` or `live_...`)
	pub apikey: SecretString,
	/// API root
	#[serde(default = "default_endpoint")]
	pub endpoint: String,
	/// API version segment
	#[serde(default = "default_version")]
	pub version: String,
	/// Log a curl reproduction of every completed request
	#[serde(default)]
	pub debug: bool,
	/// Serve requests from the in-process mock engine instead of the network
	#[serde(default)]
	pub mock: bool,
	/// TLS trust policy for this connector's client
	#[serde(default)]
	pub tls: TlsPolicy,
	/// Legacy payment-link settings
	#[serde(default)]
	pub paylink: PaylinkSettings,
}

impl ConnectorSettings {
	/// Create settings with the given API key and defaults for the rest.
	pub fn new(apikey: impl Into<String>) -> Self {
		Self {
			apikey: SecretString::from(apikey.into()),
			endpoint: DEFAULT_ENDPOINT.to_string(),
			version: DEFAULT_VERSION.to_string(),
			debug: false,
			mock: false,
			tls: TlsPolicy::default(),
			paylink: PaylinkSettings::default(),
		}
	}

	/// Set the API root.
	pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = endpoint.into();
		self
	}

	/// Set the API version segment.
	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = version.into();
		self
	}

	/// Enable or disable diagnostic request logging.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Enable or disable mock mode.
	pub fn with_mock(mut self, mock: bool) -> Self {
		self.mock = mock;
		self
	}

	/// Set the TLS trust policy.
	pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
		self.tls = tls;
		self
	}

	/// Set the payment-link settings.
	pub fn with_paylink(mut self, paylink: PaylinkSettings) -> Self {
		self.paylink = paylink;
		self
	}

	/// Load settings from `MOLLIE_*` environment variables.
	///
	/// `MOLLIE_APIKEY` is required; `MOLLIE_ENDPOINT`, `MOLLIE_VERSION`,
	/// `MOLLIE_DEBUG`, `MOLLIE_MOCK`, `MOLLIE_PAYLINK_ENDPOINT`,
	/// `MOLLIE_PARTNERID`, and `MOLLIE_PROFILE_KEY` are optional.
	pub fn from_env() -> Result<Self, SettingsError> {
		let apikey = env::var("MOLLIE_APIKEY").map_err(|_| SettingsError::MissingApiKey)?;
		let mut settings = Self::new(apikey);
		if let Ok(endpoint) = env::var("MOLLIE_ENDPOINT") {
			settings.endpoint = endpoint;
		}
		if let Ok(version) = env::var("MOLLIE_VERSION") {
			settings.version = version;
		}
		settings.debug = env_flag("MOLLIE_DEBUG");
		settings.mock = env_flag("MOLLIE_MOCK");
		if let Ok(endpoint) = env::var("MOLLIE_PAYLINK_ENDPOINT") {
			settings.paylink.endpoint = endpoint;
		}
		if let Ok(partnerid) = env::var("MOLLIE_PARTNERID") {
			settings.paylink.partnerid = Some(partnerid);
		}
		if let Ok(profile_key) = env::var("MOLLIE_PROFILE_KEY") {
			settings.paylink.profile_key = Some(profile_key);
		}
		Ok(settings)
	}

	pub(crate) fn validate(&self) -> Result<(), SettingsError> {
		if self.apikey.expose_secret().is_empty() {
			return Err(SettingsError::MissingApiKey);
		}
		Ok(())
	}
}

fn env_flag(name: &str) -> bool {
	env::var(name).is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
}

fn default_endpoint() -> String {
	DEFAULT_ENDPOINT.to_string()
}

fn default_version() -> String {
	DEFAULT_VERSION.to_string()
}

fn default_paylink_endpoint() -> String {
	DEFAULT_PAYLINK_ENDPOINT.to_string()
}
