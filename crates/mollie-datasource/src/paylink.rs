//! Legacy payment-link generation.
//!
//! The paylink endpoint predates the JSON API: it takes URL-encoded GET
//! parameters and answers with an XML-ish document that is scraped with two
//! regular expressions (`<URL>` on success, `<message>` on failure).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use http::Method;
use regex::Regex;

use crate::connector::{user_agent, MollieConnector};
use crate::error::ConnectorError;
use crate::gateway::ApiRequest;

/// Options for generating a hosted payment link.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
	/// Amount in currency units; sent as rounded integer cents
	pub amount: f64,
	/// Shown to the customer on the payment screen
	pub description: String,
	/// Overrides the configured partner id
	pub partnerid: Option<String>,
	/// Overrides the configured profile key
	pub profile_key: Option<String>,
	/// Additional query parameters passed through unchanged
	pub extra: BTreeMap<String, String>,
}

static URL_TAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)<URL>([^<]+)</URL>").expect("URL pattern is valid"));
static MESSAGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)<message>([^<]+)</message>").expect("message pattern is valid")
});

impl MollieConnector {
	/// Generate a hosted payment link.
	///
	/// Fails before any I/O unless `amount` is a finite number and
	/// `description` is non-empty. The reply is scraped for a `<URL>`
	/// element; failing that, the remote `<message>` (or a default) becomes
	/// the error.
	pub async fn payment_link(&self, options: LinkOptions) -> Result<String, ConnectorError> {
		if !options.amount.is_finite() {
			return Err(ConnectorError::InvalidLinkOptions(
				"amount must be a finite number".to_string(),
			));
		}
		if options.description.trim().is_empty() {
			return Err(ConnectorError::InvalidLinkOptions(
				"description must not be empty".to_string(),
			));
		}

		let paylink = &self.settings().paylink;
		let mut request = ApiRequest::new(Method::GET, paylink.endpoint.clone())
			.header("User-Agent", user_agent());
		for (name, value) in &options.extra {
			request = request.query_param(name.clone(), value.clone());
		}
		if let Some(partnerid) = options.partnerid.as_ref().or(paylink.partnerid.as_ref()) {
			request = request.query_param("partnerid", partnerid.clone());
		}
		if let Some(profile_key) = options
			.profile_key
			.as_ref()
			.or(paylink.profile_key.as_ref())
		{
			request = request.query_param("profile_key", profile_key.clone());
		}
		// From float currency units to integer cents
		let cents = (options.amount * 100.0).round() as i64;
		request = request
			.query_param("description", options.description.clone())
			.query_param("amount", cents.to_string())
			.query_param("a", "create-link");

		let response = self.gateway().send(request).await?;
		let text = response.text();
		if let Some(captures) = URL_TAG.captures(&text) {
			return Ok(captures[1].to_string());
		}
		let message = MESSAGE_TAG
			.captures(&text)
			.map(|captures| captures[1].to_string())
			.unwrap_or_else(|| "Failed to get link".to_string());
		Err(ConnectorError::LinkRejected(message))
	}
}
