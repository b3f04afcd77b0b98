//! Error types for connector operations.

use thiserror::Error;

/// Errors surfaced by connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
	/// Verb the remote API cannot perform
	#[error("operation `{0}` is not supported by the remote API")]
	Unsupported(&'static str),

	/// Structured error reported by the remote API
	///
	/// Only the status code, the remote message, and the remote `error`
	/// object survive normalization; transport internals are stripped.
	#[error("{message}")]
	Remote {
		/// HTTP status of the failed response
		status: u16,
		/// Message extracted from the remote error body
		message: String,
		/// The remote `error` object, verbatim
		details: serde_json::Value,
	},

	/// Network error
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	/// Response body could not be decoded
	#[error("invalid response body: {0}")]
	Deserialization(#[from] serde_json::Error),

	/// Link generation called with unusable options
	#[error("invalid link options: {0}")]
	InvalidLinkOptions(String),

	/// Link generation rejected by the remote system
	#[error("{0}")]
	LinkRejected(String),

	/// Gateway-level failure, e.g. no mock route matched the request
	#[error("gateway error: {0}")]
	Gateway(String),
}
