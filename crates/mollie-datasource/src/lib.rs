//! Data-source connector for the Mollie payments API.
//!
//! Maps a host framework's CRUD verbs onto the Mollie HTTP API: request
//! construction with bearer authentication, field-level coercion between
//! wire and in-memory records, a legacy payment-link endpoint, and a
//! transport seam ([`HttpGateway`]) that the companion mocks crate can
//! implement to keep tests off the network.
//!
//! The remote API only supports creating and reading payments; the
//! remaining verbs of the [`DataSourceConnector`] contract return
//! [`ConnectorError::Unsupported`].
//!
//! # Quick start
//!
//! ```no_run
//! use mollie_datasource::{ConnectorSettings, DataSourceConnector, MollieConnector};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConnectorSettings::new("test_dHar4XY7LxsDOtmnkVtjNVWXLSlXsM");
//! let connector = MollieConnector::from_settings(settings)?;
//!
//! let payment = connector.find("Payment", "tr_7UhSN1zuXS").await?;
//! println!("{payment:?}");
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod error;
pub mod gateway;
pub mod paylink;
pub mod settings;
pub mod transform;
pub mod types;

pub use connector::{DataSourceConnector, MollieConnector, RequestTarget};
pub use error::ConnectorError;
pub use gateway::{ApiRequest, ApiResponse, HttpGateway, ReqwestGateway};
pub use paylink::LinkOptions;
pub use settings::{
	CertSource, ConnectorSettings, PaylinkSettings, SettingsError, TlsPolicy,
};
pub use types::{
	payment_schema, Filter, ModelSchema, PageOptions, Payment, PaymentLinks, PaymentList,
	PaymentMode, PaymentStatus, Record, PAYMENT_MODEL,
};
