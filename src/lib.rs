//! Thin client for the Google Sheets values endpoints with on-disk OAuth
//! credential caching.
//!
//! [`SpreadsheetClient`] wraps the spreadsheet values sub-resource (get,
//! append, update, clear, and their batch variants) and persists the OAuth
//! access/refresh token pair as JSON under
//! `<root>/config/credentials/<application_name>.json`. Authorization is
//! lazy: the first operation that needs the service loads the cached
//! credentials, refreshes the access token if it is expired, and keeps the
//! connection for the rest of the process. If no credentials file exists
//! yet, obtain one through the out-of-band flow
//! ([`SpreadsheetClient::authorization_url`],
//! [`SpreadsheetClient::exchange_authorization_code`]) and persist it with
//! [`SpreadsheetClient::save_credentials`].
//!
//! Instances are single-owner: operations take `&mut self` and internal
//! state is unsynchronized. Construct one client per task.
//!
//! ```no_run
//! use google_spreadsheet::{ClientConfig, Scope, SpreadsheetClient};
//!
//! # async fn run() -> google_spreadsheet::Result<()> {
//! let config = ClientConfig::new("/srv/app", "reporting", Scope::ReadOnly);
//! let mut client = SpreadsheetClient::new(config).await?;
//!
//! let rows = client
//!     .get("13O_57K1FCSYVnI0oMESfqLx7_yPP3vNVuSjPuc75Fus", "Sheet1!A1:C10")
//!     .await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod oauth;
mod values;

pub use client::SpreadsheetClient;
pub use config::{ClientConfig, Scope};
pub use credentials::StoredCredentials;
pub use error::{Error, Result};
pub use values::{
    BatchRequest, Dimension, GoogleValuesClient, UpdateSummary, ValueGrid, ValuesOperations,
};

// Re-exported for `authorization_url` callers.
pub use oauth2::CsrfToken;
pub use url::Url;
