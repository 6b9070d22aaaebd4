use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, StoredCredentials};
use crate::error::{Error, Result};
use crate::oauth::{GoogleOAuth, OAuthExchange};
use crate::values::{
    BatchRequest, Dimension, GoogleConnector, UpdateSummary, ValueGrid, ValuesConnector,
    ValuesOperations,
};
use oauth2::CsrfToken;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use url::Url;

/// Facade over the Google Sheets values endpoints for one spreadsheet
/// application identity.
///
/// The client authorizes lazily: the first operation that needs the remote
/// service loads the cached credentials, refreshes the access token if it is
/// expired, and keeps the authorized connection for the rest of the process.
///
/// Operations take `&mut self`, so an instance has a single owner; construct
/// one client per task instead of sharing an instance.
pub struct SpreadsheetClient {
    config: ClientConfig,
    store: CredentialStore,
    oauth: Box<dyn OAuthExchange>,
    connector: Box<dyn ValuesConnector>,
    values: Option<Box<dyn ValuesOperations>>,
    batch_requests: Vec<BatchRequest>,
}

impl SpreadsheetClient {
    /// Build an unauthorized client. Reads and validates the client-secret
    /// file; fails with [`Error::InvalidConfiguration`] if it is missing or
    /// not in Google's `client_secret.json` format.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let oauth =
            GoogleOAuth::from_secret_file(config.client_secret_path(), config.scope()).await?;
        let store = CredentialStore::new(config.credentials_path());
        let connector = GoogleConnector::new(config.scope());

        Ok(Self {
            config,
            store,
            oauth: Box::new(oauth),
            connector: Box::new(connector),
            values: None,
            batch_requests: Vec::new(),
        })
    }

    #[cfg(test)]
    fn with_parts(
        config: ClientConfig,
        oauth: Box<dyn OAuthExchange>,
        connector: Box<dyn ValuesConnector>,
    ) -> Self {
        let store = CredentialStore::new(config.credentials_path());

        Self {
            config,
            store,
            oauth,
            connector,
            values: None,
            batch_requests: Vec::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether this instance has completed its one-time authorization.
    pub fn is_authorized(&self) -> bool {
        self.values.is_some()
    }

    /// Escape hatch: the raw values handle for out-of-band use. Present only
    /// once authorized, and not part of the primary contract.
    pub fn values_api(&self) -> Option<&dyn ValuesOperations> {
        self.values.as_deref()
    }

    /// Resolved path of the credentials cache file.
    pub fn credentials_path(&self) -> &Path {
        self.store.path()
    }

    pub fn credentials_exist(&self) -> bool {
        self.store.exists()
    }

    /// Overwrite the credentials cache with `credentials` and return the
    /// path written. Parent directories are created as needed.
    pub fn save_credentials(&self, credentials: &StoredCredentials) -> Result<PathBuf> {
        self.store.save(credentials)
    }

    /// Delete the credentials cache. Succeeds silently when no file exists.
    pub fn remove_credentials(&self) -> Result<()> {
        self.store.remove()
    }

    /// Consent URL for the out-of-band authorization flow, requesting
    /// offline access for the configured scope.
    pub fn authorization_url(&self) -> (Url, CsrfToken) {
        self.oauth.authorization_url()
    }

    /// Exchange an authorization code obtained out of band. The caller is
    /// expected to persist the result with
    /// [`save_credentials`](Self::save_credentials).
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<StoredCredentials> {
        self.oauth.exchange_code(code).await
    }

    /// Row-major values of `range`.
    #[instrument(name = "Reading range", skip(self))]
    pub async fn get(&mut self, spreadsheet_id: &str, range: &str) -> Result<ValueGrid> {
        self.authorize().await?;
        self.connected()
            .get(spreadsheet_id, range, Dimension::Rows)
            .await
    }

    /// Column-major values of `range`.
    #[instrument(name = "Reading range by columns", skip(self))]
    pub async fn get_column(&mut self, spreadsheet_id: &str, range: &str) -> Result<ValueGrid> {
        self.authorize().await?;
        self.connected()
            .get(spreadsheet_id, range, Dimension::Columns)
            .await
    }

    /// One grid per requested range, in the order the ranges were supplied.
    #[instrument(name = "Reading ranges", skip(self, ranges), fields(count = ranges.len()))]
    pub async fn batch_get(
        &mut self,
        spreadsheet_id: &str,
        ranges: &[&str],
    ) -> Result<Vec<ValueGrid>> {
        let ranges: Vec<String> = ranges.iter().map(|range| range.to_string()).collect();
        self.authorize().await?;
        self.connected().batch_get(spreadsheet_id, &ranges).await
    }

    /// Append `values` after the last populated row of `range`, inserting
    /// new rows. Values are written verbatim.
    #[instrument(name = "Appending rows", skip(self, values))]
    pub async fn append(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        values: ValueGrid,
    ) -> Result<UpdateSummary> {
        self.authorize().await?;
        self.connected().append(spreadsheet_id, range, values).await
    }

    /// Overwrite exactly `range` with `values`, verbatim. Returns the number
    /// of cells the service updated.
    #[instrument(name = "Updating range", skip(self, values))]
    pub async fn update(
        &mut self,
        spreadsheet_id: &str,
        range: &str,
        values: ValueGrid,
    ) -> Result<u32> {
        self.authorize().await?;
        self.connected().update(spreadsheet_id, range, values).await
    }

    /// Clear cell contents (not formatting) in `range`. Returns the range
    /// actually cleared, as normalized by the service.
    #[instrument(name = "Clearing range", skip(self))]
    pub async fn clear(&mut self, spreadsheet_id: &str, range: &str) -> Result<String> {
        self.authorize().await?;
        self.connected().clear(spreadsheet_id, range).await
    }

    /// Queue a (range, values) pair for the next
    /// [`batch_update`](Self::batch_update). No network traffic, no
    /// validation of the range.
    pub fn add_batch_request(&mut self, range: &str, values: ValueGrid) {
        self.batch_requests.push(BatchRequest {
            range: range.to_string(),
            values,
        });
    }

    /// Reset the batch queue. Idempotent.
    pub fn clear_batch_requests(&mut self) {
        self.batch_requests.clear();
    }

    /// Number of queued batch requests.
    pub fn pending_batch_requests(&self) -> usize {
        self.batch_requests.len()
    }

    /// Submit the queued requests as one multi-range update and return the
    /// total number of cells updated across all ranges.
    ///
    /// The queue is cleared only after the service confirms success, so a
    /// failed submit can be retried. An empty queue is a no-op returning 0
    /// without any network traffic.
    #[instrument(name = "Submitting batch update", skip(self), fields(requests = self.batch_requests.len()))]
    pub async fn batch_update(&mut self, spreadsheet_id: &str) -> Result<u32> {
        if self.batch_requests.is_empty() {
            debug!("Batch queue is empty, nothing to submit");
            return Ok(0);
        }

        self.authorize().await?;
        let updated = self
            .connected()
            .batch_update(spreadsheet_id, &self.batch_requests)
            .await?;
        self.batch_requests.clear();

        Ok(updated)
    }

    /// Establish the authorized values connection if this instance has not
    /// done so yet. Requires a credentials file; an expired stored token is
    /// refreshed and re-persisted before the connection is made.
    #[instrument(name = "Authorizing spreadsheet client", skip(self))]
    async fn authorize(&mut self) -> Result<()> {
        if self.values.is_some() {
            return Ok(());
        }

        let credentials = self.store.load()?;

        let credentials = if credentials.is_expired() {
            debug!("Access token expired, refreshing");
            let refresh_token = credentials.refresh_token.as_deref().ok_or_else(|| {
                Error::TokenRefresh("Stored credentials carry no refresh token".to_string())
            })?;
            let refreshed = self.oauth.refresh(refresh_token).await?;
            self.store.save(&refreshed)?;
            refreshed
        } else {
            debug!("Using cached credentials");
            credentials
        };

        self.values = Some(self.connector.connect(&credentials.access_token)?);

        Ok(())
    }

    fn connected(&self) -> &dyn ValuesOperations {
        match self.values.as_deref() {
            Some(values) => values,
            None => unreachable!("authorize installs the values client"),
        }
    }
}

#[cfg(test)]
mod mocks {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Get {
            spreadsheet_id: String,
            range: String,
            dimension: Dimension,
        },
        BatchGet {
            spreadsheet_id: String,
            ranges: Vec<String>,
        },
        Append {
            spreadsheet_id: String,
            range: String,
        },
        Update {
            spreadsheet_id: String,
            range: String,
        },
        BatchUpdate {
            spreadsheet_id: String,
            requests: Vec<BatchRequest>,
        },
        Clear {
            spreadsheet_id: String,
            range: String,
        },
    }

    #[derive(Clone, Default)]
    pub(crate) struct MockValues {
        pub grid: ValueGrid,
        pub total_updated_cells: u32,
        pub fail_batch_update: bool,
        pub calls: Arc<Mutex<Vec<Call>>>,
    }

    #[async_trait]
    impl ValuesOperations for MockValues {
        async fn get(
            &self,
            spreadsheet_id: &str,
            range: &str,
            dimension: Dimension,
        ) -> Result<ValueGrid> {
            self.calls.lock().unwrap().push(Call::Get {
                spreadsheet_id: spreadsheet_id.to_string(),
                range: range.to_string(),
                dimension,
            });
            Ok(self.grid.clone())
        }

        async fn batch_get(
            &self,
            spreadsheet_id: &str,
            ranges: &[String],
        ) -> Result<Vec<ValueGrid>> {
            self.calls.lock().unwrap().push(Call::BatchGet {
                spreadsheet_id: spreadsheet_id.to_string(),
                ranges: ranges.to_vec(),
            });
            // one single-cell grid per range, echoing the range back so
            // tests can check ordering
            Ok(ranges
                .iter()
                .map(|range| vec![vec![Value::String(range.clone())]])
                .collect())
        }

        async fn append(
            &self,
            spreadsheet_id: &str,
            range: &str,
            _values: ValueGrid,
        ) -> Result<UpdateSummary> {
            self.calls.lock().unwrap().push(Call::Append {
                spreadsheet_id: spreadsheet_id.to_string(),
                range: range.to_string(),
            });
            Ok(UpdateSummary {
                updated_cells: self.total_updated_cells,
                ..Default::default()
            })
        }

        async fn update(
            &self,
            spreadsheet_id: &str,
            range: &str,
            _values: ValueGrid,
        ) -> Result<u32> {
            self.calls.lock().unwrap().push(Call::Update {
                spreadsheet_id: spreadsheet_id.to_string(),
                range: range.to_string(),
            });
            Ok(self.total_updated_cells)
        }

        async fn batch_update(
            &self,
            spreadsheet_id: &str,
            requests: &[BatchRequest],
        ) -> Result<u32> {
            self.calls.lock().unwrap().push(Call::BatchUpdate {
                spreadsheet_id: spreadsheet_id.to_string(),
                requests: requests.to_vec(),
            });
            if self.fail_batch_update {
                return Err(Error::Remote("quota exceeded".to_string()));
            }
            Ok(self.total_updated_cells)
        }

        async fn clear(&self, spreadsheet_id: &str, range: &str) -> Result<String> {
            self.calls.lock().unwrap().push(Call::Clear {
                spreadsheet_id: spreadsheet_id.to_string(),
                range: range.to_string(),
            });
            Ok(range.to_string())
        }
    }

    pub(crate) struct MockConnector {
        pub api: MockValues,
        pub tokens_seen: Arc<Mutex<Vec<String>>>,
    }

    impl ValuesConnector for MockConnector {
        fn connect(&self, access_token: &str) -> Result<Box<dyn ValuesOperations>> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(access_token.to_string());
            Ok(Box::new(self.api.clone()))
        }
    }

    pub(crate) struct MockOAuth {
        pub refreshed: StoredCredentials,
        pub refresh_calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl OAuthExchange for MockOAuth {
        fn authorization_url(&self) -> (Url, CsrfToken) {
            (
                Url::parse("https://accounts.google.com/o/oauth2/auth").unwrap(),
                CsrfToken::new("state".to_string()),
            )
        }

        async fn exchange_code(&self, _code: &str) -> Result<StoredCredentials> {
            Ok(self.refreshed.clone())
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<StoredCredentials> {
            *self.refresh_calls.lock().unwrap() += 1;
            Ok(self.refreshed.clone())
        }
    }
}
