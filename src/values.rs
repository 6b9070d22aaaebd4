use crate::config::Scope;
use crate::error::{Error, Result};
use async_trait::async_trait;
use google_sheets4::api::{
    BatchUpdateValuesRequest, ClearValuesRequest, Sheets, UpdateValuesResponse, ValueRange,
};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;

/// 2-D grid of cell values as exchanged with the Sheets values endpoints.
pub type ValueGrid = Vec<Vec<Value>>;

// Values are written verbatim, without formula or number parsing.
const VALUE_INPUT_OPTION: &str = "RAW";

// Appends insert new rows after the last populated row of the range.
const INSERT_DATA_OPTION: &str = "INSERT_ROWS";

/// Major dimension requested for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Rows,
    Columns,
}

impl Dimension {
    fn as_str(self) -> &'static str {
        match self {
            Dimension::Rows => "ROWS",
            Dimension::Columns => "COLUMNS",
        }
    }
}

/// One queued (range, values) pair for a multi-range update.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub range: String,
    pub values: ValueGrid,
}

/// Summary of an append as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated_range: Option<String>,
    pub updated_rows: u32,
    pub updated_columns: u32,
    pub updated_cells: u32,
}

impl From<UpdateValuesResponse> for UpdateSummary {
    fn from(response: UpdateValuesResponse) -> Self {
        Self {
            updated_range: response.updated_range,
            updated_rows: response.updated_rows.unwrap_or(0) as u32,
            updated_columns: response.updated_columns.unwrap_or(0) as u32,
            updated_cells: response.updated_cells.unwrap_or(0) as u32,
        }
    }
}

/// Operations issued against the spreadsheet values sub-resource.
/// [`SpreadsheetClient`](crate::SpreadsheetClient) talks to the service
/// exclusively through this trait.
#[async_trait]
pub trait ValuesOperations: Send + Sync {
    async fn get(
        &self,
        spreadsheet_id: &str,
        range: &str,
        dimension: Dimension,
    ) -> Result<ValueGrid>;

    async fn batch_get(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<Vec<ValueGrid>>;

    async fn append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: ValueGrid,
    ) -> Result<UpdateSummary>;

    async fn update(&self, spreadsheet_id: &str, range: &str, values: ValueGrid) -> Result<u32>;

    async fn batch_update(&self, spreadsheet_id: &str, requests: &[BatchRequest]) -> Result<u32>;

    async fn clear(&self, spreadsheet_id: &str, range: &str) -> Result<String>;
}

/// Builds the values client once a valid access token is available.
pub(crate) trait ValuesConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Result<Box<dyn ValuesOperations>>;
}

pub(crate) struct GoogleConnector {
    scope: Scope,
}

impl GoogleConnector {
    pub(crate) fn new(scope: Scope) -> Self {
        Self { scope }
    }
}

impl ValuesConnector for GoogleConnector {
    fn connect(&self, access_token: &str) -> Result<Box<dyn ValuesOperations>> {
        Ok(Box::new(GoogleValuesClient::connect(
            self.scope,
            access_token,
        )?))
    }
}

/// [`ValuesOperations`] over a Sheets hub authorized with a bearer token.
pub struct GoogleValuesClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
    scope: Scope,
}

impl GoogleValuesClient {
    pub fn connect(scope: Scope, access_token: &str) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| Error::Remote(format!("Failed to load native TLS roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);
        let hub = Sheets::new(client, access_token.to_string());

        Ok(Self { hub, scope })
    }

    /// The underlying hub, for requests this wrapper does not cover.
    pub fn hub(&self) -> &Sheets<HttpsConnector<HttpConnector>> {
        &self.hub
    }

    fn value_range(range: &str, values: ValueGrid) -> ValueRange {
        ValueRange {
            major_dimension: None,
            range: Some(range.to_string()),
            values: Some(values),
        }
    }
}

#[async_trait]
impl ValuesOperations for GoogleValuesClient {
    async fn get(
        &self,
        spreadsheet_id: &str,
        range: &str,
        dimension: Dimension,
    ) -> Result<ValueGrid> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .major_dimension(dimension.as_str())
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| Error::Remote(format!("Failed to read range '{}': {}", range, e)))?;

        Ok(response.values.unwrap_or_default())
    }

    async fn batch_get(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<Vec<ValueGrid>> {
        let mut call = self.hub.spreadsheets().values_batch_get(spreadsheet_id);
        for range in ranges {
            call = call.add_ranges(range);
        }

        let (_, response) = call
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| {
                Error::Remote(format!("Failed to read {} ranges: {}", ranges.len(), e))
            })?;

        // One response per range, in request order.
        Ok(response
            .value_ranges
            .unwrap_or_default()
            .into_iter()
            .map(|value_range| value_range.values.unwrap_or_default())
            .collect())
    }

    async fn append(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: ValueGrid,
    ) -> Result<UpdateSummary> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_append(Self::value_range(range, values), spreadsheet_id, range)
            .value_input_option(VALUE_INPUT_OPTION)
            .insert_data_option(INSERT_DATA_OPTION)
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| {
                Error::Remote(format!("Failed to append to range '{}': {}", range, e))
            })?;

        Ok(response.updates.unwrap_or_default().into())
    }

    async fn update(&self, spreadsheet_id: &str, range: &str, values: ValueGrid) -> Result<u32> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_update(Self::value_range(range, values), spreadsheet_id, range)
            .value_input_option(VALUE_INPUT_OPTION)
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| Error::Remote(format!("Failed to update range '{}': {}", range, e)))?;

        Ok(response.updated_cells.unwrap_or(0) as u32)
    }

    async fn batch_update(&self, spreadsheet_id: &str, requests: &[BatchRequest]) -> Result<u32> {
        let data = requests
            .iter()
            .map(|request| Self::value_range(&request.range, request.values.clone()))
            .collect();

        let body = BatchUpdateValuesRequest {
            data: Some(data),
            value_input_option: Some(VALUE_INPUT_OPTION.to_string()),
            ..Default::default()
        };

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_batch_update(body, spreadsheet_id)
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| {
                Error::Remote(format!(
                    "Failed to submit batch update of {} ranges: {}",
                    requests.len(),
                    e
                ))
            })?;

        Ok(response.total_updated_cells.unwrap_or(0) as u32)
    }

    async fn clear(&self, spreadsheet_id: &str, range: &str) -> Result<String> {
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_clear(ClearValuesRequest::default(), spreadsheet_id, range)
            .add_scope(self.scope.url())
            .doit()
            .await
            .map_err(|e| Error::Remote(format!("Failed to clear range '{}': {}", range, e)))?;

        Ok(response.cleared_range.unwrap_or_default())
    }
}
