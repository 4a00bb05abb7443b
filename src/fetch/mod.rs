pub mod drive;

use crate::config::FetchConfig;
use crate::error::{DataError, Result};
use crate::types::{CellValue, RawRow, RawTable};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Source of raw tables. The HTTP implementation talks to the sheet export
/// endpoint; tests substitute a stub.
#[async_trait]
pub trait SheetFetcher: Send + Sync {
    /// Fetch the table behind a spreadsheet share URL.
    async fn fetch_table(&self, share_url: &str) -> Result<RawTable>;
}

/// Extract the document id from a spreadsheet share URL. The id is the 6th
/// `/`-separated segment (`https://docs.google.com/spreadsheets/d/{id}/...`).
pub fn sheet_id(share_url: &str) -> Result<&str> {
    share_url
        .split('/')
        .nth(5)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DataError::SheetUrl(share_url.to_string()))
}

/// The CSV export endpoint for a share URL.
pub fn csv_export_url(share_url: &str) -> Result<String> {
    Ok(format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
        sheet_id(share_url)?
    ))
}

/// Parse a CSV body into a raw table, keeping the source's column labels in
/// their original order. Ragged rows are tolerated; missing trailing fields
/// read as absent cells.
pub fn parse_csv(body: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::with_capacity(columns.len());
        for (i, label) in columns.iter().enumerate() {
            let field = record.get(i).unwrap_or("");
            row.insert(label.clone(), CellValue::from_csv_field(field));
        }
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

/// Fetches sheet exports over HTTP with a bounded timeout per attempt.
pub struct HttpSheetFetcher {
    client: reqwest::Client,
}

impl HttpSheetFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(HttpSheetFetcher { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl SheetFetcher for HttpSheetFetcher {
    #[instrument(skip(self))]
    async fn fetch_table(&self, share_url: &str) -> Result<RawTable> {
        let export_url = csv_export_url(share_url)?;
        debug!(url = %export_url, "fetching sheet export");

        let body = self
            .client
            .get(&export_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let table = parse_csv(&body)?;
        debug!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            "parsed sheet export"
        );
        Ok(table)
    }
}
