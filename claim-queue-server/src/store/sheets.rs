// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Google Sheets backed claim store
//!
//! Layout of the claims tab (row 1 is the header):
//!
//! ```text
//!   A    B       C       D          E       F            G
//!   ID | Amount | Wallet | Timestamp | Status | ProcessedAt | ErrorMessage
//! ```
//!
//! Rows are only appended or updated in place, never deleted, so row order is
//! insertion order.

use super::{ClaimStore, ServiceAccountAuth};
use crate::error::{ClaimError, ClaimResult};
use crate::types::{Claim, ClaimStatus, StatusUpdate, StoreHealth};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

pub const DEFAULT_SHEET_NAME: &str = "Claims";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub const CLAIM_HEADERS: [&str; 7] = [
    "ID",
    "Amount",
    "Wallet",
    "Timestamp",
    "Status",
    "ProcessedAt",
    "ErrorMessage",
];

const COL_ID: usize = 0;
const COL_AMOUNT: usize = 1;
const COL_WALLET: usize = 2;
const COL_TIMESTAMP: usize = 3;
const COL_STATUS: usize = 4;
const COL_PROCESSED_AT: usize = 5;
const COL_ERROR: usize = 6;

/// Sheets store configuration
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub api_base: String,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: String) -> Self {
        Self {
            spreadsheet_id,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
        }
    }

    /// Full-table range, e.g. `Claims!A:G`
    pub fn table_range(&self) -> String {
        format!("{}!A:G", self.sheet_name)
    }

    /// Header row range, e.g. `Claims!A1:G1`
    pub fn header_range(&self) -> String {
        format!("{}!A1:G1", self.sheet_name)
    }

    /// Single cell range, e.g. `Claims!E5`
    pub fn cell_range(&self, column: char, row: usize) -> String {
        format!("{}!{}{}", self.sheet_name, column, row)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: Option<SpreadsheetProperties>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: Option<String>,
}

/// Claim store backed by one tab of a Google spreadsheet
pub struct SheetsClaimStore {
    config: SheetsConfig,
    client: Client,
    auth: ServiceAccountAuth,
}

impl SheetsClaimStore {
    pub fn new(config: SheetsConfig, client: Client, auth: ServiceAccountAuth) -> Self {
        Self {
            config,
            client,
            auth,
        }
    }

    /// Verify connectivity and make sure the header row exists
    pub async fn initialize(&self) -> ClaimResult<()> {
        let health = self.check_connection().await?;
        info!(
            "[SheetsStore] Connected to spreadsheet {:?}",
            health.title.unwrap_or_default()
        );
        self.ensure_headers().await?;
        info!("[SheetsStore] Initialized");
        Ok(())
    }

    async fn ensure_headers(&self) -> ClaimResult<()> {
        let range = self.config.header_range();
        let existing = self.get_values(&range).await?;
        if !existing.values.is_empty() {
            return Ok(());
        }

        let url = self.values_url(&range)?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [CLAIM_HEADERS] }));
        self.send("write headers", request).await?;
        info!("[SheetsStore] Header row added to {}", range);
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> ClaimResult<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| ClaimError::Config(format!("Invalid Sheets API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClaimError::Config("Sheets API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&self.config.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, range: &str) -> ClaimResult<Url> {
        self.endpoint(&["values", range])
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> ClaimResult<Response> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            error!("[SheetsStore] {} request failed: {}", operation, e);
            ClaimError::StoreUnavailable(format!("{}: {}", operation, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(
            "[SheetsStore] {} failed with {}: {}",
            operation,
            status,
            body.chars().take(200).collect::<String>()
        );
        Err(ClaimError::StoreUnavailable(format!(
            "{} failed with status {}",
            operation, status
        )))
    }

    async fn get_values(&self, range: &str) -> ClaimResult<ValueRange> {
        let url = self.values_url(range)?;
        let request = self
            .client
            .get(url)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);
        let response = self.send("read values", request).await?;
        Ok(response.json::<ValueRange>().await?)
    }

    async fn read_rows(&self) -> ClaimResult<Vec<Vec<Value>>> {
        Ok(self.get_values(&self.config.table_range()).await?.values)
    }
}

#[async_trait]
impl ClaimStore for SheetsClaimStore {
    async fn append(&self, claim: &Claim) -> ClaimResult<()> {
        let append_range = format!("{}:append", self.config.table_range());
        let url = self.endpoint(&["values", append_range.as_str()])?;
        let request = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [claim_to_row(claim)] }));

        self.send("append claim", request).await.map_err(|e| {
            error!("[SheetsStore] Failed to append claim {}: {}", claim.id, e);
            e
        })?;
        debug!("[SheetsStore] Claim {} appended", claim.id);
        Ok(())
    }

    async fn list_all(&self) -> ClaimResult<Vec<Claim>> {
        let rows = self.read_rows().await?;
        Ok(claims_from_rows(&rows))
    }

    async fn update_status(&self, id: &str, update: StatusUpdate) -> ClaimResult<()> {
        let rows = self.read_rows().await?;
        let row_number =
            find_row_number(&rows, id).ok_or_else(|| ClaimError::ClaimNotFound(id.to_string()))?;

        let mut data = vec![json!({
            "range": self.config.cell_range('E', row_number),
            "values": [[update.status.as_str()]],
        })];
        if let Some(at) = update.processed_at {
            data.push(json!({
                "range": self.config.cell_range('F', row_number),
                "values": [[format_timestamp(&at)]],
            }));
        }
        data.push(json!({
            "range": self.config.cell_range('G', row_number),
            "values": [[update.error_message.clone().unwrap_or_default()]],
        }));

        let url = self.endpoint(&["values:batchUpdate"])?;
        let request = self.client.post(url).json(&json!({
            "valueInputOption": "RAW",
            "data": data,
        }));
        self.send("update claim status", request)
            .await
            .map_err(|e| {
                error!("[SheetsStore] Failed to update claim {}: {}", id, e);
                e
            })?;

        debug!(
            "[SheetsStore] Claim {} (row {}) -> {}",
            id, row_number, update.status
        );
        Ok(())
    }

    async fn check_connection(&self) -> ClaimResult<StoreHealth> {
        let url = self.endpoint(&[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "properties.title")]);
        let meta: SpreadsheetMeta = self
            .send("fetch spreadsheet", request)
            .await?
            .json()
            .await?;

        Ok(StoreHealth {
            connected: true,
            backend: "google_sheets".to_string(),
            title: meta.properties.and_then(|p| p.title),
            checked_at: Utc::now(),
        })
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn claim_to_row(claim: &Claim) -> Vec<Value> {
    vec![
        json!(claim.id),
        json!(claim.amount),
        json!(claim.wallet),
        json!(format_timestamp(&claim.created_at)),
        json!(claim.status.as_str()),
        json!(claim
            .processed_at
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_default()),
        json!(claim.error_message.clone().unwrap_or_default()),
    ]
}

fn cell_text(row: &[Value], column: usize) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn claim_from_row(row: &[Value]) -> Option<Claim> {
    let id = cell_text(row, COL_ID);
    if id.is_empty() {
        return None;
    }

    let amount = match row.get(COL_AMOUNT) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    let status_text = cell_text(row, COL_STATUS);
    let status = if status_text.is_empty() {
        ClaimStatus::Pending
    } else {
        match status_text.parse::<ClaimStatus>() {
            Ok(status) => status,
            Err(e) => {
                warn!("[SheetsStore] Skipping claim {}: {}", id, e);
                return None;
            }
        }
    };

    let timestamp_text = cell_text(row, COL_TIMESTAMP);
    let created_at = parse_timestamp(&timestamp_text).unwrap_or_else(|| {
        warn!(
            "[SheetsStore] Claim {} has unparsable timestamp {:?}",
            id, timestamp_text
        );
        DateTime::<Utc>::default()
    });

    Some(Claim {
        id,
        amount,
        wallet: cell_text(row, COL_WALLET),
        created_at,
        status,
        processed_at: parse_timestamp(&cell_text(row, COL_PROCESSED_AT)),
        error_message: non_empty(cell_text(row, COL_ERROR)),
    })
}

/// Parse all data rows, skipping the header row
fn claims_from_rows(rows: &[Vec<Value>]) -> Vec<Claim> {
    rows.iter()
        .skip(1)
        .filter_map(|row| claim_from_row(row))
        .collect()
}

/// 1-based sheet row number of the claim, header row excluded from matching
fn find_row_number(rows: &[Vec<Value>], id: &str) -> Option<usize> {
    rows.iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| cell_text(row, COL_ID) == id)
        .map(|(index, _)| index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<Value> {
        CLAIM_HEADERS.iter().map(|h| json!(h)).collect()
    }

    #[test]
    fn test_ranges() {
        let config = SheetsConfig::new("sheet-id".to_string());
        assert_eq!(config.table_range(), "Claims!A:G");
        assert_eq!(config.header_range(), "Claims!A1:G1");
        assert_eq!(config.cell_range('E', 7), "Claims!E7");
    }

    #[test]
    fn test_claim_row_layout() {
        let created_at = parse_timestamp("2024-05-01T10:00:00.000Z").unwrap();
        let claim = Claim {
            id: "id-1".to_string(),
            amount: 100.5,
            wallet: "0xabc".to_string(),
            created_at,
            status: ClaimStatus::Pending,
            processed_at: None,
            error_message: None,
        };
        let row = claim_to_row(&claim);
        assert_eq!(row.len(), CLAIM_HEADERS.len());
        assert_eq!(row[COL_ID], json!("id-1"));
        assert_eq!(row[COL_AMOUNT], json!(100.5));
        assert_eq!(row[COL_TIMESTAMP], json!("2024-05-01T10:00:00.000Z"));
        assert_eq!(row[COL_STATUS], json!("pending"));
        assert_eq!(row[COL_PROCESSED_AT], json!(""));
        assert_eq!(row[COL_ERROR], json!(""));

        assert_eq!(claim_from_row(&row), Some(claim));
    }

    #[test]
    fn test_claims_from_rows_skips_header_and_blank_ids() {
        let rows = vec![
            header(),
            vec![
                json!("a"),
                json!("12.5"),
                json!("0x1"),
                json!("2024-05-01T10:00:00.000Z"),
                json!("completed"),
                json!("2024-05-01T10:00:15.000Z"),
            ],
            vec![json!(""), json!(1)],
            vec![json!("b"), json!(3), json!("0x2")],
        ];

        let claims = claims_from_rows(&rows);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].id, "a");
        assert_eq!(claims[0].amount, 12.5);
        assert_eq!(claims[0].status, ClaimStatus::Completed);
        assert!(claims[0].processed_at.is_some());
        assert_eq!(claims[0].error_message, None);

        // Short rows default to pending with an epoch timestamp
        assert_eq!(claims[1].id, "b");
        assert_eq!(claims[1].amount, 3.0);
        assert_eq!(claims[1].status, ClaimStatus::Pending);
        assert_eq!(claims[1].created_at, DateTime::<Utc>::default());
    }

    #[test]
    fn test_unknown_status_row_is_skipped() {
        let rows = vec![
            header(),
            vec![json!("a"), json!(1), json!("0x1"), json!(""), json!("queued")],
        ];
        assert!(claims_from_rows(&rows).is_empty());
    }

    #[test]
    fn test_unparsable_amount_is_zero() {
        let row = vec![json!("a"), json!("lots"), json!("0x1")];
        assert_eq!(claim_from_row(&row).unwrap().amount, 0.0);
    }

    #[test]
    fn test_find_row_number() {
        let rows = vec![
            header(),
            vec![json!("a")],
            vec![json!("b")],
            vec![json!("c")],
        ];
        assert_eq!(find_row_number(&rows, "a"), Some(2));
        assert_eq!(find_row_number(&rows, "c"), Some(4));
        assert_eq!(find_row_number(&rows, "missing"), None);
        // The header cell never matches
        assert_eq!(find_row_number(&rows, "ID"), None);
    }
}
