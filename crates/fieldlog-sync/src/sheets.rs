//! Google Sheets ledger backend.

use std::sync::Arc;

use async_trait::async_trait;
use fieldlog_store::{CellFormat, LedgerBackend, StoreError};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::check_status;
use crate::{ServiceAccountAuth, SyncError};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Which sheet of which spreadsheet holds the ledger.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Ledger stored on one sheet of a Google spreadsheet.
pub struct SheetsLedger {
    client: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    config: SheetsConfig,
    sheet_id: OnceCell<i64>,
}

impl SheetsLedger {
    pub fn new(
        client: reqwest::Client,
        auth: Arc<ServiceAccountAuth>,
        config: SheetsConfig,
    ) -> Self {
        Self {
            client,
            auth,
            config,
            sheet_id: OnceCell::new(),
        }
    }

    /// `'<sheet>'!<range>`, quoting the sheet title.
    fn a1(&self, range: &str) -> String {
        a1_range(&self.config.sheet_name, range)
    }

    fn values_url(&self, range: &str) -> Result<Url, SyncError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| SyncError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Url(SHEETS_API.into()))?
            .push(&self.config.spreadsheet_id)
            .push("values")
            .push(&self.a1(range));
        Ok(url)
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SyncError> {
        let url = self.values_url(range)?;
        let token = self.auth.access_token().await?;
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let body: ValueRange = check_status(resp).await?.json().await?;
        debug!(range, rows = body.values.len(), "read ledger values");
        Ok(body.values)
    }

    /// Numeric id of the ledger sheet, needed by formatting requests.
    ///
    /// Looked up by title once. An unknown title falls back to the first
    /// sheet (id 0); a failed lookup is retried on the next call.
    async fn sheet_id(&self) -> i64 {
        let lookup = self
            .sheet_id
            .get_or_try_init(|| async {
                let url = format!(
                    "{SHEETS_API}/{}?fields=sheets.properties",
                    self.config.spreadsheet_id
                );
                let token = self.auth.access_token().await?;
                let resp = self.client.get(&url).bearer_auth(token).send().await?;
                let spreadsheet: Spreadsheet = check_status(resp).await?.json().await?;
                Ok::<_, SyncError>(find_sheet_id(&spreadsheet, &self.config.sheet_name))
            })
            .await;
        match lookup {
            Ok(id) => *id,
            Err(e) => {
                warn!(error = %e, "sheet id lookup failed; using 0");
                0
            }
        }
    }
}

fn find_sheet_id(spreadsheet: &Spreadsheet, title: &str) -> i64 {
    spreadsheet
        .sheets
        .iter()
        .find(|s| s.properties.title == title)
        .map(|s| s.properties.sheet_id)
        .unwrap_or_else(|| {
            warn!(sheet = title, "sheet not found by title; using 0");
            0
        })
}

fn a1_range(sheet: &str, range: &str) -> String {
    format!("'{}'!{range}", sheet.replace('\'', "''"))
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// One `repeatCell` request for a formatting directive.
fn format_request(sheet_id: i64, directive: &CellFormat) -> Value {
    let row = directive.row();
    let column = directive.column().index();
    let range = json!({
        "sheetId": sheet_id,
        "startRowIndex": row - 1,
        "endRowIndex": row,
        "startColumnIndex": column,
        "endColumnIndex": column + 1,
    });
    match directive {
        CellFormat::Checkbox { .. } => json!({
            "repeatCell": {
                "range": range,
                "cell": {
                    "dataValidation": { "condition": { "type": "BOOLEAN" } },
                    "userEnteredValue": { "boolValue": false },
                },
                "fields": "dataValidation,userEnteredValue",
            }
        }),
        CellFormat::AlertText { .. } => json!({
            "repeatCell": {
                "range": range,
                "cell": {
                    "userEnteredFormat": {
                        "textFormat": {
                            "foregroundColor": { "red": 1, "green": 0, "blue": 0 },
                            "bold": true,
                        }
                    }
                },
                "fields": "userEnteredFormat.textFormat",
            }
        }),
    }
}

#[async_trait]
impl LedgerBackend for SheetsLedger {
    async fn anchor_len(&self) -> Result<usize, StoreError> {
        Ok(self.get_values("A:A").await?.len())
    }

    async fn key_columns(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.get_values("G:I").await?)
    }

    async fn header(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .get_values("A1:R1")
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    async fn write_row(&self, position: usize, cells: &[&str]) -> Result<(), StoreError> {
        if position == 0 || cells.is_empty() {
            return Err(StoreError::Other("nothing to write".into()));
        }
        let cells_range = format!("A{position}:{}{position}", column_letter(cells.len() - 1));
        let mut url = self.values_url(&cells_range)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&json!({
                "range": self.a1(&cells_range),
                "majorDimension": "ROWS",
                "values": [cells],
            }))
            .send()
            .await
            .map_err(SyncError::from)?;
        check_status(resp).await?;
        Ok(())
    }

    async fn format_cells(&self, directives: &[CellFormat]) -> Result<(), StoreError> {
        if directives.is_empty() {
            return Ok(());
        }
        let sheet_id = self.sheet_id().await;
        let requests: Vec<Value> = directives
            .iter()
            .map(|d| format_request(sheet_id, d))
            .collect();
        let url = format!("{SHEETS_API}/{}:batchUpdate", self.config.spreadsheet_id);
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(SyncError::from)?;
        check_status(resp).await?;
        Ok(())
    }
}
