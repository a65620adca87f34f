use anyhow::{bail, Context};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets `values` API client: read one column, write one cell.
///
/// Token refresh is the caller's problem; a bearer token is supplied at
/// construction and used for the whole run.
pub struct SheetClient {
    client: Client,
    sheet_id: String,
    worksheet: String,
    token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetClient {
    pub fn new(sheet_id: &str, worksheet: &str, token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            sheet_id: sheet_id.to_string(),
            worksheet: worksheet.to_string(),
            token: token.to_string(),
        })
    }

    fn range_url(&self, range: &str) -> anyhow::Result<Url> {
        Url::parse(&format!("{API_BASE}/{}/values/{}", self.sheet_id, range))
            .with_context(|| format!("invalid sheet range: {range}"))
    }

    /// All values in `column` from `from_row` down. Blank interior cells
    /// come back as empty strings so list positions line up with rows;
    /// the API drops trailing blank rows, which is fine.
    pub async fn col_values(&self, column: u32, from_row: u32) -> anyhow::Result<Vec<String>> {
        let letter = column_letter(column);
        let range = format!("'{}'!{}{}:{}", self.worksheet, letter, from_row, letter);

        let res = self
            .client
            .get(self.range_url(&range)?)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("sheet read request failed")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            bail!("failed to read {range}: {status} {body}");
        }

        let body: ValueRange = res.json().await.context("unexpected sheet response")?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    /// Set a single cell, raw value, no formula interpretation.
    pub async fn update_cell(
        &self,
        column_letter: &str,
        row: u32,
        value: &str,
    ) -> anyhow::Result<()> {
        let range = format!("'{}'!{}{}", self.worksheet, column_letter, row);

        let res = self
            .client
            .put(self.range_url(&range)?)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [[value]] }))
            .send()
            .await
            .context("sheet write request failed")?;

        if !res.status().is_success() {
            bail!("failed to write {range}: {}", res.status());
        }
        Ok(())
    }
}

/// 1-based column number to spreadsheet letters: 1 -> A, 27 -> AA.
pub fn column_letter(mut column: u32) -> String {
    debug_assert!(column >= 1);
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push(b'A' + (column % 26) as u8);
        column /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
