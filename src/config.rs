use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};

/// Immutable run configuration, read once from the environment at startup.
pub struct Config {
    pub sheet_id: String,
    pub worksheet_name: String,
    /// 1-based column number holding the ASINs (3 = column C).
    pub asin_column: u32,
    /// 1-based first data row (rows above are headers).
    pub start_row: u32,
    /// Column letter the results are written to.
    pub result_column: String,
    /// ASINs processed per invocation.
    pub chunk_size: usize,
    /// Delay after every page fetch, in milliseconds.
    pub page_delay_ms: u64,
    /// Delay between sheet cell writes, in milliseconds.
    pub write_delay_ms: u64,
    pub progress_file: PathBuf,
    pub base_url: String,
    /// OAuth bearer token for the Sheets API; obtaining it is out of scope here.
    pub api_token: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = Self {
            sheet_id: env::var("SHEET_ID").context("SHEET_ID is not set")?,
            worksheet_name: env::var("WORKSHEET_NAME").context("WORKSHEET_NAME is not set")?,
            asin_column: parse_var("ASIN_COLUMN", 3)?,
            start_row: parse_var("START_ROW", 3)?,
            result_column: env::var("RESULT_COLUMN").unwrap_or_else(|_| "I".into()),
            chunk_size: parse_var("CHUNK_SIZE", 130)?,
            page_delay_ms: parse_var("PAGE_DELAY_MS", 2000)?,
            write_delay_ms: parse_var("WRITE_DELAY_MS", 1000)?,
            progress_file: env::var("PROGRESS_FILE")
                .unwrap_or_else(|_| "scraper_progress.json".into())
                .into(),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "https://www.amazon.com".into()),
            api_token: env::var("SHEETS_API_TOKEN").context("SHEETS_API_TOKEN is not set")?,
        };

        if cfg.chunk_size == 0 {
            bail!("CHUNK_SIZE must be at least 1");
        }
        if cfg.asin_column == 0 || cfg.start_row == 0 {
            bail!("ASIN_COLUMN and START_ROW are 1-based and must be at least 1");
        }

        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
