use std::time::Duration;

use anyhow::{bail, Context};
use tokio::time::sleep;
use tracing::info;

use crate::{
    config::Config,
    crawler::fetcher::Fetcher,
    crawler::models::{ChunkEnd, ChunkOutcome, ExtractionResult, RunSummary},
    crawler::runner::BatchRunner,
    progress::ProgressStore,
    storage::sheets::SheetClient,
};

/// One full invocation: read the ASIN column, resume from the checkpoint,
/// run one chunk, save progress, write results back to the sheet.
pub struct ScrapeService {
    cfg: Config,
    sheet: SheetClient,
    progress: ProgressStore,
}

impl ScrapeService {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let sheet = SheetClient::new(&cfg.sheet_id, &cfg.worksheet_name, &cfg.api_token)?;
        let progress = ProgressStore::new(&cfg.progress_file);
        Ok(Self {
            cfg,
            sheet,
            progress,
        })
    }

    pub async fn run(&self) -> anyhow::Result<RunSummary> {
        // Setup failures here are fatal and happen before any fetching,
        // so no progress is mutated.
        let asins = self
            .sheet
            .col_values(self.cfg.asin_column, self.cfg.start_row)
            .await
            .context("failed to read ASIN column")?;

        if asins.iter().all(|a| a.trim().is_empty()) {
            bail!(
                "no ASINs found in column {} from row {}",
                self.cfg.asin_column,
                self.cfg.start_row
            );
        }

        let total = asins.len();
        let non_blank = asins.iter().filter(|a| !a.trim().is_empty()).count();
        info!(total, non_blank, "loaded ASIN list");

        let start_index = self.progress.next_index().await;
        if start_index >= total {
            info!("all ASINs have been processed");
            return Ok(RunSummary {
                attempted: 0,
                found: 0,
                last_processed: total as i64 - 1,
                total,
                remaining: 0,
            });
        }

        let fetcher = Fetcher::new(&self.cfg.base_url, self.cfg.page_delay_ms)?;
        let runner = BatchRunner::new(fetcher, self.cfg.chunk_size);
        let outcome = runner.run(&asins, start_index).await;

        // A CAPTCHA halt leaves the halted position unattempted, so the
        // checkpoint lands one before it and the next run retries it.
        let last_processed = match outcome.end {
            ChunkEnd::Completed => outcome.stop_index as i64,
            ChunkEnd::CaptchaHalt => outcome.stop_index as i64 - 1,
        };
        self.progress
            .save(last_processed)
            .await
            .context("failed to save progress, aborting to avoid losing the checkpoint")?;

        if !outcome.results.is_empty() {
            self.write_results(&asins, &outcome.results).await?;
        }

        Ok(self.summarize(&outcome, last_processed, total))
    }

    /// Write each result into the result column, at every row whose ASIN
    /// matches. Writes are idempotent per cell, so re-running after a
    /// crash between checkpoint save and here only re-writes the same
    /// values.
    async fn write_results(
        &self,
        asins: &[String],
        results: &[ExtractionResult],
    ) -> anyhow::Result<()> {
        info!(count = results.len(), "writing results to sheet");
        let delay = Duration::from_millis(self.cfg.write_delay_ms);

        for result in results {
            for (position, _) in asins.iter().enumerate().filter(|(_, a)| **a == result.asin) {
                let row = self.cfg.start_row + position as u32;
                self.sheet
                    .update_cell(&self.cfg.result_column, row, &result.text)
                    .await
                    .with_context(|| format!("failed to write result for {}", result.asin))?;

                // the sheet API has rate limits of its own
                sleep(delay).await;
            }
        }
        Ok(())
    }

    fn summarize(&self, outcome: &ChunkOutcome, last_processed: i64, total: usize) -> RunSummary {
        let processed = (last_processed + 1).max(0) as usize;
        RunSummary {
            attempted: outcome.attempted,
            found: outcome.found,
            last_processed,
            total,
            remaining: total - processed,
        }
    }
}
