use tracing::{info, warn};

use crate::crawler::extractor::{self, ExtractionOutcome};
use crate::crawler::fetcher::PageSource;
use crate::crawler::models::{ChunkEnd, ChunkOutcome, ExtractionResult, ItemOutcome};

/// Drives one bounded chunk of the identifier list through fetch and
/// extraction, strictly sequentially.
pub struct BatchRunner<S> {
    source: S,
    chunk_size: usize,
}

impl<S: PageSource> BatchRunner<S> {
    pub fn new(source: S, chunk_size: usize) -> Self {
        Self { source, chunk_size }
    }

    /// Process positions `start_index .. min(start_index + chunk_size, len)`.
    ///
    /// Blank identifiers and failed fetches consume their position without
    /// counting as attempted. A CAPTCHA halt returns immediately with the
    /// halted position as `stop_index`; that position is not attempted and
    /// the caller must checkpoint it for retry. Results accumulated before
    /// a halt are still returned.
    pub async fn run(&self, asins: &[String], start_index: usize) -> ChunkOutcome {
        let end_index = (start_index + self.chunk_size).min(asins.len());
        info!(start_index, end = end_index - 1, "processing chunk");

        let mut results = Vec::new();
        let mut attempted = 0usize;
        let mut found = 0usize;

        for index in start_index..end_index {
            let asin = &asins[index];

            match self.process_item(index, asin).await {
                ItemOutcome::Empty | ItemOutcome::FetchFailed => {}
                ItemOutcome::Challenge => {
                    warn!(index, "CAPTCHA detected, stopping batch");
                    return ChunkOutcome {
                        results,
                        attempted,
                        found,
                        stop_index: index,
                        end: ChunkEnd::CaptchaHalt,
                    };
                }
                ItemOutcome::NotFound => {
                    attempted += 1;
                }
                ItemOutcome::Found(text) => {
                    info!(index, asin = %asin, text = %text, "found social-proof signal");
                    results.push(ExtractionResult {
                        asin: asin.clone(),
                        text,
                    });
                    attempted += 1;
                    found += 1;
                }
            }
        }

        ChunkOutcome {
            results,
            attempted,
            found,
            stop_index: end_index - 1,
            end: ChunkEnd::Completed,
        }
    }

    async fn process_item(&self, index: usize, asin: &str) -> ItemOutcome {
        if asin.trim().is_empty() {
            return ItemOutcome::Empty;
        }

        let html = match self.source.fetch(asin).await {
            Ok(html) => html,
            Err(e) => {
                warn!(index, asin = %asin, error = %e, "fetch failed, skipping");
                return ItemOutcome::FetchFailed;
            }
        };

        match extractor::extract(&html) {
            ExtractionOutcome::Challenge => ItemOutcome::Challenge,
            ExtractionOutcome::Found(text) => ItemOutcome::Found(text),
            ExtractionOutcome::NotFound => ItemOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::bail;

    use super::*;

    enum Page {
        Signal(&'static str),
        Plain,
        Captcha,
        NetworkError,
    }

    struct FakeSource {
        pages: HashMap<&'static str, Page>,
    }

    impl FakeSource {
        fn new(pages: Vec<(&'static str, Page)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
            }
        }
    }

    impl PageSource for FakeSource {
        async fn fetch(&self, asin: &str) -> anyhow::Result<String> {
            match self.pages.get(asin) {
                Some(Page::Signal(text)) => Ok(format!(
                    "<html><body><div id=\"social-proofing-faceout-title-tk_bought\">\
                     <span>{text}</span></div></body></html>"
                )),
                Some(Page::Plain) => {
                    Ok("<html><body><p>In stock</p></body></html>".to_string())
                }
                Some(Page::Captcha) => Ok("<html><body><h4>Robot Check</h4>\
                     <input id=\"captchacharacters\"></body></html>"
                    .to_string()),
                Some(Page::NetworkError) | None => bail!("connection reset"),
            }
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn collects_results_and_counts() {
        let source = FakeSource::new(vec![
            ("A1", Page::Signal("1K+ bought in past month")),
            ("B2", Page::Plain),
            ("C3", Page::Signal("50+ bought in past month")),
        ]);
        let runner = BatchRunner::new(source, 10);

        let outcome = runner.run(&ids(&["A1", "B2", "C3"]), 0).await;

        assert_eq!(outcome.end, ChunkEnd::Completed);
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.found, 2);
        assert_eq!(outcome.stop_index, 2);
        assert_eq!(
            outcome.results,
            vec![
                ExtractionResult {
                    asin: "A1".into(),
                    text: "1K+ bought in past month".into()
                },
                ExtractionResult {
                    asin: "C3".into(),
                    text: "50+ bought in past month".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn captcha_halts_without_counting_the_halted_position() {
        let source = FakeSource::new(vec![
            ("A1", Page::Signal("200+ bought in past month")),
            ("B2", Page::Captcha),
            ("C3", Page::Signal("300+ bought in past month")),
        ]);
        let runner = BatchRunner::new(source, 10);

        let outcome = runner.run(&ids(&["A1", "B2", "C3"]), 0).await;

        assert_eq!(outcome.end, ChunkEnd::CaptchaHalt);
        assert_eq!(outcome.stop_index, 1);
        assert_eq!(outcome.attempted, 1);
        // results gathered before the halt survive
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].asin, "A1");
    }

    #[tokio::test]
    async fn fetch_failure_skips_the_item_and_continues() {
        let source = FakeSource::new(vec![
            ("A1", Page::Plain),
            ("B2", Page::NetworkError),
            ("C3", Page::Signal("400+ bought in past month")),
        ]);
        let runner = BatchRunner::new(source, 10);

        let outcome = runner.run(&ids(&["A1", "B2", "C3"]), 0).await;

        assert_eq!(outcome.end, ChunkEnd::Completed);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.found, 1);
        assert_eq!(outcome.stop_index, 2);
    }

    #[tokio::test]
    async fn blank_identifiers_occupy_positions_but_are_never_attempted() {
        let source = FakeSource::new(vec![("A1", Page::Plain), ("B2", Page::Plain)]);
        let runner = BatchRunner::new(source, 10);

        let outcome = runner.run(&ids(&["A1", "", "  ", "B2"]), 0).await;

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.stop_index, 3);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn chunk_is_clamped_to_the_list_length() {
        let source = FakeSource::new(vec![("A1", Page::Plain)]);
        let runner = BatchRunner::new(source, 100);

        let outcome = runner.run(&ids(&["A1"]), 0).await;
        assert_eq!(outcome.stop_index, 0);
        assert_eq!(outcome.attempted, 1);
    }

    // End-to-end resumption: three invocations walk the whole list in
    // chunks of two, checkpointing between runs.
    #[tokio::test]
    async fn repeated_runs_cover_every_position_exactly_once() {
        let pages = || {
            FakeSource::new(vec![
                ("A1", Page::Plain),
                ("B2", Page::Signal("500+ bought in past month")),
                ("C3", Page::Plain),
                ("D4", Page::Plain),
            ])
        };
        let asins = ids(&["A1", "", "B2", "C3", "D4"]);
        let mut last_processed: i64 = -1;
        let mut total_attempted = 0usize;

        // run 1: positions 0-1 (blank at 1)
        let outcome = BatchRunner::new(pages(), 2)
            .run(&asins, (last_processed + 1) as usize)
            .await;
        assert_eq!(outcome.stop_index, 1);
        assert_eq!(outcome.attempted, 1);
        last_processed = outcome.stop_index as i64;
        total_attempted += outcome.attempted;

        // run 2: positions 2-3
        let outcome = BatchRunner::new(pages(), 2)
            .run(&asins, (last_processed + 1) as usize)
            .await;
        assert_eq!(outcome.stop_index, 3);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.found, 1);
        last_processed = outcome.stop_index as i64;
        total_attempted += outcome.attempted;

        // run 3: position 4
        let outcome = BatchRunner::new(pages(), 2)
            .run(&asins, (last_processed + 1) as usize)
            .await;
        assert_eq!(outcome.stop_index, 4);
        assert_eq!(outcome.attempted, 1);
        last_processed = outcome.stop_index as i64;
        total_attempted += outcome.attempted;

        // a fourth invocation has nothing left to start from
        assert_eq!((last_processed + 1) as usize, asins.len());
        assert_eq!(total_attempted, 4);
    }

    #[tokio::test]
    async fn halted_position_is_retried_on_the_next_run() {
        let asins = ids(&["A1", "B2"]);

        let outcome = BatchRunner::new(
            FakeSource::new(vec![("A1", Page::Plain), ("B2", Page::Captcha)]),
            10,
        )
        .run(&asins, 0)
        .await;
        assert_eq!(outcome.end, ChunkEnd::CaptchaHalt);
        assert_eq!(outcome.stop_index, 1);

        // caller checkpoints stop_index - 1, so the next run starts at 1
        let last_processed = outcome.stop_index as i64 - 1;
        let next_start = (last_processed + 1) as usize;
        assert_eq!(next_start, 1);

        // the challenge cleared; position 1 is attempted this time
        let outcome = BatchRunner::new(
            FakeSource::new(vec![("B2", Page::Signal("600+ bought in past month"))]),
            10,
        )
        .run(&asins, next_start)
        .await;
        assert_eq!(outcome.end, ChunkEnd::Completed);
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.found, 1);
    }
}
