/// One extracted signal: the ASIN and the tagline found on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub asin: String,
    pub text: String,
}

/// What happened for a single list position.
#[derive(Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Blank identifier; consumes the position without being attempted.
    Empty,
    /// Network failure; skipped, the chunk continues.
    FetchFailed,
    /// Anti-bot page; the chunk stops here and this position is retried.
    Challenge,
    /// Page fetched and parsed, no social-proof element on it.
    NotFound,
    Found(String),
}

/// How a chunk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEnd {
    Completed,
    CaptchaHalt,
}

/// Everything a single invocation of the runner produced.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub results: Vec<ExtractionResult>,
    /// Non-blank identifiers whose pages were fetched and examined.
    pub attempted: usize,
    pub found: usize,
    /// Last index examined. On a CAPTCHA halt this is the halted position
    /// itself, which was NOT attempted.
    pub stop_index: usize,
    pub end: ChunkEnd,
}

/// Figures reported to the user after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub attempted: usize,
    pub found: usize,
    pub last_processed: i64,
    pub total: usize,
    pub remaining: usize,
}
