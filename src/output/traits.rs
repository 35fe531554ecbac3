//! Output collaborator contract
//!
//! Sinks receive one batch per frontier: the crawl task's site URL plus a
//! map of page URL to content. A sink must tolerate being invoked multiple
//! times per crawl with overlapping or disjoint URL sets; no ordering is
//! guaranteed between deliveries and other crawl activity.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Unknown sink: {0}")]
    UnknownSink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Content of a fetched page, per the task's decode flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Decoded text (decode flag on)
    Text(String),

    /// Raw payload bytes (decode flag off)
    Bytes(Vec<u8>),
}

impl PageContent {
    /// True for pages whose payload ended up empty
    pub fn is_empty(&self) -> bool {
        match self {
            PageContent::Text(t) => t.is_empty(),
            PageContent::Bytes(b) => b.is_empty(),
        }
    }
}

/// One frontier's worth of results, handed to the sink then discarded
#[derive(Debug, Clone)]
pub struct FrontierBatch {
    /// The crawl task's site root URL
    pub task: String,

    /// Page URL to content for every page kept in this frontier
    pub results: HashMap<String, PageContent>,

    /// Delivery timestamp
    pub collected_at: DateTime<Utc>,
}

impl FrontierBatch {
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            results: HashMap::new(),
            collected_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Destination for finished frontiers
///
/// Implementations must be thread-safe; the engine calls `handle` once per
/// frontier from its own task.
pub trait PageSink: Send + Sync {
    fn handle(&self, batch: &FrontierBatch) -> OutputResult<()>;
}

/// Pre-storage text transformation hook supplied by a collaborator
///
/// The core only calls this; the default is the identity transform.
pub trait TextFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// The identity text filter
pub struct NoopFilter;

impl TextFilter for NoopFilter {
    fn filter(&self, text: String) -> String {
        text
    }
}
