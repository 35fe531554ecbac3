//! Sitegather: a depth-bounded site page collector
//!
//! This crate implements a web crawler that recursively collects the pages of
//! a target site, filters out useless (maintenance/error) pages with a
//! multi-pattern phrase classifier, and hands finished frontiers to a
//! pluggable output sink.

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for sitegather operations
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classifier construction failed: {0}")]
    Classifier(String),

    #[error("Invalid traversal level: {0} (must be 0, 1 or 2)")]
    InvalidLevel(u8),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for sitegather operations
pub type Result<T> = std::result::Result<T, GatherError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use classifier::UselessPageClassifier;
pub use config::{Config, TraversalLevel};
pub use crawler::{CrawlCounters, CrawlEngine, CrawlTask};
pub use url::{canonicalize, host_of, registrable_domain, resolve_link};
