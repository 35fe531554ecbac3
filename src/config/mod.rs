//! Configuration loading, validation, and types
//!
//! Configuration is a TOML file loaded at startup; validation is fail-fast
//! so a misconfigured task never starts crawling with undefined semantics.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    ClassifierConfig, Config, CrawlerConfig, OutputConfig, ProxyConfig, RenderConfig,
    TraversalLevel,
};
pub use validation::validate;
