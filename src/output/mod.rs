//! Output sinks and the sink registry
//!
//! Sinks are looked up by name from an explicit registry populated at
//! startup. Alternate destinations (document stores, queues) register a
//! factory under their own name; nothing is discovered by reflection or
//! directory scanning.

mod file;
mod traits;

pub use file::FileSink;
pub use traits::{
    FrontierBatch, NoopFilter, OutputError, OutputResult, PageContent, PageSink, TextFilter,
};

use crate::config::OutputConfig;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a sink from the output configuration
pub type SinkFactory = fn(&OutputConfig) -> OutputResult<Arc<dyn PageSink>>;

/// Name-to-factory mapping for output sinks
pub struct SinkRegistry {
    factories: HashMap<String, SinkFactory>,
}

impl SinkRegistry {
    /// Creates a registry with the built-in sinks registered
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("file", |config| {
            Ok(Arc::new(FileSink::new(
                std::path::Path::new(&config.dir),
                config.b64_names,
            )))
        });
        registry
    }

    /// Registers a sink factory under a name; the last registration wins
    pub fn register(&mut self, name: &str, factory: SinkFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Builds the sink configured under `config.sink`
    pub fn build(&self, config: &OutputConfig) -> OutputResult<Arc<dyn PageSink>> {
        let factory = self
            .factories
            .get(&config.sink)
            .ok_or_else(|| OutputError::UnknownSink(config.sink.clone()))?;
        factory(config)
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
