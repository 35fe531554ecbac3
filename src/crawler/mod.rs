//! Crawler module for web page fetching and traversal
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with charset decoding and render-service delegation
//! - Client-side redirect resolution
//! - Rotating-proxy failover
//! - The depth-bounded, concurrency-bounded crawl engine

mod engine;
mod fetcher;
mod proxy;
mod redirect;

pub use engine::{CrawlCounters, CrawlEngine, CrawlTask};
pub use fetcher::{build_http_client, decode_body, FetchError, Fetcher, PageBody};
pub use proxy::{fetch_with_proxy_failover, HttpProxyPool, ProxyProvider};
pub use redirect::resolve_client_redirect;

use crate::classifier::UselessPageClassifier;
use crate::config::Config;
use crate::output::{NoopFilter, SinkRegistry};
use crate::{GatherError, Result};
use std::path::Path;
use std::sync::Arc;

/// Builds the useless-page classifier a task will run with
///
/// Configured patterns override the compiled-in list; a persisted model is
/// reused when one is loadable. Construction failure aborts task startup.
pub fn build_classifier(config: &Config) -> Result<UselessPageClassifier> {
    let settings = &config.classifier;
    let threshold = settings.max_useless_page_len;
    if settings.patterns.is_empty() {
        match &settings.model_path {
            Some(path) => UselessPageClassifier::with_model_path(
                crate::classifier::USELESS_PAGE_FEATURES,
                threshold,
                Path::new(path),
            ),
            None => UselessPageClassifier::new(crate::classifier::USELESS_PAGE_FEATURES, threshold),
        }
    } else {
        match &settings.model_path {
            Some(path) => UselessPageClassifier::with_model_path(
                &settings.patterns,
                threshold,
                Path::new(path),
            ),
            None => UselessPageClassifier::new(&settings.patterns, threshold),
        }
    }
}

/// Crawls one site to completion and returns its counters
///
/// Only startup errors (configuration, classifier, sink lookup) surface;
/// per-page failures are absorbed into the counters.
pub async fn crawl_site(site: &str, config: &Config) -> Result<CrawlCounters> {
    let classifier = Arc::new(build_classifier(config)?);
    let registry = SinkRegistry::with_defaults();
    let sink = registry.build(&config.output).map_err(GatherError::Output)?;
    let engine = CrawlEngine::new(site, config, classifier, sink, Arc::new(NoopFilter), None)?;
    Ok(engine.run().await)
}
