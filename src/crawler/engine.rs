//! Crawl engine - depth-bounded frontier traversal
//!
//! One engine instance owns one crawl task: its visited set, counters and
//! frontier cache are never shared with other tasks. Within a frontier the
//! per-URL steps run concurrently under a counting semaphore; a strict
//! barrier separates frontiers, so traversal is depth-synchronous even
//! though within-frontier scheduling is not deterministic.

use crate::classifier::UselessPageClassifier;
use crate::config::{Config, TraversalLevel};
use crate::crawler::fetcher::{Fetcher, DEFAULT_REFERER};
use crate::crawler::proxy::ProxyProvider;
use crate::output::{FrontierBatch, PageContent, PageSink, TextFilter};
use crate::url::{
    canonicalize, host_of, is_page_link, match_urls, registrable_domain, resolve_link,
};
use crate::GatherError;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Immutable description of one crawl
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// Site root URL; the seed of frontier 0
    pub site: String,

    /// Depth below the seed at which link expansion stops
    pub max_depth: u32,

    /// Link admission scope
    pub level: TraversalLevel,

    /// Store decoded text rather than raw bytes
    pub decode: bool,

    /// Optional pause after each fetched page
    pub request_delay_ms: u64,
}

impl CrawlTask {
    pub fn from_config(site: &str, config: &Config) -> Self {
        Self {
            site: site.to_string(),
            max_depth: config.crawler.max_depth,
            level: config.crawler.level,
            decode: config.crawler.decode,
            request_delay_ms: config.crawler.request_delay_ms,
        }
    }
}

/// Final counters reported when a crawl completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlCounters {
    /// Pages that passed dedup and were fetched
    pub attempted: u64,

    /// Fetches that returned usable content
    pub succeeded: u64,

    /// Pages dropped as blank or useless
    pub dropped: u64,
}

/// Mutable crawl state, serialized behind one lock
///
/// Membership-check-then-insert on the visited set is a read-modify-write;
/// holding both under the same mutex keeps it atomic.
#[derive(Default)]
struct CrawlState {
    visited: HashSet<String>,
    counters: CrawlCounters,
}

/// Orchestrates one crawl task
pub struct CrawlEngine {
    task: CrawlTask,
    fetcher: Fetcher,
    classifier: Arc<UselessPageClassifier>,
    sink: Arc<dyn PageSink>,
    filter: Arc<dyn TextFilter>,
    semaphore: Semaphore,
    state: Mutex<CrawlState>,
    cache: Mutex<HashMap<String, PageContent>>,
}

impl CrawlEngine {
    /// Creates an engine for one site
    ///
    /// The classifier must already be constructed: a task is never started
    /// without a working classifier. A proxy provider can be injected for
    /// tests; in proxy mode without one the configured pool is used.
    pub fn new(
        site: &str,
        config: &Config,
        classifier: Arc<UselessPageClassifier>,
        sink: Arc<dyn PageSink>,
        filter: Arc<dyn TextFilter>,
        provider: Option<Arc<dyn ProxyProvider>>,
    ) -> Result<Self, GatherError> {
        let task = CrawlTask::from_config(site, config);
        let fetcher = Fetcher::new(config, provider)?;
        Ok(Self {
            task,
            fetcher,
            classifier,
            sink,
            filter,
            semaphore: Semaphore::new(config.crawler.concurrent_limit as usize),
            state: Mutex::new(CrawlState::default()),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Runs the crawl to completion and reports the final counters
    ///
    /// Per-page failures never abort the traversal; the crawl ends when a
    /// frontier yields no new candidates or the depth bound is reached.
    pub async fn run(&self) -> CrawlCounters {
        tracing::info!(
            "The max depth to crawl for page \"{}\": {}",
            self.task.site,
            self.task.max_depth
        );

        let mut frontier: HashSet<String> = HashSet::new();
        frontier.insert(self.task.site.clone());
        let mut depth: u32 = 0;

        loop {
            // The final frontier is fetched but its links are not expanded
            let expand = depth < self.task.max_depth;
            let next = Mutex::new(HashSet::new());

            let steps = frontier
                .iter()
                .map(|url| self.crawl_one(url, depth, expand, &next));
            futures::future::join_all(steps).await;

            self.deliver_frontier();

            let next = next.into_inner().unwrap_or_default();
            if next.is_empty() {
                break;
            }
            frontier = next;
            depth += 1;
        }

        let counters = self.state.lock().unwrap().counters;
        tracing::info!(
            "Crawl finished for \"{}\": attempted {}, succeeded {}, dropped {}",
            self.task.site,
            counters.attempted,
            counters.succeeded,
            counters.dropped
        );
        counters
    }

    /// One per-URL step within a frontier
    async fn crawl_one(
        &self,
        url: &str,
        depth: u32,
        expand: bool,
        next: &Mutex<HashSet<String>>,
    ) {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let canonical = match canonicalize(url) {
            Some(c) => c,
            None => {
                tracing::debug!("Dropping unusable url: {}", url);
                return;
            }
        };
        {
            let mut state = self.state.lock().unwrap();
            if !state.visited.insert(canonical) {
                tracing::info!("The url has been crawled, now skip it: {}", url);
                return;
            }
            state.counters.attempted += 1;
        }

        let referer = if depth == 0 {
            DEFAULT_REFERER.to_string()
        } else {
            host_of(url, true, false).unwrap_or_else(|| DEFAULT_REFERER.to_string())
        };
        let body = match self.fetcher.fetch_page(url, &referer).await {
            Some(body) if !body.bytes.is_empty() => body,
            _ => {
                tracing::info!("Ignore blank page! The url: {}", url);
                self.state.lock().unwrap().counters.dropped += 1;
                return;
            }
        };
        self.state.lock().unwrap().counters.succeeded += 1;

        if self.classifier.is_useless(&body.text) {
            tracing::info!("Ignore useless page! The url: {}", url);
            self.state.lock().unwrap().counters.dropped += 1;
            return;
        }

        let content = if self.task.decode {
            PageContent::Text(self.filter.filter(body.text.clone()))
        } else {
            PageContent::Bytes(body.bytes.clone())
        };
        self.cache.lock().unwrap().insert(url.to_string(), content);

        if expand {
            let links = self.extract_links(url, &body.text);
            if links.is_empty() {
                tracing::info!("No links in page: {}", url);
            } else {
                next.lock().unwrap().extend(links);
            }
        }

        if self.task.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.task.request_delay_ms)).await;
        }
    }

    /// Hands the frontier's result cache to the sink, then clears it
    ///
    /// The cache never holds more than one frontier's worth of pages.
    fn deliver_frontier(&self) {
        let results = std::mem::take(&mut *self.cache.lock().unwrap());
        if results.is_empty() {
            return;
        }
        let mut batch = FrontierBatch::new(&self.task.site);
        batch.results = results;
        if let Err(e) = self.sink.handle(&batch) {
            tracing::error!("Output sink failed for {}: {}", self.task.site, e);
        }
    }

    /// Extracts, filters and resolves the outbound links of one page
    fn extract_links(&self, url: &str, text: &str) -> HashSet<String> {
        tracing::info!("Extract links from page: {}", url);
        let mut raw: HashSet<String> = HashSet::new();

        let document = Html::parse_document(text);
        if let Ok(selector) = Selector::parse("a[href]") {
            for element in document.select(&selector) {
                let href = match element.value().attr("href") {
                    Some(h) => h,
                    None => continue,
                };
                if href.is_empty() || href == "/" || href == "*" {
                    continue;
                }
                if href.starts_with("javascript") || href.starts_with("mailto") {
                    continue;
                }
                raw.insert(href.to_string());
            }
        }
        if let Ok(selector) = Selector::parse("frame[src], iframe[src]") {
            for element in document.select(&selector) {
                let src = match element.value().attr("src") {
                    Some(s) => s,
                    None => continue,
                };
                let trimmed = src.trim();
                if trimmed.is_empty() || trimmed == "about:blank" || src.contains('*') {
                    continue;
                }
                raw.insert(src.to_string());
            }
        }
        drop(document);

        // Catch links the markup pass missed
        raw.extend(match_urls(text));

        let current_host = host_of(url, false, false);
        let current_sld = registrable_domain(url);

        raw.into_iter()
            .filter(|link| is_page_link(link))
            .map(|link| resolve_link(url, &link))
            .filter(|resolved| match self.task.level {
                TraversalLevel::SameHost => host_of(resolved, false, false) == current_host,
                TraversalLevel::SameRegistrableDomain => {
                    registrable_domain(resolved) == current_sld
                }
                TraversalLevel::Unrestricted => true,
            })
            .collect()
    }
}
