//! Proxy-pool failover
//!
//! The proxy pool is an external collaborator queried fresh for every
//! failover fetch, so pool churn between attempts is tolerated. Failover is
//! ordered and bounded: proxies are tried in the order the pool returns
//! them, at most `max_proxies_tried` of them, with a fixed number of
//! attempts each. Exhaustion yields empty content, indistinguishable from a
//! direct fetch failure.

use crate::crawler::fetcher::{FetchError, Fetcher, PageBody};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;

/// Source of the current proxy list
///
/// `get_all` returns the full ordered list; it is called once per failover
/// fetch and its result is never cached beyond that fetch.
pub trait ProxyProvider: Send + Sync {
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<String>, FetchError>>;
}

/// Proxy-pool collaborator speaking the HTTP JSON-array protocol
pub struct HttpProxyPool {
    client: Client,
    pool_url: String,
}

impl HttpProxyPool {
    pub fn new(pool_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            pool_url: pool_url.to_string(),
        })
    }
}

impl ProxyProvider for HttpProxyPool {
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<String>, FetchError>> {
        async move {
            let response = self
                .client
                .get(&self.pool_url)
                .send()
                .await
                .map_err(|e| FetchError::Pool(e.to_string()))?;
            let proxies: Vec<String> = response
                .json()
                .await
                .map_err(|e| FetchError::Pool(e.to_string()))?;
            Ok(proxies)
        }
        .boxed()
    }
}

/// Fetches a page through the proxy pool with bounded, ordered failover
///
/// At most `max_proxies_tried` proxies are attempted, `retry_times` tries
/// each, in pool order. Returns `None` when the bound is exhausted or the
/// pool itself is unreachable.
pub async fn fetch_with_proxy_failover(
    fetcher: &Fetcher,
    provider: &dyn ProxyProvider,
    url: &str,
    headers: &HeaderMap,
    max_proxies_tried: usize,
    retry_times: usize,
) -> Option<PageBody> {
    let proxies = match provider.get_all().await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("Failed to fetch proxy list: {}", e);
            return None;
        }
    };

    for proxy in proxies.iter().take(max_proxies_tried) {
        for _ in 0..retry_times {
            match fetcher.fetch_once(url, headers, Some(proxy)).await {
                Ok(body) => return Some(body),
                Err(e) => {
                    tracing::warn!(
                        "Download page content failed, now retry, url: {}, proxy: {}, error: {}",
                        url,
                        proxy,
                        e
                    );
                }
            }
        }
    }
    None
}
