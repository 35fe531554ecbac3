//! HTTP fetcher implementation
//!
//! One logical page fetch: issue the GET (directly, through a proxy, or via
//! the render service), decode the body to text with best-effort charset
//! detection, then run one client-side redirect resolution pass. Fetch
//! failures never propagate past the per-URL step; the engine converts
//! them to "no content".

use crate::config::{Config, ProxyConfig, RenderConfig};
use crate::crawler::proxy::{fetch_with_proxy_failover, HttpProxyPool, ProxyProvider};
use crate::crawler::redirect::resolve_client_redirect;
use crate::GatherError;
use encoding_rs::{Encoding, GB18030, UTF_8};
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Client, Proxy};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

/// Referer sent with seed-frontier requests
pub const DEFAULT_REFERER: &str = "https://www.baidu.com";

/// Common browser user-agents, rotated when no fixed override is set
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36",
    "Mozilla/5.0 (X11; Linux i586; rv:31.0) Gecko/20100101 Firefox/31.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2227.1 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10; rv:33.0) Gecko/20100101 Firefox/33.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_1) AppleWebKit/601.2.7 (KHTML, like Gecko) Version/9.0.1 Safari/601.2.7",
];

/// Errors local to the fetch boundary
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("invalid proxy address {0}: {1}")]
    Proxy(String, String),

    #[error("proxy pool unavailable: {0}")]
    Pool(String),
}

/// Raw payload and decoded text of one fetched page
#[derive(Debug, Clone)]
pub struct PageBody {
    pub bytes: Vec<u8>,
    pub text: String,
}

/// Builds the shared HTTP client
///
/// Certificate validation is off: the collector's job is to pull page
/// content, and crawled sites routinely carry broken TLS chains.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

fn build_proxy_client(addr: &str, timeout: Duration) -> Result<Client, FetchError> {
    let proxy = Proxy::all(addr).map_err(|e| FetchError::Proxy(addr.to_string(), e.to_string()))?;
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .proxy(proxy)
        .build()
        .map_err(FetchError::Http)
}

/// Performs page fetches for one crawl task
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    use_proxy: bool,
    use_render: bool,
    render: RenderConfig,
    proxy: ProxyConfig,
    provider: Option<Arc<dyn ProxyProvider>>,
    user_agent: Option<String>,
}

impl Fetcher {
    /// Creates a fetcher from the task configuration
    ///
    /// A proxy provider may be injected (tests rely on this); in proxy mode
    /// without one, the HTTP pool collaborator from the config is used.
    pub fn new(
        config: &Config,
        provider: Option<Arc<dyn ProxyProvider>>,
    ) -> Result<Self, GatherError> {
        let timeout = Duration::from_secs(config.crawler.fetch_timeout_secs);
        let client = build_http_client(timeout)?;
        let provider = match (config.crawler.use_proxy, provider) {
            (_, Some(p)) => Some(p),
            (true, None) => Some(Arc::new(HttpProxyPool::new(&config.proxy.pool_url)?)
                as Arc<dyn ProxyProvider>),
            (false, None) => None,
        };
        Ok(Self {
            client,
            timeout,
            use_proxy: config.crawler.use_proxy,
            use_render: config.crawler.use_render,
            render: config.render.clone(),
            proxy: config.proxy.clone(),
            provider,
            user_agent: config.crawler.user_agent.clone(),
        })
    }

    /// Fetches one page, in proxy-failover or direct mode per the task
    ///
    /// Direct mode makes a single attempt; only proxy mode retries. Any
    /// failure yields `None` ("no content") rather than an error.
    pub async fn fetch_page(&self, url: &str, referer: &str) -> Option<PageBody> {
        let headers = self.build_headers(referer);
        if self.use_proxy {
            let provider = self.provider.as_ref()?;
            fetch_with_proxy_failover(
                self,
                provider.as_ref(),
                url,
                &headers,
                self.proxy.max_proxies_tried,
                self.proxy.retry_times,
            )
            .await
        } else {
            match self.fetch_once(url, &headers, None).await {
                Ok(body) => Some(body),
                Err(e) => {
                    tracing::warn!("Download page content failed, url: {}, error: {}", url, e);
                    None
                }
            }
        }
    }

    /// One fetch attempt: GET, decode, one redirect-resolution pass
    pub async fn fetch_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        proxy: Option<&str>,
    ) -> Result<PageBody, FetchError> {
        let client = match proxy {
            Some(addr) => build_proxy_client(addr, self.timeout)?,
            None => self.client.clone(),
        };

        let request = if self.use_render {
            let image = if self.render.enable_image { "1" } else { "0" };
            let timeout = self.render.timeout_secs.to_string();
            client
                .get(&self.render.service_url)
                .query(&[("url", url), ("image", image), ("timeout", timeout.as_str())])
        } else {
            client.get(url)
        };

        let response = request.headers(headers.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?.to_vec();
        let text = decode_body(&bytes, content_type.as_deref());

        if let Some(substituted) =
            resolve_client_redirect(&client, url, &text, headers).await
        {
            return Ok(substituted);
        }

        Ok(PageBody { bytes, text })
    }

    fn build_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }
        let agent = match &self.user_agent {
            Some(fixed) => fixed.clone(),
            None => USER_AGENTS
                .choose(&mut rand::thread_rng())
                .unwrap_or(&USER_AGENTS[0])
                .to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&agent) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }
}

fn meta_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-zA-Z0-9_\-]+)"#).expect("charset regex")
    })
}

/// Decodes payload bytes to text with best-effort charset detection
///
/// The charset comes from the Content-Type header, then a `<meta charset>`
/// sniff of the payload head, then UTF-8. GB2312/GBK are widened to
/// GB18030 so stray symbols outside the narrower sets still decode.
/// Undecodable sequences become replacement characters rather than errors.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let label = content_type
        .and_then(charset_from_content_type)
        .or_else(|| sniff_meta_charset(bytes));
    let encoding = match label.as_deref() {
        Some(l) if l.eq_ignore_ascii_case("gb2312") || l.eq_ignore_ascii_case("gbk") => {
            Some(GB18030)
        }
        Some(l) => Encoding::for_label(l.as_bytes()),
        None => None,
    };
    let (text, _, _) = encoding.unwrap_or(UTF_8).decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|c| c.trim_matches('"').to_string())
        .next()
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head_len = bytes.len().min(1024);
    let head = String::from_utf8_lossy(&bytes[..head_len]);
    meta_charset_regex()
        .captures(&head)
        .map(|c| c[1].to_string())
}
