use serde::Deserialize;

/// Scope restriction for link admission during a crawl
///
/// Level 0 keeps links on the same host, level 1 keeps links sharing the
/// current page's registrable domain, level 2 keeps everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum TraversalLevel {
    SameHost,
    SameRegistrableDomain,
    Unrestricted,
}

impl TryFrom<u8> for TraversalLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TraversalLevel::SameHost),
            1 => Ok(TraversalLevel::SameRegistrableDomain),
            2 => Ok(TraversalLevel::Unrestricted),
            other => Err(format!(
                "traversal level must be in (0, 1, 2), but now is: {}",
                other
            )),
        }
    }
}

impl Default for TraversalLevel {
    fn default() -> Self {
        TraversalLevel::SameHost
    }
}

/// Main configuration structure for sitegather
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    pub output: OutputConfig,
    /// Sites to crawl when none are given on the command line
    #[serde(default)]
    pub sites: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum crawl depth below the seed page
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Traversal level: 0 same host, 1 same registrable domain, 2 all
    #[serde(default)]
    pub level: TraversalLevel,

    /// Maximum number of concurrent in-flight fetches per task
    #[serde(rename = "concurrent-limit", default = "default_concurrent_limit")]
    pub concurrent_limit: u32,

    /// Per-fetch timeout in seconds
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Optional pause after each fetched page, in milliseconds
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,

    /// Store decoded text (true) or raw bytes (false)
    #[serde(default = "default_decode")]
    pub decode: bool,

    /// Fixed user-agent; a random one is rotated in when absent
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    /// Route fetches through the proxy pool
    #[serde(rename = "use-proxy", default)]
    pub use_proxy: bool,

    /// Delegate fetches to the render service
    #[serde(rename = "use-render", default)]
    pub use_render: bool,
}

/// Proxy-pool collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Endpoint returning the full ordered proxy list as a JSON array
    #[serde(rename = "pool-url", default = "default_pool_url")]
    pub pool_url: String,

    /// Upper bound on distinct proxies tried per fetch
    #[serde(rename = "max-proxies-tried", default = "default_max_proxies_tried")]
    pub max_proxies_tried: usize,

    /// Attempts per proxy before moving to the next one
    #[serde(rename = "retry-times", default = "default_retry_times")]
    pub retry_times: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            pool_url: default_pool_url(),
            max_proxies_tried: default_max_proxies_tried(),
            retry_times: default_retry_times(),
        }
    }
}

/// Render-service collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Render endpoint; the target URL is passed as a query parameter
    #[serde(rename = "service-url", default = "default_render_url")]
    pub service_url: String,

    /// Whether the service should fetch images while rendering
    #[serde(rename = "enable-image", default)]
    pub enable_image: bool,

    /// Render timeout passed to the service, in seconds
    #[serde(rename = "timeout-secs", default = "default_render_timeout")]
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            service_url: default_render_url(),
            enable_image: false,
            timeout_secs: default_render_timeout(),
        }
    }
}

/// Useless-page classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Phrase list override; the compiled-in list is used when empty
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Optional persisted automaton location, to skip rebuild across runs
    #[serde(rename = "model-path", default)]
    pub model_path: Option<String>,

    /// Pages at or above this decoded length are never flagged useless
    #[serde(rename = "max-useless-page-len", default = "default_useless_len")]
    pub max_useless_page_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            model_path: None,
            max_useless_page_len: default_useless_len(),
        }
    }
}

/// Output sink configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Registered sink name
    #[serde(default = "default_sink")]
    pub sink: String,

    /// Base directory for the file sink; results land under it by host
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Use base64-encoded URLs as file names
    #[serde(rename = "b64-names", default)]
    pub b64_names: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
            dir: default_output_dir(),
            b64_names: false,
        }
    }
}

fn default_max_depth() -> u32 {
    2
}

fn default_concurrent_limit() -> u32 {
    32
}

fn default_fetch_timeout() -> u64 {
    300
}

fn default_decode() -> bool {
    true
}

fn default_pool_url() -> String {
    "http://localhost:5010/get_all".to_string()
}

fn default_max_proxies_tried() -> usize {
    10
}

fn default_retry_times() -> usize {
    3
}

fn default_render_url() -> String {
    "http://localhost:8050/render.html".to_string()
}

fn default_render_timeout() -> u64 {
    30
}

fn default_useless_len() -> usize {
    crate::classifier::DEFAULT_USELESS_PAGE_MAX_LEN
}

fn default_sink() -> String {
    "file".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_try_from() {
        assert_eq!(TraversalLevel::try_from(0), Ok(TraversalLevel::SameHost));
        assert_eq!(
            TraversalLevel::try_from(1),
            Ok(TraversalLevel::SameRegistrableDomain)
        );
        assert_eq!(TraversalLevel::try_from(2), Ok(TraversalLevel::Unrestricted));
        assert!(TraversalLevel::try_from(3).is_err());
    }

    #[test]
    fn test_defaults() {
        let proxy = ProxyConfig::default();
        assert_eq!(proxy.max_proxies_tried, 10);
        assert_eq!(proxy.retry_times, 3);

        let output = OutputConfig::default();
        assert_eq!(output.sink, "file");
        assert!(!output.b64_names);
    }
}
