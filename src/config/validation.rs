use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, RenderConfig};
use crate::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

fn site_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".+\..+").expect("site regex"))
}

/// Validates the entire configuration
///
/// Validation is fail-fast: a crawl must not start with undefined
/// filtering semantics or an unusable fetch setup.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_proxy_config(&config.proxy, config.crawler.use_proxy)?;
    validate_render_config(&config.render, config.crawler.use_render)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrent_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrent_limit must be >= 1, got {}",
            config.concurrent_limit
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if let Some(agent) = &config.user_agent {
        if agent.is_empty() {
            return Err(ConfigError::Validation(
                "user-agent override cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates proxy-pool configuration when proxy mode is requested
fn validate_proxy_config(config: &ProxyConfig, use_proxy: bool) -> Result<(), ConfigError> {
    if !use_proxy {
        return Ok(());
    }

    url::Url::parse(&config.pool_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy pool-url: {}", e)))?;

    if config.max_proxies_tried < 1 {
        return Err(ConfigError::Validation(format!(
            "max_proxies_tried must be >= 1, got {}",
            config.max_proxies_tried
        )));
    }

    if config.retry_times < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_times must be >= 1, got {}",
            config.retry_times
        )));
    }

    Ok(())
}

/// Validates render-service configuration when render mode is requested
fn validate_render_config(config: &RenderConfig, use_render: bool) -> Result<(), ConfigError> {
    if !use_render {
        return Ok(());
    }

    url::Url::parse(&config.service_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid render service-url: {}", e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.sink.is_empty() {
        return Err(ConfigError::Validation("sink cannot be empty".to_string()));
    }

    if config.dir.is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates configured site entries
///
/// A crawlable site must at least have dotted `x.y` structure; anything
/// else would canonicalize into garbage and waste a worker.
fn validate_sites(sites: &[String]) -> Result<(), ConfigError> {
    for site in sites {
        if !site_regex().is_match(site) {
            return Err(ConfigError::Validation(format!(
                "Invalid site: {}",
                site
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ClassifierConfig, TraversalLevel};

    fn base_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                max_depth: 2,
                level: TraversalLevel::SameHost,
                concurrent_limit: 32,
                fetch_timeout_secs: 30,
                request_delay_ms: 0,
                decode: true,
                user_agent: None,
                use_proxy: false,
                use_render: false,
            },
            proxy: ProxyConfig::default(),
            render: RenderConfig::default(),
            classifier: ClassifierConfig::default(),
            output: OutputConfig::default(),
            sites: vec!["www.test.com".to_string()],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = base_config();
        config.crawler.concurrent_limit = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = base_config();
        config.crawler.fetch_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let mut config = base_config();
        config.crawler.user_agent = Some(String::new());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_proxy_url_only_matters_in_proxy_mode() {
        let mut config = base_config();
        config.proxy.pool_url = "not a url".to_string();
        assert!(validate(&config).is_ok());

        config.crawler.use_proxy = true;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_proxy_bound_rejected() {
        let mut config = base_config();
        config.crawler.use_proxy = true;
        config.proxy.max_proxies_tried = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_render_url_only_matters_in_render_mode() {
        let mut config = base_config();
        config.render.service_url = "nope".to_string();
        assert!(validate(&config).is_ok());

        config.crawler.use_render = true;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_site_rejected() {
        let mut config = base_config();
        config.sites = vec!["nodots".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_sink_rejected() {
        let mut config = base_config();
        config.output.sink = String::new();
        assert!(validate(&config).is_err());
    }
}
