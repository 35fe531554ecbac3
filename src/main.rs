//! Sitegather main entry point
//!
//! Command-line interface for the sitegather page collector.

use clap::Parser;
use sitegather::config::{load_config_with_hash, TraversalLevel};
use sitegather::crawler::{build_classifier, CrawlCounters, CrawlEngine};
use sitegather::output::{NoopFilter, SinkRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Sitegather: a depth-bounded site page collector
///
/// Recursively downloads the pages of each target site up to a bounded
/// depth, skips maintenance/error pages, and stores what remains through
/// the configured output sink.
#[derive(Parser, Debug)]
#[command(name = "sitegather")]
#[command(version = "1.0.0")]
#[command(about = "A depth-bounded site page collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// One or more sites to crawl, separated by commas
    /// (e.g. "www.a.com" or "www.a.com,www.b.com")
    #[arg(short, long)]
    url: Option<String>,

    /// Path of a file listing the sites to crawl, one per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Limit the max depth of pages while crawling
    #[arg(short = 'd', long)]
    depth: Option<u32>,

    /// Crawler filtering level: 0 same host, 1 same registrable domain,
    /// 2 everything
    #[arg(short = 'L', long)]
    level: Option<u8>,

    /// Limit the number of concurrent fetches per site
    #[arg(short, long)]
    concurrent: Option<u32>,

    /// Fixed access user-agent
    #[arg(short = 'U', long = "user-agent")]
    user_agent: Option<String>,

    /// Render pages through the configured render service
    #[arg(short = 'S', long)]
    render: bool,

    /// Access targets through the configured proxy pool
    #[arg(short = 'P', long)]
    proxy: bool,

    /// Use base64-encoded urls as the file names
    #[arg(short = 'B', long)]
    b64: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Command-line overrides
    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(level) = cli.level {
        config.crawler.level = TraversalLevel::try_from(level)
            .map_err(|_| sitegather::GatherError::InvalidLevel(level))?;
    }
    if let Some(concurrent) = cli.concurrent {
        config.crawler.concurrent_limit = concurrent;
    }
    if cli.user_agent.is_some() {
        config.crawler.user_agent = cli.user_agent.clone();
    }
    if cli.render {
        config.crawler.use_render = true;
    }
    if cli.proxy {
        config.crawler.use_proxy = true;
    }
    if cli.b64 {
        config.output.b64_names = true;
    }

    let sites = collect_sites(&cli, &config.sites)?;
    tracing::info!("Start crawler, the site list: {:?}", sites);

    // Startup-time construction: a broken classifier or sink must abort
    // before any worker runs
    let classifier = Arc::new(build_classifier(&config)?);
    let registry = SinkRegistry::with_defaults();
    let sink = registry.build(&config.output)?;

    let start_time = std::time::Instant::now();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, CrawlCounters)>(sites.len());
    let mut handles = Vec::new();

    for site in sites {
        let site_url = ensure_scheme(&site);
        let engine = CrawlEngine::new(
            &site_url,
            &config,
            classifier.clone(),
            sink.clone(),
            Arc::new(NoopFilter),
            None,
        )?;
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let counters = engine.run().await;
            let _ = tx.send((site_url, counters)).await;
        }));
    }
    drop(tx);

    for handle in handles {
        let _ = handle.await;
    }

    // Drain per-worker counters after all workers have joined
    let mut totals = CrawlCounters::default();
    while let Some((site, counters)) = rx.recv().await {
        tracing::info!(
            "Site {} done: attempted {}, succeeded {}, dropped {}",
            site,
            counters.attempted,
            counters.succeeded,
            counters.dropped
        );
        totals.attempted += counters.attempted;
        totals.succeeded += counters.succeeded;
        totals.dropped += counters.dropped;
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    let speed = if elapsed > 0.0 {
        totals.attempted as f64 / elapsed
    } else {
        0.0
    };
    tracing::info!(
        "Crawl finished, total expense time: {:.1}s, total download: {}, success: {}, speed: {:.2}/s",
        elapsed,
        totals.attempted,
        totals.succeeded,
        speed
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitegather=info,warn"),
            1 => EnvFilter::new("sitegather=debug,info"),
            2 => EnvFilter::new("sitegather=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Gathers the site list from --url, --input, or the config, in that order
fn collect_sites(cli: &Cli, config_sites: &[String]) -> anyhow::Result<Vec<String>> {
    let mut sites = Vec::new();
    if let Some(url_list) = &cli.url {
        for site in url_list.split(',') {
            push_valid_site(&mut sites, site.replace(' ', ""));
        }
    } else if let Some(input) = &cli.input {
        let content = std::fs::read_to_string(input)?;
        for line in content.lines() {
            push_valid_site(&mut sites, line.trim().to_string());
        }
    } else {
        for site in config_sites {
            push_valid_site(&mut sites, site.clone());
        }
    }
    if sites.is_empty() {
        anyhow::bail!("no sites to crawl; pass --url, --input, or configure [sites]");
    }
    Ok(sites)
}

/// Keeps a site entry only when it has crawlable `x.y` structure
fn push_valid_site(sites: &mut Vec<String>, site: String) {
    if site.is_empty() {
        return;
    }
    let has_structure = site.contains('.') && !site.starts_with('.') && !site.ends_with('.');
    if has_structure {
        sites.push(site);
    } else {
        tracing::info!("Invalid site: {}", site);
    }
}

/// Bare domains get an http scheme so the seed fetch has a complete URL
fn ensure_scheme(site: &str) -> String {
    if site.contains("://") {
        site.to_string()
    } else {
        format!("http://{}", site)
    }
}
