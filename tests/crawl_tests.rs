//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! full crawl cycle end-to-end: depth bounds, level filtering, visited-set
//! dedup, useless-page filtering, client-redirect substitution and
//! per-frontier sink delivery.

use sitegather::classifier::UselessPageClassifier;
use sitegather::config::Config;
use sitegather::crawler::{CrawlCounters, CrawlEngine};
use sitegather::output::{FrontierBatch, NoopFilter, OutputResult, PageContent, PageSink};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sink that records every delivered batch for inspection
#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<FrontierBatch>>,
}

impl RecordingSink {
    fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    fn collected_urls(&self) -> HashSet<String> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|b| b.results.keys().cloned())
            .collect()
    }

    fn content_of(&self, url: &str) -> Option<PageContent> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .find_map(|b| b.results.get(url).cloned())
    }
}

impl PageSink for RecordingSink {
    fn handle(&self, batch: &FrontierBatch) -> OutputResult<()> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

fn test_config(max_depth: u32, level: u8) -> Config {
    toml::from_str(&format!(
        r#"
[crawler]
max-depth = {}
level = {}
concurrent-limit = 5
fetch-timeout-secs = 5

[output]
"#,
        max_depth, level
    ))
    .unwrap()
}

fn build_engine(site: &str, config: &Config, sink: Arc<RecordingSink>) -> CrawlEngine {
    CrawlEngine::new(
        site,
        config,
        Arc::new(UselessPageClassifier::with_defaults().unwrap()),
        sink,
        Arc::new(NoopFilter),
        None,
    )
    .expect("failed to create engine")
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

async fn run_crawl(site: &str, config: &Config) -> (Arc<RecordingSink>, CrawlCounters) {
    let sink = Arc::new(RecordingSink::default());
    let engine = build_engine(site, config, sink.clone());
    let counters = engine.run().await;
    (sink, counters)
}

#[tokio::test]
async fn test_depth_bounded_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>This is the landing page with plenty of words in it.
            <a href="{}/page1">Page 1</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/page1",
        &format!(
            r#"<html><body>Some substantial article text for page one.
            <a href="{}/page2">Page 2</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(&server, "/page2", "<html><body>never reached</body></html>").await;

    let config = test_config(1, 0);
    let (sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    // The final frontier is fetched but its links are not expanded
    let urls = sink.collected_urls();
    assert!(urls.contains(&format!("{}/", base)));
    assert!(urls.contains(&format!("{}/page1", base)));
    assert_eq!(urls.len(), 2);

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert!(!requested.contains(&"/page2".to_string()));

    assert_eq!(counters.attempted, 2);
    assert_eq!(counters.succeeded, 2);
    assert_eq!(counters.dropped, 0);
}

#[tokio::test]
async fn test_level0_drops_cross_host_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>Welcome to the landing page, have a look around.
            <a href="{}/local">Local</a>
            <a href="http://cross-host.invalid/away">Away</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/local",
        "<html><body>A perfectly ordinary local page with content.</body></html>",
    )
    .await;

    let config = test_config(1, 0);
    let (sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    let urls = sink.collected_urls();
    assert!(urls.contains(&format!("{}/", base)));
    assert!(urls.contains(&format!("{}/local", base)));
    assert_eq!(urls.len(), 2);

    // The cross-host page was never admitted, so never fetched
    assert_eq!(counters.attempted, 2);
}

#[tokio::test]
async fn test_visited_set_dedup() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>Index page full of interesting links to follow.
            <a href="{}/a">A</a>
            <a href="{}/b">B</a>
            </body></html>"#,
            base, base
        ),
    )
    .await;
    // Both /a and /b link to /shared, and /a links back to the root
    mount_page(
        &server,
        "/a",
        &format!(
            r#"<html><body>Page A has text and shares a link with page B.
            <a href="{}/shared">Shared</a>
            <a href="{}/">Home</a>
            </body></html>"#,
            base, base
        ),
    )
    .await;
    mount_page(
        &server,
        "/b",
        &format!(
            r#"<html><body>Page B also has text and the same shared link.
            <a href="{}/shared">Shared</a>
            </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/shared",
        "<html><body>The shared page should only be downloaded once.</body></html>",
    )
    .await;

    let config = test_config(3, 0);
    let (_sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    let root_hits = requested.iter().filter(|p| p.as_str() == "/").count();
    let shared_hits = requested.iter().filter(|p| p.as_str() == "/shared").count();
    assert_eq!(root_hits, 1, "root fetched more than once");
    assert_eq!(shared_hits, 1, "shared page fetched more than once");

    // Root, /a, /b, /shared
    assert_eq!(counters.attempted, 4);
}

#[tokio::test]
async fn test_useless_page_dropped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>Healthy page linking to a broken one, with some
            extra words so the classifier leaves it alone.
            <a href="{}/dead">Dead</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(&server, "/dead", "<html><body>404 Not Found</body></html>").await;

    let config = test_config(1, 0);
    let (sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    let urls = sink.collected_urls();
    assert!(urls.contains(&format!("{}/", base)));
    assert!(!urls.contains(&format!("{}/dead", base)));

    assert_eq!(counters.attempted, 2);
    assert_eq!(counters.succeeded, 2);
    assert_eq!(counters.dropped, 1);
}

#[tokio::test]
async fn test_fetch_failure_counts_as_dropped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>A page whose only link is broken on the server.
            <a href="{}/error">Error</a></body></html>"#,
            base
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(1, 0);
    let (sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    assert!(!sink.collected_urls().contains(&format!("{}/error", base)));
    assert_eq!(counters.attempted, 2);
    assert_eq!(counters.succeeded, 1);
    assert_eq!(counters.dropped, 1);
}

#[tokio::test]
async fn test_meta_redirect_substitution() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><head><meta http-equiv="refresh" content="0; url={}/real"></head>
            <body></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/real",
        "<html><body>REAL landing content, long enough to be kept around.</body></html>",
    )
    .await;

    let config = test_config(0, 0);
    let (sink, counters) = run_crawl(&format!("{}/", base), &config).await;

    // The shell page's result carries the redirect target's content
    let content = sink.content_of(&format!("{}/", base)).expect("root result");
    match content {
        PageContent::Text(text) => assert!(text.contains("REAL landing content")),
        PageContent::Bytes(_) => panic!("expected decoded text"),
    }
    assert_eq!(counters.attempted, 1);
}

#[tokio::test]
async fn test_sink_called_once_per_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>First frontier page, linking one level down.
            <a href="{}/next">Next</a></body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/next",
        "<html><body>Second frontier page with no further links.</body></html>",
    )
    .await;

    let config = test_config(2, 0);
    let (sink, _counters) = run_crawl(&format!("{}/", base), &config).await;

    // Two frontiers produced results; each was delivered exactly once
    assert_eq!(sink.batch_count(), 2);
    for batch in sink.batches.lock().unwrap().iter() {
        assert_eq!(batch.results.len(), 1);
    }
}

#[tokio::test]
async fn test_raw_bytes_mode() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        "<html><body>Raw mode stores the undecoded payload bytes.</body></html>",
    )
    .await;

    let mut config = test_config(0, 0);
    config.crawler.decode = false;

    let (sink, _counters) = run_crawl(&format!("{}/", base), &config).await;

    let content = sink.content_of(&format!("{}/", base)).expect("root result");
    assert!(matches!(content, PageContent::Bytes(_)));
}

#[tokio::test]
async fn test_crawl_always_completes_on_unreachable_seed() {
    // Nothing is listening on this port; the crawl must still complete
    // and report counts rather than erroring out
    let config = test_config(2, 0);
    let (sink, counters) = run_crawl("http://127.0.0.1:1/", &config).await;

    assert_eq!(sink.batch_count(), 0);
    assert_eq!(counters.attempted, 1);
    assert_eq!(counters.succeeded, 0);
    assert_eq!(counters.dropped, 1);
}
