//! Client-side redirect resolution
//!
//! Many sites land on a shell page that immediately forwards the browser
//! via a meta-refresh tag or a one-line script. The server never sends a
//! 3xx, so the HTTP client cannot follow it; instead the original decoded
//! text is inspected for the common forwarding idioms, in priority order:
//!
//! 1. a meta-refresh `url=` target in `<head>`;
//! 2. a `location="..."` assignment in an inline `<script>`;
//! 3. `top/window/self.location.href` / `window.navigate(...)` anywhere,
//!    when the body is short or absent;
//! 4. the same assignments inside a `window.onload` handler in `<head>`.
//!
//! The first strategy that yields a target different from the original URL
//! wins; one extra GET is issued for it. Every failure is silent: the
//! original fetch stands.

use crate::crawler::fetcher::{decode_body, PageBody};
use crate::url::host_of;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, HOST, REFERER};
use reqwest::Client;
use std::sync::OnceLock;
use url::Url;

/// Body length above which inline script patterns are not trusted
const BODY_LEN_MAX: usize = 100;

/// Script length above which a bare `location=` assignment is not trusted
const SCRIPT_LEN_MAX: usize = 1000;

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect(stringify!($name)))
        }
    };
}

cached_regex!(head_re, r"(?is)<head(.*?)</head>");
cached_regex!(body_re, r"(?is)<body(.*?)</body>");
cached_regex!(script_re, r"(?is)<script>(.*?)</script>");
cached_regex!(onload_re, r"(?is)window\.onload(.*?)\}");
cached_regex!(meta_url_re, r#"(?is)<meta[^>]*?url=(.*?)["']"#);
cached_regex!(location_assign_re, r#"(?is)location="(.*?)""#);
cached_regex!(top_href_re, r#"(?is)top\.location\.href="(.*?)""#);
cached_regex!(window_href_re, r#"(?is)window\.location\.href="(.*?)""#);
cached_regex!(navigate_re, r#"(?is)window\.navigate\("(.*?)"\)"#);
cached_regex!(self_href_re, r#"(?is)self\.location\.href="(.*?)""#);

/// Attempts to resolve a client-side redirect in the fetched page
///
/// Returns the substituted response body when a strategy finds a target
/// that differs from the original URL and the extra GET succeeds; `None`
/// leaves the original fetch standing.
pub async fn resolve_client_redirect(
    client: &Client,
    url: &str,
    page_text: &str,
    headers: &HeaderMap,
) -> Option<PageBody> {
    let candidates = [
        meta_redirect_target(page_text),
        script_location_target(page_text),
        body_script_target(page_text),
        onload_target(page_text),
    ];
    for candidate in candidates.into_iter().flatten() {
        let target = match Url::parse(url).ok()?.join(candidate.trim()) {
            Ok(t) => t.to_string(),
            Err(_) => continue,
        };
        if target == url {
            continue;
        }
        tracing::info!("Suspect client redirect url found: {}", target);
        if let Some(body) = follow(client, url, &target, headers).await {
            return Some(body);
        }
    }
    None
}

/// Strategy 1: meta-refresh `url=` inside `<head>`
fn meta_redirect_target(page_text: &str) -> Option<String> {
    let head = head_re().captures(page_text)?.get(1)?.as_str().to_string();
    let target = meta_url_re().captures(&head)?.get(1)?.as_str().trim().to_string();
    Some(target)
}

/// Strategy 2: bare `location=` assignment in an inline `<script>`
fn script_location_target(page_text: &str) -> Option<String> {
    let (scan, gated) = match script_re().captures(page_text) {
        Some(captures) => {
            let script = captures
                .get(1)?
                .as_str()
                .replace("\r\n", "")
                .trim()
                .to_string();
            let short_enough = script.chars().count() <= SCRIPT_LEN_MAX;
            (script, short_enough)
        }
        None => (page_text.to_string(), true),
    };
    if !gated {
        return None;
    }
    let target = location_assign_re()
        .captures(&scan)?
        .get(1)?
        .as_str()
        .trim()
        .to_string();
    if target.is_empty() {
        return None;
    }
    Some(target)
}

/// Strategy 3: `*.location.href` / `window.navigate` anywhere, gated on a
/// short or absent body
fn body_script_target(page_text: &str) -> Option<String> {
    let (scan, gated) = match body_re().captures(page_text) {
        Some(captures) => {
            let body = captures
                .get(1)?
                .as_str()
                .replace("\r\n", "")
                .trim()
                .to_string();
            let short_enough = body.chars().count() <= BODY_LEN_MAX;
            (body, short_enough)
        }
        None => (page_text.to_string(), true),
    };
    if !gated {
        return None;
    }
    first_href_assignment(&scan)
}

/// Strategy 4: the same assignments inside a `window.onload` block
fn onload_target(page_text: &str) -> Option<String> {
    let head = head_re().captures(page_text)?.get(1)?.as_str().to_string();
    let onload = onload_re().captures(&head)?.get(1)?.as_str().to_string();
    first_href_assignment(&onload)
}

fn first_href_assignment(scan: &str) -> Option<String> {
    for regex in [top_href_re(), window_href_re(), navigate_re(), self_href_re()] {
        if let Some(captures) = regex.captures(scan) {
            let target = captures.get(1)?.as_str().trim().to_string();
            if !target.is_empty() {
                return Some(target);
            }
        }
    }
    None
}

/// Issues the extra GET for a detected redirect target
///
/// When the target's host differs from the original's, the `Host` header
/// follows the target and `Referer` is set to the original URL.
async fn follow(client: &Client, url: &str, target: &str, headers: &HeaderMap) -> Option<PageBody> {
    let mut headers = headers.clone();
    let original_host = host_of(url, false, false);
    let target_host = host_of(target, false, false);
    if target_host != original_host {
        if let Some(host) = &target_host {
            if let Ok(value) = HeaderValue::from_str(host) {
                headers.insert(HOST, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(url) {
            headers.insert(REFERER, value);
        }
    }

    let response = match client.get(target).headers(headers).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::info!("Suspect redirect url access failed: {}; errmsg: {}", target, e);
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::info!(
            "Suspect redirect url returned status {}: {}",
            response.status(),
            target
        );
        return None;
    }
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await.ok()?.to_vec();
    let text = decode_body(&bytes, content_type.as_deref());
    Some(PageBody { bytes, text })
}
