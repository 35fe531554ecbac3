use regex::Regex;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[\w:#@%/;$()~_?+\-=\\.&]+"#).expect("url regex")
    })
}

/// Scans decoded page text for URL-shaped substrings
///
/// Markup parsing misses links that only exist inside scripts or plain
/// text; this supplementary pass catches them. Bare `http://`/`https://`
/// prefixes with nothing after them are not URLs and are skipped.
pub fn match_urls(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|m| m != "http://" && m != "https://")
        .collect()
}
