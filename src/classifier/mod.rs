//! Useless-page classification
//!
//! A "useless" page is a successfully fetched page whose content matches
//! known error/placeholder phrasing and is short enough to be boilerplate
//! rather than substance. Matching runs on an Aho-Corasick automaton built
//! once per task and shared read-only across concurrent fetches.

mod automaton;

pub use automaton::AcAutomaton;

use crate::GatherError;
use std::collections::HashSet;
use std::path::Path;

/// Decoded pages shorter than this with a matching phrase are discarded.
/// A long page containing an incidental error string is kept.
pub const DEFAULT_USELESS_PAGE_MAX_LEN: usize = 1000;

/// Phrases that mark maintenance, error and placeholder pages
pub const USELESS_PAGE_FEATURES: &[&str] = &[
    "404 Not Found",
    "403 Forbidden",
    "502 Bad Gateway",
    "503 Service Unavailable",
    "Service Temporarily Unavailable",
    "Access Denied",
    "Under Maintenance",
    "Welcome to nginx",
    "Apache2 Ubuntu Default Page",
    "IIS Windows Server",
    "Database Error",
    "页面不存在",
    "访问的页面不存在",
    "网站维护中",
    "系统维护中",
    "正在升级维护",
    "访问出错",
    "无法访问此网站",
];

/// Flags pages whose text matches known useless-page phrasing
pub struct UselessPageClassifier {
    automaton: AcAutomaton,
    max_len: usize,
}

impl UselessPageClassifier {
    /// Builds a classifier from the given phrase list
    ///
    /// An empty pattern list is a construction failure: a crawl running
    /// without classification would silently pollute its results, so task
    /// startup must abort instead.
    pub fn new<S: AsRef<str>>(patterns: &[S], max_len: usize) -> Result<Self, GatherError> {
        if patterns.is_empty() {
            return Err(GatherError::Classifier(
                "pattern list is empty".to_string(),
            ));
        }
        Ok(Self {
            automaton: AcAutomaton::build(patterns),
            max_len,
        })
    }

    /// Builds from the compiled-in phrase list
    pub fn with_defaults() -> Result<Self, GatherError> {
        Self::new(USELESS_PAGE_FEATURES, DEFAULT_USELESS_PAGE_MAX_LEN)
    }

    /// Builds from the phrase list, reusing a persisted automaton at
    /// `model_path` when one is loadable
    pub fn with_model_path<S: AsRef<str>>(
        patterns: &[S],
        max_len: usize,
        model_path: &Path,
    ) -> Result<Self, GatherError> {
        if patterns.is_empty() {
            return Err(GatherError::Classifier(
                "pattern list is empty".to_string(),
            ));
        }
        Ok(Self {
            automaton: AcAutomaton::load_or_build(patterns, model_path),
            max_len,
        })
    }

    /// Returns the set of phrases occurring in `text`
    pub fn search(&self, text: &str) -> HashSet<String> {
        self.automaton.search(text)
    }

    /// A page is useless when at least one phrase matches AND the decoded
    /// text is shorter than the threshold. Both conditions are required.
    pub fn is_useless(&self, text: &str) -> bool {
        text.chars().count() < self.max_len && !self.automaton.search(text).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_error_page_is_useless() {
        let classifier = UselessPageClassifier::with_defaults().unwrap();
        assert!(classifier.is_useless("<html><body>404 Not Found</body></html>"));
    }

    #[test]
    fn test_long_page_with_error_string_is_kept() {
        let classifier = UselessPageClassifier::with_defaults().unwrap();
        let mut page = String::from("404 Not Found is what our server returns when ");
        page.push_str(&"real article content. ".repeat(100));
        assert!(!classifier.is_useless(&page));
    }

    #[test]
    fn test_short_normal_page_is_kept() {
        let classifier = UselessPageClassifier::with_defaults().unwrap();
        assert!(!classifier.is_useless("<html><body>Hello</body></html>"));
    }

    #[test]
    fn test_chinese_maintenance_page() {
        let classifier = UselessPageClassifier::with_defaults().unwrap();
        assert!(classifier.is_useless("<html><body>网站维护中</body></html>"));
    }

    #[test]
    fn test_empty_patterns_fail_construction() {
        let patterns: &[&str] = &[];
        assert!(UselessPageClassifier::new(patterns, 1000).is_err());
    }

    #[test]
    fn test_custom_threshold() {
        let classifier = UselessPageClassifier::new(&["gone"], 10).unwrap();
        assert!(classifier.is_useless("gone"));
        assert!(!classifier.is_useless("gone but this text is past the threshold"));
    }
}
