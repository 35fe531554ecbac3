//! URL canonicalization and domain classification
//!
//! This module contains the pure URL helpers the crawl engine is built on:
//! - Soft-failing scheme/host/port/path parsing with scheme defaults
//! - Canonical form used as the visited-set dedup key
//! - Registrable-domain extraction with compound public suffixes
//! - Relative link resolution against the host root or the base URL
//! - A supplementary regex scan for URL-shaped substrings in page text

mod canonical;
mod domain;
mod matcher;
mod resolve;

pub use canonical::{canonicalize, host_of, parse_url, UrlParts};
pub use domain::{is_ip, registrable_domain};
pub use matcher::match_urls;
pub use resolve::{is_page_link, resolve_link};
