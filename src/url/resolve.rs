use crate::url::host_of;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Extensions that do not point at page content; links ending in one of
/// these are dropped before resolution.
const IGNORED_EXTENSIONS: &[&str] = &[
    // images
    "mng", "pct", "bmp", "gif", "jpg", "jpeg", "png", "pst", "psp", "tif", "tiff", "ai", "drw",
    "dxf", "eps", "ps", "svg",
    // audio
    "mp3", "wma", "ogg", "wav", "ra", "aac", "mid", "au", "aiff",
    // video
    "3gp", "asf", "asx", "avi", "mov", "mp4", "mpg", "qt", "rm", "swf", "wmv", "m4a",
    // office suites
    "xls", "xlsx", "ppt", "pptx", "pps", "doc", "docx", "odt", "ods", "odg", "odp",
    // other
    "css", "pdf", "exe", "bin", "rss", "zip", "rar", "apk",
];

/// Common page-file extensions; short dotted hrefs ending in one of these
/// are resolved against the full base URL.
const PAGE_EXTENSIONS: &[&str] = &[
    "html", "htm", "php", "asp", "aspx", "jsp", "shtml", "nsp", "cgi",
];

fn dotted_structure_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+\..+)+").expect("dotted structure regex"))
}

/// Returns false when the link points at a known non-page resource type
///
/// The literal `download/app` suffix is always kept, since such paths are
/// application landing pages rather than binary downloads.
pub fn is_page_link(link: &str) -> bool {
    if link.ends_with("download/app") {
        return true;
    }
    let extension = link.rsplit('.').next().unwrap_or(link);
    let keep = !IGNORED_EXTENSIONS.contains(&extension);
    if !keep {
        tracing::info!("Ignored url: {}, its type: {}", link, extension);
    }
    keep
}

/// Resolves an in-page href against the page it was found on
///
/// Sites routinely emit partial links that a browser would complete from
/// the address bar; this reproduces that completion:
/// - hrefs starting with `/` or `.` are trimmed of trailing dots and joined
///   against the **host root** of the base URL, not its full path;
/// - hrefs with no `x.y` dotted structure, or with at most two dot segments
///   ending in a known page extension, are joined against the full base URL;
/// - anything else is returned unchanged, treated as already absolute.
///
/// # Examples
///
/// ```
/// use sitegather::url::resolve_link;
///
/// assert_eq!(
///     resolve_link("http://www.test.com/a/b.html", "/about"),
///     "http://www.test.com/about"
/// );
/// assert_eq!(
///     resolve_link("http://www.test.com/a/", "page.html"),
///     "http://www.test.com/a/page.html"
/// );
/// ```
pub fn resolve_link(base_url: &str, href: &str) -> String {
    let resolved = fill_url(base_url, href);
    match resolved {
        Some(url) => {
            tracing::info!("The url is invalid, now changed from \"{}\" to \"{}\"", href, url);
            url
        }
        None => href.to_string(),
    }
}

fn fill_url(base_url: &str, href: &str) -> Option<String> {
    if href.starts_with('/') || href.starts_with('.') {
        let root = host_of(base_url, true, false)?;
        let trimmed = href.trim_end_matches('.');
        return join(&root, trimmed);
    }
    let segments: Vec<&str> = href.split('.').collect();
    let short_page = segments.len() <= 2
        && PAGE_EXTENSIONS.contains(segments.last().unwrap_or(&""));
    if !dotted_structure_regex().is_match(href) || short_page {
        return join(base_url, href);
    }
    None
}

fn join(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;
    Some(joined.to_string())
}
