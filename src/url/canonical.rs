/// Parsed components of a URL
///
/// Produced by [`parse_url`]. The path component keeps everything after the
/// authority, query string included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub port: String,
    pub path: String,
}

/// Splits a URL into scheme, host, port and path, defaulting what is absent
///
/// The scheme defaults to `http` when the URL carries none, and the port
/// defaults to `80`/`443` by scheme. Parsing fails softly: malformed input
/// (no recognizable host) yields `None` rather than an error, and callers
/// treat such URLs as unusable.
///
/// # Examples
///
/// ```
/// use sitegather::url::parse_url;
///
/// let parts = parse_url("www.example.com/page").unwrap();
/// assert_eq!(parts.scheme, "http");
/// assert_eq!(parts.host, "www.example.com");
/// assert_eq!(parts.port, "80");
/// assert_eq!(parts.path, "/page");
/// ```
pub fn parse_url(url: &str) -> Option<UrlParts> {
    if url.is_empty() {
        return None;
    }
    let (scheme, rest) = match url.find("://") {
        Some(idx) => (&url[..idx], &url[idx + 3..]),
        None => ("http", url),
    };
    let (authority, path) = match rest.find(|c| c == '/' || c == '?') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if authority.is_empty() {
        tracing::warn!("Input url is illegal: {}", url);
        return None;
    }
    let (host, port) = split_port(authority);
    let port = match port {
        Some(p) => p.to_string(),
        None => {
            if scheme == "https" {
                "443".to_string()
            } else {
                "80".to_string()
            }
        }
    };
    Some(UrlParts {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

/// Produces the canonical form of a URL, used as the visited-set dedup key
///
/// The canonical form is `scheme://host:port/` for the site root, or
/// `scheme://host:port/{path}/` with the path trimmed of surrounding
/// slashes. Two URLs differing only in default port or trailing slash
/// canonicalize identically, and the operation is idempotent.
///
/// Returns `None` for malformed input.
///
/// # Examples
///
/// ```
/// use sitegather::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("http://example.com/page/").as_deref(),
///     Some("http://example.com:80/page/")
/// );
/// assert_eq!(
///     canonicalize("http://example.com:80/page"),
///     canonicalize("http://example.com/page/")
/// );
/// ```
pub fn canonicalize(url: &str) -> Option<String> {
    let parts = parse_url(url)?;
    let rest = parts.path.trim_matches('/');
    if rest.is_empty() {
        Some(format!("{}://{}:{}/", parts.scheme, parts.host, parts.port))
    } else {
        Some(format!(
            "{}://{}:{}/{}/",
            parts.scheme, parts.host, parts.port, rest
        ))
    }
}

/// Extracts the host of a URL, optionally qualified with scheme and port
///
/// For scheme-qualified input the host is the authority section. For bare
/// input without a scheme the whole remainder is taken as the host, which
/// lets level filters compare bare domains the same way on both sides.
/// `with_scheme` yields `None` when the URL carries no scheme of its own,
/// and `with_port` yields `None` when no explicit port is present.
pub fn host_of(url: &str, with_scheme: bool, with_port: bool) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let (scheme, rest) = match url.find("://") {
        Some(idx) => (Some(&url[..idx]), &url[idx + 3..]),
        None => (None, url),
    };
    let authority = if scheme.is_some() {
        match rest.find(|c| c == '/' || c == '?') {
            Some(idx) => &rest[..idx],
            None => rest,
        }
    } else {
        rest
    };
    if authority.is_empty() {
        return None;
    }
    let (host, port) = split_port(authority);
    let mut out = host.to_string();
    if with_scheme {
        out = format!("{}://{}", scheme?, out);
    }
    if with_port {
        out = format!("{}:{}", out, port?);
    }
    Some(out)
}

/// Splits a trailing `:digits` port off an authority section
fn split_port(authority: &str) -> (&str, Option<&str>) {
    if let Some(idx) = authority.rfind(':') {
        let candidate = &authority[idx + 1..];
        if candidate.chars().all(|c| c.is_ascii_digit()) {
            return (&authority[..idx], Some(candidate));
        }
    }
    (authority, None)
}
