//! URL canonicalisation used for deduplication.

use url::Url;

/// Canonical form of a listing URL for equality checks.
///
/// Scheme and host are lowercased, default ports dropped and trailing slashes
/// removed from the path. Query and fragment are left as they are. Input that
/// does not parse as an absolute URL is only trimmed.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(raw) {
        Ok(url) if url.has_host() => url,
        _ => return raw.trim_end_matches('/').to_string(),
    };

    // `Url` already lowercases scheme and host and hides default ports.
    let mut out = format!("{}://", parsed.scheme());
    if !parsed.username().is_empty() {
        out.push_str(parsed.username());
        if let Some(password) = parsed.password() {
            out.push(':');
            out.push_str(password);
        }
        out.push('@');
    }
    if let Some(host) = parsed.host_str() {
        out.push_str(&host.to_lowercase());
    }
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(parsed.path().trim_end_matches('/'));
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Resolve a possibly relative `href` against `base`.
///
/// Returns an empty string when `href` is empty or cannot be resolved.
pub fn absolutize(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if let Ok(url) = Url::parse(href) {
        return url.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_default()
}
