use url::Url;

/// Resolves an embedded reference (`iframe src`, control `href`) to an absolute URL
///
/// Returns None if the reference cannot be followed:
/// - empty or fragment-only references
/// - javascript:, mailto:, tel: and data: schemes
/// - references that do not resolve to HTTP(S)
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
