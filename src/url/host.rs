use url::Url;

/// Extracts the lowercase host from a URL
///
/// URLs without a host (`mailto:`, `data:`) yield None.
///
/// ```
/// use url::Url;
/// use shelf_sweep::url::extract_host;
///
/// let url = Url::parse("https://M.Flipkart.COM/p/x").unwrap();
/// assert_eq!(extract_host(&url), Some("m.flipkart.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses `raw` and returns its lowercase host, if any
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw).ok().as_ref().and_then(extract_host)
}
