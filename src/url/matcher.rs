/// Checks if a host matches a host pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: "www.flipkart.com" matches only that host
/// 2. Wildcard: "*.flipkart.com" matches "flipkart.com" itself and any
///    subdomain of it, however deep ("dl.flipkart.com", "m.dl.flipkart.com")
///
/// Hosts are expected to be lowercased before matching.
///
/// # Examples
///
/// ```
/// use shelf_sweep::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.amazon.in", "amazon.in"));
/// assert!(matches_wildcard("*.amazon.in", "m.amazon.in"));
/// assert!(!matches_wildcard("*.amazon.in", "notamazon.in"));
/// assert!(matches_wildcard("127.0.0.1", "127.0.0.1"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
