use crate::url::host::extract_host;
use crate::url::site::{SiteTable, DEFAULT_KEEP_PARAMS};
use url::Url;

/// Canonicalizes a product URL into its deduplication key
///
/// # Normalization Steps
///
/// 1. Parse the URL; if that fails, return the input unchanged
/// 2. Find the site family that owns the host
/// 3. Keep only the family's identifying query parameters, in the family's order
///    (hosts outside every family keep `pid` and `dp`)
/// 4. Remove the fragment
/// 5. Rewrite the host to the family's canonical host, collapsing regional
///    and mobile variants
///
/// The function never fails and is idempotent.
///
/// # Examples
///
/// ```
/// use shelf_sweep::url::{normalize, SiteTable};
///
/// let table = SiteTable::default();
/// let key = normalize("https://dl.flipkart.com/item/p/x?pid=ABC&lid=1#reviews", &table);
/// assert_eq!(key, "https://www.flipkart.com/item/p/x?pid=ABC");
/// ```
pub fn normalize(raw: &str, table: &SiteTable) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Keeping unparseable URL {:?} as-is: {}", raw, e);
            return raw.to_string();
        }
    };

    let family = extract_host(&url).and_then(|host| table.family_for_host(&host));

    let kept: Vec<(String, String)> = match family {
        Some(profile) => retain_params(&url, profile.keep_params.iter().map(String::as_str)),
        None => retain_params(&url, DEFAULT_KEEP_PARAMS.iter().copied()),
    };

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.set_fragment(None);

    if let Some(profile) = family {
        if let Err(e) = url.set_host(Some(&profile.canonical_host)) {
            tracing::debug!(
                "Cannot canonicalize host of {} to {}: {}",
                raw,
                profile.canonical_host,
                e
            );
        }
    }

    url.into()
}

/// Picks the first value of each whitelisted parameter, in whitelist order
fn retain_params<'a>(
    url: &Url,
    keep: impl Iterator<Item = &'a str>,
) -> Vec<(String, String)> {
    keep.filter_map(|name| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
    })
    .collect()
}
