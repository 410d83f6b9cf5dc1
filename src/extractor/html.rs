//! HTML extractor for store pages
//!
//! Reads the document loaded into the page surface and applies per-site
//! CSS selector rules.
//!
//! # Listing pages
//!
//! Product links are `<a href>` elements whose href contains the site's
//! product path marker (`/p/` on Flipkart, `/dp/` on Amazon). Relative
//! links are resolved against the page URL; `javascript:`, `mailto:`,
//! `tel:` and `data:` links are skipped.
//!
//! # Product pages
//!
//! Each field has a rule: the first non-blank text match, every non-blank
//! text match, or every non-blank value of an attribute. Fields without a
//! match are left out of the record.

use crate::agent::PageSurface;
use crate::config::Site;
use crate::extractor::{fields, ExtractError, Extractor, FieldValue, ProductFields};
use crate::url::{host_of, SiteTable};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// How one field is read from a product page
#[derive(Debug, Clone, Copy)]
enum FieldRule {
    /// Text of the first element with non-blank text
    Text(&'static str),

    /// Text of every matching element
    List(&'static str),

    /// Value of an attribute on every matching element
    AttrList(&'static str, &'static str),
}

struct SiteRules {
    product_links: &'static str,
    fields: &'static [(&'static str, FieldRule)],
}

const FLIPKART_RULES: SiteRules = SiteRules {
    product_links: r#"a[href*="/p/"]"#,
    fields: &[
        (fields::TITLE, FieldRule::Text("span.VU-ZEz, span.B_NuCI, h1")),
        (fields::PRICE, FieldRule::Text("div.Nx9bqj.CxhGGd, div._30jeq3._16Jk6d")),
        (fields::RATING, FieldRule::Text("div.XQDdHH, div._3LWZlK")),
        (fields::RATING_BREAKDOWN, FieldRule::List("ul.rating-breakdown li, div._1uJVNT")),
        (fields::AVAILABLE_COLORS, FieldRule::List("li.color-swatch, div._3Oikkn a")),
        (fields::DELIVERY_TYPES, FieldRule::List("div.hVvnXm, div._3XINqE")),
        (fields::PAYMENT_METHODS, FieldRule::List("li.payment-option, div._2MSh5z li")),
        (fields::PRODUCT_HIGHLIGHTS, FieldRule::List("div.xFVion li, div._2418kt li")),
    ],
};

const AMAZON_RULES: SiteRules = SiteRules {
    product_links: r#"a[href*="/dp/"]"#,
    fields: &[
        (fields::TITLE, FieldRule::Text("#productTitle")),
        (fields::PRICE, FieldRule::Text("span.a-price span.a-offscreen, #priceblock_ourprice")),
        (fields::RATING, FieldRule::Text("#acrPopover span.a-size-base, span[data-hook=rating-out-of-text]")),
        (fields::RATING_BREAKDOWN, FieldRule::List("#histogramTable li, #histogramTable tr")),
        (fields::AVAILABLE_COLORS, FieldRule::AttrList("#variation_color_name li img", "alt")),
        (fields::DELIVERY_TYPES, FieldRule::List("#mir-layout-DELIVERY_BLOCK span.a-text-bold")),
        (fields::PAYMENT_METHODS, FieldRule::List("#icon-farm-container span.a-size-small")),
        (fields::PRODUCT_HIGHLIGHTS, FieldRule::List("#feature-bullets li span.a-list-item")),
    ],
};

fn rules_for(site: Site) -> &'static SiteRules {
    match site {
        Site::Flipkart => &FLIPKART_RULES,
        Site::Amazon => &AMAZON_RULES,
    }
}

/// Extractor reading the document held by a [`PageSurface`]
pub struct HtmlExtractor {
    surface: PageSurface,
    table: SiteTable,
}

impl HtmlExtractor {
    pub fn new(surface: PageSurface, table: SiteTable) -> Self {
        Self { surface, table }
    }

    /// Loaded document and the site it belongs to
    fn loaded_page(&self) -> Result<(String, Url, Site), ExtractError> {
        if self.surface.is_closed() {
            return Err(ExtractError::Delivery("page surface is closed".to_string()));
        }

        let page = self
            .surface
            .page()
            .ok_or_else(|| ExtractError::Delivery("no document loaded".to_string()))?;

        let base = Url::parse(&page.final_url)
            .map_err(|e| ExtractError::Failed(format!("bad page URL {}: {}", page.final_url, e)))?;

        let site = host_of(&page.final_url)
            .and_then(|host| self.table.family_for_host(&host))
            .map(|profile| profile.site)
            .ok_or_else(|| {
                ExtractError::Failed(format!("{} is not a known store page", page.final_url))
            })?;

        Ok((page.html, base, site))
    }
}

#[async_trait]
impl Extractor for HtmlExtractor {
    async fn collect_urls(&self) -> Result<Vec<String>, ExtractError> {
        let (html, base, site) = self.loaded_page()?;
        extract_product_links(&html, &base, rules_for(site))
    }

    async fn extract_product(&self) -> Result<Option<ProductFields>, ExtractError> {
        let (html, _, site) = self.loaded_page()?;
        let fields = extract_fields(&html, rules_for(site))?;
        Ok(if fields.is_empty() { None } else { Some(fields) })
    }
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Failed(format!("bad selector {}: {:?}", css, e)))
}

fn extract_product_links(
    html: &str,
    base: &Url,
    rules: &SiteRules,
) -> Result<Vec<String>, ExtractError> {
    let document = Html::parse_document(html);
    let links = selector(rules.product_links)?;

    Ok(document
        .select(&links)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base))
        .collect())
}

fn extract_fields(html: &str, rules: &SiteRules) -> Result<ProductFields, ExtractError> {
    let document = Html::parse_document(html);
    let mut product = ProductFields::new();

    for (name, rule) in rules.fields {
        let value = match *rule {
            FieldRule::Text(css) => {
                let sel = selector(css)?;
                document
                    .select(&sel)
                    .map(element_text)
                    .find(|text| !text.is_empty())
                    .map(FieldValue::Text)
            }
            FieldRule::List(css) => {
                let sel = selector(css)?;
                non_empty_list(document.select(&sel).map(element_text))
            }
            FieldRule::AttrList(css, attr) => {
                let sel = selector(css)?;
                non_empty_list(
                    document
                        .select(&sel)
                        .filter_map(|e| e.value().attr(attr))
                        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" ")),
                )
            }
        };

        if let Some(value) = value {
            product.insert(name.to_string(), value);
        }
    }

    Ok(product)
}

/// Whitespace-collapsed text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Keeps non-blank entries once each, in document order
fn non_empty_list(items: impl Iterator<Item = String>) -> Option<FieldValue> {
    let mut list: Vec<String> = Vec::new();
    for item in items {
        if !item.is_empty() && !list.contains(&item) {
            list.push(item);
        }
    }
    if list.is_empty() {
        None
    } else {
        Some(FieldValue::List(list))
    }
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
