//! Listing and detail page extraction
//!
//! Both extractors are pure and total: malformed or unexpected markup never
//! fails a branch. Listing extraction degrades to an empty link set; detail
//! extraction degrades missing fields to empty strings, which the caller
//! reports as data-quality events rather than pipeline errors.

use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::crawler::url::{normalize_next_link, normalize_product_link};
use crate::models::ProductRecord;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Listing page: result cards link to detail pages from their heading
    static ref PRODUCT_LINK: Selector = parse_selector!("h2 > a.a-link-normal");
    static ref NEXT_PAGE: Selector = parse_selector!("a.s-pagination-next");

    // Detail page
    static ref PRODUCT_TITLE: Selector = parse_selector!("span#productTitle");
    static ref PRODUCT_IMAGE: Selector = parse_selector!("div#imgTagWrapperId > img");
    static ref SPEC_ROW: Selector = parse_selector!("tr");
    static ref SPEC_HEADER: Selector = parse_selector!("th");
    static ref SPEC_VALUE: Selector = parse_selector!("td");
}

/// Links discovered on one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Normalized detail-page URLs, deduplicated, in page order
    pub product_urls: Vec<String>,

    /// Normalized next-page URL, when the pagination control is present
    pub next_page_url: Option<String>,
}

/// Extract product links and the next-page link from a listing page
///
/// Tracking query parameters are stripped and relative hrefs are resolved
/// against `page_url`.
///
/// # Examples
///
/// ```
/// use marketminer::extract::extract_listing;
///
/// let html = r#"<h2><a class="a-link-normal" href="/dp/B000000001?ref=x">Widget</a></h2>"#;
/// let listing = extract_listing(html, "https://www.amazon.com/s?k=acme");
/// assert_eq!(listing.product_urls, vec!["https://www.amazon.com/dp/B000000001"]);
/// assert!(listing.next_page_url.is_none());
/// ```
pub fn extract_listing(html: &str, page_url: &str) -> Listing {
    let document = Html::parse_document(html);

    let mut seen = std::collections::HashSet::new();
    let mut product_urls = Vec::new();
    for link in document.select(&PRODUCT_LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(url) = normalize_product_link(href, page_url) {
            if seen.insert(url.clone()) {
                product_urls.push(url);
            }
        }
    }

    let next_page_url = document
        .select(&NEXT_PAGE)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| normalize_next_link(href, page_url));

    Listing {
        product_urls,
        next_page_url,
    }
}

/// Extract product fields from a detail page
///
/// Any field the page does not provide comes back as an empty string; the
/// record itself is always produced.
pub fn extract_detail(html: &str, product_url: &str, brand_name: &str) -> ProductRecord {
    let document = Html::parse_document(html);

    let product_name = document
        .select(&PRODUCT_TITLE)
        .next()
        .map(|el| collect_text(&el))
        .unwrap_or_default();

    let image_url = document
        .select(&PRODUCT_IMAGE)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let asin = extract_spec_value(&document, "ASIN").unwrap_or_default();

    ProductRecord {
        brand_name: brand_name.to_string(),
        product_name,
        asin,
        image_url,
        product_url: product_url.to_string(),
    }
}

/// Read the value cell of the spec-table row whose header contains `label`
///
/// The detail page renders product attributes as `<th>label</th><td>value</td>`
/// rows; this walks the rows rather than relying on a `:contains` selector.
fn extract_spec_value(document: &Html, label: &str) -> Option<String> {
    for row in document.select(&SPEC_ROW) {
        let Some(header) = row.select(&SPEC_HEADER).next() else {
            continue;
        };
        if !collect_text(&header).contains(label) {
            continue;
        }
        if let Some(value) = row.select(&SPEC_VALUE).next() {
            return Some(collect_text(&value));
        }
    }
    None
}

fn collect_text(el: &scraper::ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
