//! Theme editor preview links.

use crate::types::PublishedItem;
use url::{form_urlencoded, Url};

/// Storefront path prefix under which product pages live.
pub const PRODUCT_PATH_PREFIX: &str = "/products";

/// First item of a list already filtered to published status.
pub fn first_published(items: &[PublishedItem]) -> Option<&PublishedItem> {
    items.first()
}

/// Link that opens the theme editor previewing `item`'s product page.
///
/// Returns `None` when `shop` does not form a valid host.
pub fn editor_url(shop: &str, theme_id: u64, item: &PublishedItem) -> Option<String> {
    let mut url = Url::parse(&format!("https://{shop}/admin/themes/{theme_id}/editor")).ok()?;
    let preview_path = format!("{PRODUCT_PATH_PREFIX}/{}", item.handle);
    // Spaces as %20, not form-style '+'; a literal '+' is already %2B.
    let encoded: String = form_urlencoded::byte_serialize(preview_path.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    url.set_query(Some(&format!("previewPath={encoded}")));
    Some(url.to_string())
}
