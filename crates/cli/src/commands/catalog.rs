//! Catalog browsing.

use voltcart_storefront::stores::ProductQuery;

use super::{CliError, Context};

/// # Errors
///
/// Returns the API error.
#[allow(clippy::print_stdout)]
pub async fn list(
    ctx: &Context,
    keyword: Option<String>,
    category: Option<String>,
    page: u32,
) -> Result<(), CliError> {
    let products = &ctx.stores.products;
    products.set_filters(ProductQuery {
        keyword,
        category,
        ..ProductQuery::default()
    });
    products.set_page(page);
    let listing = products.fetch_current().await?;

    if listing.items.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in &listing.items {
        let stock = if product.in_stock() { "" } else { "  (out of stock)" };
        println!("{}  {:<40} {:>12}{stock}", product.id, product.name, product.price().display());
    }
    println!(
        "Page {} of {} ({} products)",
        listing.page,
        listing.total_pages.max(1),
        listing.total
    );
    Ok(())
}
