//! Cart commands. Every mutation prints the server's resulting cart.

use voltcart_core::{CartItemId, ProductId};
use voltcart_storefront::types::CartItem;

use super::{CliError, Context};

#[allow(clippy::print_stdout)]
fn print_cart(ctx: &Context, items: &[CartItem]) {
    if items.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in items {
        println!(
            "{}  {:<40} x{:<3} {:>12}",
            item.id,
            item.product.name,
            item.quantity,
            item.line_total().display()
        );
    }
    println!("Total: {}", ctx.stores.cart.total());
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
pub async fn show(ctx: &Context) -> Result<(), CliError> {
    ctx.require_user().await?;
    let items = ctx.stores.cart.fetch().await?;
    print_cart(ctx, &items);
    Ok(())
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
pub async fn add(ctx: &Context, product_id: &str, quantity: i64) -> Result<(), CliError> {
    ctx.require_user().await?;
    let items = ctx
        .stores
        .cart
        .add_item(&ProductId::new(product_id), quantity)
        .await?;
    print_cart(ctx, &items);
    Ok(())
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
pub async fn set(ctx: &Context, item_id: &str, quantity: i64) -> Result<(), CliError> {
    ctx.require_user().await?;
    let items = ctx
        .stores
        .cart
        .update_quantity(&CartItemId::new(item_id), quantity)
        .await?;
    print_cart(ctx, &items);
    Ok(())
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
pub async fn remove(ctx: &Context, item_id: &str) -> Result<(), CliError> {
    ctx.require_user().await?;
    let items = ctx
        .stores
        .cart
        .remove_item(&CartItemId::new(item_id))
        .await?;
    print_cart(ctx, &items);
    Ok(())
}

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
pub async fn clear(ctx: &Context) -> Result<(), CliError> {
    ctx.require_user().await?;
    let items = ctx.stores.cart.clear().await?;
    print_cart(ctx, &items);
    Ok(())
}
