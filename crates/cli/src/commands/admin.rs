//! Back-office commands.

use voltcart_admin::Admin;
use voltcart_core::{CurrencyCode, Price};

use super::{CliError, Context};

/// Print the dashboard summary.
///
/// # Errors
///
/// Returns [`CliError::NotSignedIn`], `AdminError::Forbidden` for
/// non-admins, or the API error.
#[allow(clippy::print_stdout)]
pub async fn stats(ctx: &Context) -> Result<(), CliError> {
    ctx.require_user().await?;
    let admin = Admin::for_session(&ctx.api)?;
    let summary = admin.dashboard.fetch().await?;

    println!("Revenue:        {}", Price::new(summary.total_revenue, CurrencyCode::INR));
    println!("Orders:         {} ({} pending)", summary.total_orders, summary.pending_orders);
    println!("Products:       {} ({} out of stock)", summary.total_products, summary.out_of_stock);
    println!("Customers:      {}", summary.total_users);

    if !summary.monthly_sales.is_empty() {
        println!();
        println!("Monthly sales");
        for month in &summary.monthly_sales {
            println!("  {:<9} {:>14}", month.label(), Price::new(month.total_sales, CurrencyCode::INR).display());
        }
    }
    if !summary.order_status_breakdown.is_empty() {
        println!();
        println!("Orders by status");
        for entry in &summary.order_status_breakdown {
            println!("  {:<17} {:>5}", entry.status.as_deref().unwrap_or("Unknown"), entry.count);
        }
    }
    if !summary.top_products.is_empty() {
        println!();
        println!("Top products");
        for product in &summary.top_products {
            println!(
                "  {:<40} {:>5} sold {:>14}",
                product.display_name(),
                product.total_quantity,
                Price::new(product.revenue, CurrencyCode::INR).display()
            );
        }
    }
    Ok(())
}
