//! Order history.

use super::{CliError, Context};

/// # Errors
///
/// Returns [`CliError::NotSignedIn`] or the API error.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context) -> Result<(), CliError> {
    ctx.require_user().await?;
    let orders = ctx.stores.orders.fetch_mine().await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }
    for order in &orders {
        let placed = order
            .created_at
            .map_or_else(String::new, |at| at.format("%d %b %Y").to_string());
        let paid = if order.is_paid { "paid" } else { "unpaid" };
        println!(
            "{}  {:<11} {:<17} {:>12}  {paid}",
            order.id,
            placed,
            order.order_status.as_str(),
            order.total().display()
        );
    }
    let unpaid = ctx.stores.orders.unpaid().len();
    if unpaid > 0 {
        println!("{unpaid} order(s) still awaiting payment");
    }
    Ok(())
}
