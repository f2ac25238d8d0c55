//! Purchase history command.

use anyhow::{anyhow, Result};
use storefront_sync::Latest;

use super::OrdersArgs;
use crate::context::Context;
use crate::output::{format_timestamp, status_badge};

/// Run the orders command.
pub async fn run(args: OrdersArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.signed_in_shop().await?;

    let spinner = ctx.output.spinner("Loading orders...");
    let result = shop.orders().load().await;
    spinner.finish_and_clear();

    let Latest::Current(mut orders) = result.map_err(|e| anyhow!(e.user_message()))? else {
        return Ok(());
    };
    if let Some(limit) = args.limit {
        orders.truncate(limit);
    }

    if ctx.output.is_json() {
        ctx.output.json(&orders);
        return Ok(());
    }

    if orders.is_empty() {
        ctx.output.info("No orders yet.");
        return Ok(());
    }

    ctx.output.header("Orders");
    let widths = [14, 16, 12, 6, 12];
    ctx.output
        .table_row(&["ORDER", "PLACED", "STATUS", "ITEMS", "TOTAL"], &widths);
    for order in &orders {
        let placed = format_timestamp(order.placed_at);
        let items = order.item_count().to_string();
        let status = status_badge(order.status);
        let total = order.totals.total.display();
        ctx.output.table_row(
            &[order.id.as_str(), &placed, &status, &items, &total],
            &widths,
        );

        if args.lines {
            for line in &order.lines {
                let title = line.title.as_deref().unwrap_or(line.product_id.as_str());
                ctx.output.list_item(&format!(
                    "{} x {} @ {} = {}",
                    line.quantity,
                    title,
                    line.unit_price.display(),
                    line.line_total().display()
                ));
            }
        }
    }

    Ok(())
}
