//! Cart commands.

use anyhow::{anyhow, Result};
use dialoguer::Confirm;
use serde::Serialize;
use storefront_commerce::prelude::*;
use storefront_sync::{ShopSession, SyncError};

use super::{CartArgs, CartCommand};
use crate::context::Context;
use crate::output::print_breakdown;

/// Run the cart command.
pub async fn run(args: CartArgs, ctx: &Context) -> Result<()> {
    let shop = ctx.signed_in_shop().await?;

    match args.command {
        Some(CartCommand::Show) | None => {}
        Some(CartCommand::Add { product, quantity }) => {
            let id = ProductId::new(product);
            let stored = change(ctx, &format!("Adding {}...", id), shop.sync().add(&id, quantity)).await?;
            ctx.output.success(&format!("{} x {}", id, stored));
        }
        Some(CartCommand::Set { product, quantity }) => {
            let id = ProductId::new(product);
            let stored = change(
                ctx,
                &format!("Updating {}...", id),
                shop.sync().set_quantity(&id, quantity),
            )
            .await?;
            if stored == 0 {
                ctx.output.success(&format!("Removed {}", id));
            } else {
                ctx.output.success(&format!("{} x {}", id, stored));
            }
        }
        Some(CartCommand::Remove { product }) => {
            let id = ProductId::new(product);
            change(ctx, &format!("Removing {}...", id), shop.sync().remove(&id)).await?;
            ctx.output.success(&format!("Removed {}", id));
        }
        Some(CartCommand::Clear { yes }) => {
            if !yes && !ctx.output.is_json() {
                let confirmed = Confirm::new()
                    .with_prompt("Remove everything from the cart?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    ctx.output.warn("Cart left as it was");
                    return Ok(());
                }
            }
            change(ctx, "Clearing cart...", shop.sync().clear_cart()).await?;
            ctx.output.success("Cart cleared");
        }
    }

    show_cart(&shop, ctx);
    Ok(())
}

/// Await a cart change behind a spinner, turning the error into the
/// customer-facing message.
async fn change<T>(
    ctx: &Context,
    msg: &str,
    op: impl std::future::Future<Output = Result<T, SyncError>>,
) -> Result<T> {
    let spinner = ctx.output.spinner(msg);
    let result = op.await;
    spinner.finish_and_clear();
    result.map_err(|e| {
        ctx.output.debug(&e.to_string());
        anyhow!(e.user_message())
    })
}

#[derive(Serialize)]
struct CartLineView {
    product_id: ProductId,
    title: Option<String>,
    quantity: u32,
    unit_price: Option<Money>,
    line_total: Option<Money>,
}

#[derive(Serialize)]
struct CartView {
    status: CartStatus,
    item_count: u64,
    lines: Vec<CartLineView>,
    breakdown: PricingBreakdown,
}

fn cart_view(shop: &ShopSession) -> CartView {
    shop.cart().read(|store| {
        let breakdown = store.breakdown();
        let lines = store
            .items()
            .iter()
            .map(|item| {
                let product = store.products().get(&item.product_id);
                let priced = breakdown
                    .lines
                    .iter()
                    .find(|l| l.product_id == item.product_id);
                CartLineView {
                    product_id: item.product_id.clone(),
                    title: product.map(|p| p.title.clone()),
                    quantity: item.quantity,
                    unit_price: priced.map(|l| l.unit_price),
                    line_total: priced.map(|l| l.subtotal),
                }
            })
            .collect();
        CartView {
            status: store.status(),
            item_count: store.total_item_count(),
            lines,
            breakdown,
        }
    })
}

fn show_cart(shop: &ShopSession, ctx: &Context) {
    let view = cart_view(shop);

    if ctx.output.is_json() {
        ctx.output.json(&view);
        return;
    }

    ctx.output.header(&format!("Cart ({} items)", view.item_count));
    if view.lines.is_empty() {
        ctx.output.info("Your cart is empty.");
        return;
    }

    let widths = [16, 28, 5, 12];
    ctx.output.table_row(&["PRODUCT", "TITLE", "QTY", "TOTAL"], &widths);
    for line in &view.lines {
        let quantity = line.quantity.to_string();
        let total = line
            .line_total
            .map(|m| m.display())
            .unwrap_or_else(|| "?".to_string());
        ctx.output.table_row(
            &[
                line.product_id.as_str(),
                line.title.as_deref().unwrap_or("-"),
                &quantity,
                &total,
            ],
            &widths,
        );
    }
    println!();

    print_breakdown(&ctx.output, &view.breakdown, &ctx.config.pricing);
    if view.breakdown.has_issues() {
        ctx.output
            .warn("Some products have no price data; totals may be incomplete.");
    }
}
