//! Checkout command.

use anyhow::{anyhow, Result};
use dialoguer::Confirm;
use storefront_commerce::prelude::*;

use super::CheckoutArgs;
use crate::context::Context;
use crate::output::print_breakdown;

/// Run the checkout command.
pub async fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let details = details_from_args(&args)?;
    let shop = ctx.signed_in_shop().await?;

    let breakdown = shop.cart().breakdown();
    if !ctx.output.is_json() {
        ctx.output.header("Order summary");
        ctx.output.kv("Items", &shop.cart().total_item_count().to_string());
        ctx.output.kv("Ship to", &details.shipping_address.one_line());
        ctx.output.kv("Payment", &details.payment.to_string());
        print_breakdown(&ctx.output, &breakdown, &ctx.config.pricing);
        println!();

        if !args.yes {
            let confirmed = Confirm::new()
                .with_prompt(format!("Place order for {}?", breakdown.total.display()))
                .default(false)
                .interact()?;
            if !confirmed {
                ctx.output.warn("Order not placed");
                return Ok(());
            }
        }
    }

    let spinner = ctx.output.spinner("Placing order...");
    let result = shop.checkout().submit(&details).await;
    spinner.finish_and_clear();

    let confirmation = result.map_err(|e| {
        ctx.output.debug(&e.to_string());
        anyhow!(e.user_message())
    })?;

    if ctx.output.is_json() {
        ctx.output.json(&confirmation);
        return Ok(());
    }

    ctx.output
        .success(&format!("Order {} placed", confirmation.order_id));
    ctx.output.kv("Charged", &confirmation.totals.total.display());
    if confirmation.totals.total != breakdown.total {
        ctx.output.warn(&format!(
            "The store charged {} instead of the {} shown.",
            confirmation.totals.total.display(),
            breakdown.total.display()
        ));
    }

    Ok(())
}

fn details_from_args(args: &CheckoutArgs) -> Result<CheckoutDetails> {
    let mut address = ShippingAddress::new(
        args.name.as_str(),
        args.line1.as_str(),
        args.city.as_str(),
        args.postal_code.as_str(),
        args.country.as_str(),
    );
    if let Some(line2) = &args.line2 {
        address = address.with_line2(line2.as_str());
    }
    if let Some(region) = &args.region {
        address = address.with_region(region.as_str());
    }
    if let Some(phone) = &args.phone {
        address = address.with_phone(phone.as_str());
    }

    let mut payment = PaymentDetails::new(args.payment_token.as_str());
    if let Some(last4) = &args.last4 {
        payment = payment.with_last4(last4.as_str())?;
    }

    Ok(CheckoutDetails::new(address, payment))
}
