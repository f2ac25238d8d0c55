//! Catalog commands.

use anyhow::{anyhow, bail, Context as _, Result};
use rust_decimal::Decimal;
use storefront_commerce::prelude::*;
use storefront_sync::Latest;

use super::{ProductsArgs, ProductsCommand};
use crate::context::Context;

/// Run the products command.
pub async fn run(args: ProductsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ProductsCommand::Search {
            text,
            category,
            min_price,
            max_price,
            in_stock,
            sort,
        } => {
            let currency = ctx.config.pricing.currency;
            let mut filter = ProductFilter::new().with_price_range(
                parse_price(min_price.as_deref(), currency)?,
                parse_price(max_price.as_deref(), currency)?,
            );
            if let Some(text) = text {
                filter = filter.with_text(text);
            }
            if let Some(category) = category {
                filter = filter.with_category(category);
            }
            if in_stock {
                filter = filter.in_stock_only();
            }
            let Some(sort) = SortOption::parse(&sort) else {
                bail!("Unknown sort option: {}", sort);
            };
            search(filter.with_sort(sort), ctx).await
        }
        ProductsCommand::Show { product } => show(&ProductId::new(product), ctx).await,
    }
}

fn parse_price(value: Option<&str>, currency: Currency) -> Result<Option<Money>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let amount: Decimal = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid price: {}", value))?;
    let money = Money::from_decimal(amount, currency)?;
    Ok(Some(money))
}

async fn search(filter: ProductFilter, ctx: &Context) -> Result<()> {
    let shop = ctx.shop();
    let spinner = ctx.output.spinner("Searching...");
    let result = shop.catalog().search(&filter).await;
    spinner.finish_and_clear();

    let products = match result.map_err(|e| anyhow!(e.user_message()))? {
        Latest::Current(products) => products,
        Latest::Superseded => return Ok(()),
    };

    if ctx.output.is_json() {
        ctx.output.json(&products);
        return Ok(());
    }

    ctx.output.header(&format!("{} products", products.len()));
    let widths = [16, 32, 12, 6];
    ctx.output.table_row(&["ID", "TITLE", "PRICE", "STOCK"], &widths);
    for product in &products {
        let stock = product.stock.to_string();
        ctx.output.table_row(
            &[
                product.id.as_str(),
                &product.title,
                &product.price.display(),
                &stock,
            ],
            &widths,
        );
    }
    Ok(())
}

async fn show(id: &ProductId, ctx: &Context) -> Result<()> {
    let shop = ctx.shop();
    let spinner = ctx.output.spinner("Loading product...");
    let result = shop.catalog().product(id).await;
    spinner.finish_and_clear();

    let Latest::Current(product) = result.map_err(|e| anyhow!(e.user_message()))? else {
        return Ok(());
    };

    if ctx.output.is_json() {
        ctx.output.json(&product);
        return Ok(());
    }

    let rate = ctx.config.pricing.rate_for(&product.category);
    ctx.output.header(&product.title);
    ctx.output.kv("ID", product.id.as_str());
    ctx.output.kv("Price", &product.price.display());
    ctx.output.kv("Category", &format!("{} (tax {})", product.category, rate));
    if product.is_in_stock() {
        ctx.output.kv("Stock", &product.stock.to_string());
    } else {
        ctx.output.kv("Stock", "out of stock");
    }
    if let Some(image) = &product.image {
        ctx.output.kv("Image", image);
    }
    Ok(())
}
