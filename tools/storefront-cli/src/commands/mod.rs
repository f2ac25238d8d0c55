//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod orders;
pub mod products;

use clap::{Args, Subcommand};

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart with totals.
    Show,
    /// Add units of a product.
    Add {
        /// Product ID.
        product: String,
        /// Units to add.
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Set a product's quantity (0 removes it).
    Set {
        /// Product ID.
        product: String,
        /// New quantity.
        quantity: i64,
    },
    /// Remove a product.
    Remove {
        /// Product ID.
        product: String,
    },
    /// Empty the cart.
    Clear {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the products command.
#[derive(Args)]
pub struct ProductsArgs {
    #[command(subcommand)]
    pub command: ProductsCommand,
}

#[derive(Subcommand)]
pub enum ProductsCommand {
    /// Search the catalog.
    Search {
        /// Text to look for in titles.
        text: Option<String>,
        /// Restrict to a category.
        #[arg(long)]
        category: Option<String>,
        /// Minimum price, e.g. 9.99.
        #[arg(long)]
        min_price: Option<String>,
        /// Maximum price.
        #[arg(long)]
        max_price: Option<String>,
        /// Only products in stock.
        #[arg(long)]
        in_stock: bool,
        /// relevance, price_asc, price_desc, title_asc or title_desc.
        #[arg(long, default_value = "relevance")]
        sort: String,
    },
    /// Show one product.
    Show {
        /// Product ID.
        product: String,
    },
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Recipient's full name.
    #[arg(long)]
    pub name: String,

    /// Street address.
    #[arg(long)]
    pub line1: String,

    /// Apartment, suite, etc.
    #[arg(long)]
    pub line2: Option<String>,

    #[arg(long)]
    pub city: String,

    /// State or province.
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub postal_code: String,

    /// ISO country code.
    #[arg(long)]
    pub country: String,

    #[arg(long)]
    pub phone: Option<String>,

    /// Payment token from the payment provider.
    #[arg(long)]
    pub payment_token: String,

    /// Last four digits of the card, for the receipt.
    #[arg(long)]
    pub last4: Option<String>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    /// Show only the last N orders.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Show the lines of each order.
    #[arg(long)]
    pub lines: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Backend base URL.
        #[arg(long)]
        base_url: Option<String>,
        /// File format: toml or json.
        #[arg(long, default_value = "toml")]
        format: String,
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration.
    Validate,
}
