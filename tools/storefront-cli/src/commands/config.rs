//! Configuration management commands.

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;
use storefront_sync::StorefrontConfig;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init {
            base_url,
            format,
            force,
        } => init_config(base_url, &format, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let backend = &ctx.config.backend;
    ctx.output.info("");
    ctx.output.info("[backend]");
    ctx.output.kv("base_url", &backend.base_url);
    ctx.output.kv("timeout_secs", &backend.timeout_secs.to_string());
    ctx.output.kv("line_write_mode", backend.line_write_mode.as_str());

    let pricing = &ctx.config.pricing;
    ctx.output.info("");
    ctx.output.info("[pricing]");
    ctx.output.kv("currency", pricing.currency.code());
    ctx.output
        .kv("default_tax_rate", &pricing.default_tax_rate.to_string());
    ctx.output.kv(
        "free_shipping_threshold_cents",
        &pricing.free_shipping_threshold_cents.to_string(),
    );
    ctx.output.kv(
        "flat_shipping_fee_cents",
        &pricing.flat_shipping_fee_cents.to_string(),
    );

    if !pricing.tax_rate_by_category.is_empty() {
        ctx.output.info("");
        ctx.output.info("[pricing.tax_rate_by_category]");
        for (category, rate) in &pricing.tax_rate_by_category {
            ctx.output.kv(category.as_str(), &rate.to_string());
        }
    }

    Ok(())
}

fn init_config(base_url: Option<String>, format: &str, force: bool, ctx: &Context) -> Result<()> {
    let file_name = match format.trim().to_lowercase().as_str() {
        "toml" => "storefront.toml",
        "json" => "storefront.json",
        other => bail!("Unknown config format: {} (expected toml or json)", other),
    };
    let config_path = ctx.cwd.join(file_name);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = StorefrontConfig::default();
    if let Some(url) = base_url {
        config.backend.base_url = url;
    }
    config.validate()?;
    config.save(&config_path)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut warnings: Vec<String> = Vec::new();
    if ctx.config_path.is_none() {
        warnings.push("no config file found, using defaults".to_string());
    }
    if ctx.config.backend.base_url.starts_with("http://")
        && !ctx.config.backend.base_url.contains("localhost")
    {
        warnings.push("backend.base_url is not https".to_string());
    }
    if ctx.config.pricing.flat_shipping_fee_cents == 0 {
        warnings.push("pricing.flat_shipping_fee_cents is 0, shipping is always free".to_string());
    }

    for warning in &warnings {
        ctx.output.warn(warning);
    }

    if let Err(e) = ctx.config.validate() {
        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({
                "valid": false,
                "error": e.to_string(),
                "warnings": warnings,
            }));
        }
        bail!("{}", e);
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "valid": true, "warnings": warnings }));
    } else {
        ctx.output.success("Configuration is valid");
    }
    Ok(())
}
