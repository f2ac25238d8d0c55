//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use storefront_auth::{AuthSession, BearerToken};
use storefront_sync::{ShopSession, StorefrontConfig};

use crate::output::Output;

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "STOREFRONT_TOKEN";

/// Config file names, in lookup order.
pub const CONFIG_NAMES: [&str; 3] = ["storefront.toml", ".storefront.toml", "storefront.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Client configuration.
    pub config: StorefrontConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    token: Option<String>,
}

impl Context {
    /// Load context from config file and environment.
    pub fn load(config_path: Option<&str>, token: Option<String>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (mut config, config_path) = if let Some(path) = config_path {
            let config = StorefrontConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path))?;
            (config, Some(PathBuf::from(path)))
        } else {
            // Try to find config in current directory or parent directories
            match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (StorefrontConfig::default(), None),
            }
        };
        config.apply_env();

        let token = token.or_else(|| std::env::var(TOKEN_ENV).ok());

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            token,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(StorefrontConfig, PathBuf)> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    match StorefrontConfig::load(&config_path) {
                        Ok(config) => return Some((config, config_path)),
                        Err(e) => tracing::warn!(path = %config_path.display(), error = %e, "skipping config"),
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// A session with nobody signed in, for the public catalog.
    pub fn shop(&self) -> ShopSession {
        ShopSession::from_config(&self.config)
    }

    /// A signed-in session with the cart loaded.
    pub async fn signed_in_shop(&self) -> Result<ShopSession> {
        let Some(raw) = self.token.as_deref() else {
            bail!("Not signed in. Pass --token or set {}.", TOKEN_ENV);
        };
        let token = BearerToken::new(raw).context("Invalid bearer token")?;

        let shop = self.shop();
        let spinner = self.output.spinner("Loading cart...");
        let loaded = shop.sign_in(AuthSession::new(token)).await;
        spinner.finish_and_clear();

        loaded.map_err(|e| anyhow::anyhow!(e.user_message()))?;
        Ok(shop)
    }
}
