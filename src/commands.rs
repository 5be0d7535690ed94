//! CLI command implementations

use crate::Result;
use crate::config::GatewayConfig;
use crate::server::{ServerContext, serve_stdio};
use crate::tools::ToolRegistry;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// Start the gateway on stdio.
#[inline]
pub async fn serve() -> Result<()> {
    let config = load_config()?;
    info!(
        "Loaded configuration for '{}' v{}",
        config.server.name, config.server.version
    );

    let ctx = Arc::new(ServerContext::new(&config).context("Failed to build server context")?);
    serve_stdio(ctx).await?;
    Ok(())
}

/// Print the static tool catalog.
#[inline]
pub fn list_tools() -> Result<()> {
    let registry = ToolRegistry::create_default().context("Failed to build tool registry")?;

    for tool in registry.descriptors() {
        let description = tool.description.as_deref().unwrap_or("(no description)");
        println!("{:<12} {description}", tool.name);
    }
    Ok(())
}

/// Print the effective configuration as TOML.
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;
    let rendered =
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
    println!("# configuration directory: {}", config.base_dir.display());
    print!("{rendered}");
    Ok(())
}

/// Write a config file with the effective settings, unless one exists.
#[inline]
pub fn init_config() -> Result<()> {
    let config = load_config()?;
    let path = config.base_dir.join("config.toml");
    if path.exists() {
        println!("Configuration already present at {}", path.display());
    } else {
        config
            .save()
            .map_err(|e| crate::GatewayError::Config(e.to_string()))?;
        println!("Wrote default configuration to {}", path.display());
    }
    Ok(())
}

fn load_config() -> Result<GatewayConfig> {
    GatewayConfig::load_default().map_err(|e| crate::GatewayError::Config(e.to_string()))
}
