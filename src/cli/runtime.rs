use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use routegate_cli::GatewayConfig;

/// `RUST_LOG` wins over `--log-level`; `--debug` raises the fallback to DEBUG.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let fallback = if debug {
        Level::DEBUG
    } else {
        level
            .parse::<Level>()
            .with_context(|| format!("invalid --log-level {level:?}"))?
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };
    installed.context("logging already initialised")
}

pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = config_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("config/routegate.yaml"));

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;
        let config: GatewayConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!("Loaded configuration from: {}", config_path.display());
        config
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        GatewayConfig::default()
    };

    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;

    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}
