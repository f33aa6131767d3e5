use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;

use routegate_cli::{Engine, GatewayConfig};

pub struct CliContext {
    config: Arc<GatewayConfig>,
    config_path: PathBuf,
    engine: OnceCell<Arc<Engine>>,
}

impl CliContext {
    pub fn new(config: GatewayConfig, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            engine: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub async fn engine(&self) -> Result<Arc<Engine>> {
        self.engine
            .get_or_try_init(|| async { Engine::from_config(&self.config).map(Arc::new) })
            .await
            .map(Arc::clone)
    }
}
