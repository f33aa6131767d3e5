use anyhow::Result;
use clap::Args;
use tokio::signal;
use tracing::{info, warn};

use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Exit with an error when the first load yields no data
    #[arg(long)]
    pub require_data: bool,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    info!(
        config = %ctx.config_path().display(),
        registry = %ctx.config().registry.base_url,
        "starting gateway engine"
    );
    let engine = ctx.engine().await?;

    let outcome = engine.cache.init().await;
    for line in &outcome.log.entries {
        info!("{}", line);
    }
    if !outcome.initialized {
        if args.require_data {
            anyhow::bail!("no registry data available at startup");
        }
        warn!("cache not initialized; calls are rejected until a refresh succeeds");
    }

    let handles = engine.spawn_maintenance();
    println!(
        "routegate running ({} routes, {} permissions). Ctrl+C to stop.",
        engine.cache.routes_loaded(),
        engine.cache.permissions_loaded()
    );

    signal::ctrl_c().await?;
    for handle in handles {
        handle.abort();
    }
    println!("\nroutegate stopped by user");
    Ok(())
}
