use anyhow::{bail, Result};

use super::context::CliContext;
use super::output::{emit, OutputFormat};

pub async fn cmd_reset(ctx: &CliContext, format: &OutputFormat) -> Result<()> {
    let engine = ctx.engine().await?;
    let outcome = engine.cache.reset().await;

    emit(format, &outcome, |outcome| {
        println!(
            "Reset {}: {} routes, {} permissions",
            if outcome.success { "succeeded" } else { "failed" },
            outcome.routes_loaded,
            outcome.permissions_loaded
        );
        for line in &outcome.processing_log {
            println!("  - {}", line);
        }
    })?;

    if !outcome.success {
        bail!("registry reset failed");
    }
    Ok(())
}
