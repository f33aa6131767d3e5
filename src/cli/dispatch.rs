use anyhow::Result;

use super::context::CliContext;
use super::env::CliArgs;
use super::health::cmd_health;
use super::reset::cmd_reset;
use super::resolve::cmd_resolve;
use super::run::cmd_run;
use crate::cli::commands::Commands;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Reset => cmd_reset(ctx, &cli.output).await,
        Commands::Health(args) => cmd_health(args, ctx, &cli.output).await,
        Commands::Resolve(args) => cmd_resolve(args, ctx, &cli.output).await,
        Commands::Run(args) => cmd_run(args, ctx).await,
    }
}
