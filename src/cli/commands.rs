use clap::Subcommand;

use super::health::HealthArgs;
use super::resolve::ResolveArgs;
use super::run::RunArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Force a registry refresh and print the processing log
    Reset,

    /// Show loaded record counts and admission state
    Health(HealthArgs),

    /// Resolve the route and authorization for one call
    Resolve(ResolveArgs),

    /// Initialize and keep the cache fresh until interrupted
    Run(RunArgs),
}
