use anyhow::Result;
use clap::Args;
use serde::Serialize;

use routegate_admission::AdmissionStats;
use routegate_dispatcher::ServiceStatistics;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct HealthArgs {
    /// Report without contacting the registry
    #[arg(long)]
    pub skip_init: bool,
}

#[derive(Serialize)]
struct HealthReport {
    initialized: bool,
    revision: Option<u64>,
    source: Option<String>,
    routes_loaded: usize,
    permissions_loaded: usize,
    admission: AdmissionStats,
    services: Vec<ServiceStatistics>,
}

pub async fn cmd_health(args: HealthArgs, ctx: &CliContext, format: &OutputFormat) -> Result<()> {
    let engine = ctx.engine().await?;
    if !args.skip_init {
        engine.cache.init().await;
    }

    let snapshot = engine.cache.snapshot();
    let report = HealthReport {
        initialized: snapshot.is_some(),
        revision: snapshot.as_ref().map(|s| s.revision),
        source: snapshot.as_ref().map(|s| s.source.to_string()),
        routes_loaded: engine.cache.routes_loaded(),
        permissions_loaded: engine.cache.permissions_loaded(),
        admission: engine.admission.stats(),
        services: engine.dispatcher.statistics(),
    };

    emit(format, &report, |report| {
        println!("Initialized: {}", report.initialized);
        if let (Some(revision), Some(source)) = (report.revision, report.source.as_ref()) {
            println!("Revision:    {} (from {})", revision, source);
        }
        println!("Routes:      {}", report.routes_loaded);
        println!("Permissions: {}", report.permissions_loaded);
        println!("Inflight:    {}", report.admission.inflight);
    })
}
