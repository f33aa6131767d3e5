use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use routegate_core_types::{RouteRequest, VirtualizationRecord};
use routegate_registry_cache::RouteResult;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Calling system
    #[arg(long)]
    pub sender: String,

    /// Logical receiver address
    #[arg(long)]
    pub receiver: String,

    /// Service contract namespace
    #[arg(long)]
    pub contract: String,

    /// Evaluate at this RFC3339 instant instead of now
    #[arg(long)]
    pub at: Option<String>,

    /// Accept the deprecated multi-address receiver form
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Serialize)]
struct ResolveReport {
    request: String,
    routed: bool,
    matched_address: Option<String>,
    records: Vec<VirtualizationRecord>,
    authorized: Option<bool>,
    visited: Vec<String>,
}

pub async fn cmd_resolve(args: ResolveArgs, ctx: &CliContext, format: &OutputFormat) -> Result<()> {
    let engine = ctx.engine().await?;
    engine.cache.init().await;

    let mut request = RouteRequest::new(args.sender, args.receiver, args.contract);
    if let Some(raw) = args.at.as_deref() {
        let at = DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at timestamp: {raw}"))?;
        request = request.at(at.with_timezone(&Utc));
    }

    let result = engine.cache.resolve_route(&request, args.legacy)?;
    let report = match result {
        RouteResult::Routed(found) => {
            let authorized = engine
                .cache
                .check_authorization(&request, &found.authorization_candidates)?;
            ResolveReport {
                request: request.to_string(),
                routed: true,
                matched_address: Some(found.matched_address),
                records: found.records,
                authorized: Some(authorized),
                visited: found.trace.visited,
            }
        }
        RouteResult::NoRoute(trace) => ResolveReport {
            request: request.to_string(),
            routed: false,
            matched_address: None,
            records: Vec::new(),
            authorized: None,
            visited: trace.visited,
        },
    };

    emit(format, &report, |report| {
        println!("Request: {}", report.request);
        match report.matched_address.as_ref() {
            Some(address) => println!("Route:   matched at {}", address),
            None => println!("Route:   none"),
        }
        for record in &report.records {
            println!(
                "  {} [{}]",
                record.physical_address, record.transport_profile
            );
        }
        if let Some(authorized) = report.authorized {
            println!("Authorized: {}", authorized);
        }
        println!("Visited: {}", report.visited.join(" -> "));
    })
}
