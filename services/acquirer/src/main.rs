//! Earthdata acquirer.
//!
//! Reads a run plan, acquires every collection it names and prints a JSON
//! report of what was found.

mod plan;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use acquisition::{AcquisitionConfig, AcquisitionFacade};
use plan::RunPlan;

#[derive(Parser, Debug)]
#[command(name = "acquirer")]
#[command(about = "Acquire Earthdata collections for a region and time window")]
struct Args {
    /// Run plan file path
    #[arg(short, long, env = "ACQUIRER_PLAN", default_value = "/etc/acquirer/plan.yaml")]
    plan: String,

    /// Override the catalog page limit
    #[arg(long)]
    max_pages: Option<u32>,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries the report
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args)?;

    info!(plan = %args.plan, "Starting acquirer");

    let mut config = AcquisitionConfig::from_env();
    if let Some(max_pages) = args.max_pages {
        config.catalog.max_pages = max_pages;
    }

    let run_plan = RunPlan::load(&args.plan)?;
    let plan = run_plan.to_acquisition_plan()?;
    info!(
        collections = plan.len(),
        start = %plan.temporal.start,
        end = %plan.temporal.end,
        "Loaded run plan"
    );

    let facade = AcquisitionFacade::new(&config).context("building acquisition pipeline")?;
    let registry = facade.acquire_all(&plan).await?;

    if facade.ingest().credentials().had_errors() {
        warn!("One or more providers did not issue credentials; their collections are absent");
    }

    let ingest_stats = facade.ingest().stats().await;
    let credential_stats = facade.ingest().credentials().stats().await;
    info!(
        ingest_hits = ingest_stats.hits,
        ingest_misses = ingest_stats.misses,
        credential_loads = credential_stats.loads,
        "Acquisition complete"
    );

    let report = json!({
        "title": run_plan.title.title,
        "subtitle": run_plan.title.subtitle,
        "collections": registry.summaries(),
        "variable_options": registry.variable_options(),
        "starter_variables": registry.starter_variables(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
