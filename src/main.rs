use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fleetwatch::connectors::ConnectorRegistry;
use fleetwatch::{flush_triggers, logging, replay, write_report, Settings};

const TRIGGER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "fleetwatch")]
#[command(about = "Live health and topology monitoring for a fleet of services")]
struct Args {
    /// Path to the configuration file (TOML, JSON or YAML)
    #[arg(short, long, default_value = "fleetwatch.toml")]
    config: PathBuf,

    /// Replay newline-delimited JSON spans into the topology graph before polling
    #[arg(short, long)]
    spans: Option<PathBuf>,

    /// Poll every resource once, write the report to this JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "fleetwatch_engine=debug")
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level);

    let settings = Settings::load(&args.config)?;
    let engine = settings.build_engine()?;

    if let Some(ref spans) = args.spans {
        let stats = replay::replay_file(&engine, spans)
            .await
            .with_context(|| format!("Failed to replay spans from {}", spans.display()))?;
        info!(
            accepted = stats.accepted,
            malformed = stats.malformed,
            rejected = stats.rejected,
            components = engine.graph().size(),
            "Span replay complete"
        );
    }

    let poller = settings.build_poller(engine.clone(), &ConnectorRegistry::with_builtins())?;

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        poller.poll_once().await;
        let report = engine.report();
        write_report(&report, export_path)?;
        info!(
            path = %export_path.display(),
            groups = report.groups.len(),
            components = report.components.len(),
            worst = %report.worst_status(),
            "Report written"
        );
        flush_triggers(&engine, TRIGGER_FLUSH_TIMEOUT).await;
        return Ok(());
    }

    info!(
        config = %args.config.display(),
        groups = engine.groups().len(),
        resources = poller.len(),
        "Polling started"
    );
    let handle = poller.start();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.shutdown().await;
    flush_triggers(&engine, TRIGGER_FLUSH_TIMEOUT).await;

    let dispatcher = engine.dispatcher();
    info!(
        delivered = dispatcher.delivered(),
        failed = dispatcher.failed(),
        dropped = dispatcher.dropped(),
        "Shutting down"
    );
    Ok(())
}
