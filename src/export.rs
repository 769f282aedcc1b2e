//! JSON export of engine reports.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use fleetwatch_engine::HealthEngine;
use fleetwatch_types::EngineReport;
use tracing::warn;

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Wait until the trigger worker has handled every queued transition, or
/// `timeout` elapses. Returns the number still pending.
///
/// Inline dispatch has nothing queued and returns immediately.
pub async fn flush_triggers(engine: &HealthEngine, timeout: Duration) -> u64 {
    let dispatcher = engine.dispatcher();
    let deadline = tokio::time::Instant::now() + timeout;
    while dispatcher.pending() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
    }
    let pending = dispatcher.pending();
    if pending > 0 {
        warn!(pending, "Status transitions still queued for triggers");
    }
    pending
}

/// Write `report` as pretty-printed JSON, replacing any existing file.
pub fn write_report(report: &EngineReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<EngineReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report from {}", path.display()))?;
    let report: EngineReport = serde_json::from_str(&content).context("Malformed report")?;
    if !report.is_compatible() {
        anyhow::bail!("Unsupported report version {}", report.version);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_engine::{DispatchMode, GroupWatcher, StatusTransition};
    use fleetwatch_types::{ComponentReport, HealthStatus, ResourceHealthStatus};
    use std::collections::BTreeMap;

    #[test]
    fn written_reports_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut resources = BTreeMap::new();
        resources.insert(
            "db-1".to_string(),
            ResourceHealthStatus::unavailable("db-1", "connection refused"),
        );
        let report = EngineReport::builder()
            .timestamp_ms(1_700_000_000_000)
            .group(
                "db",
                HealthStatus::Malfunction,
                ResourceHealthStatus::unavailable("db-1", "connection refused"),
                resources,
            )
            .component("gateway", ComponentReport::default())
            .build();

        write_report(&report, &path).unwrap();
        assert_eq!(read_report(&path).unwrap(), report);
    }

    #[test]
    fn incompatible_versions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = EngineReport::builder().build();
        report.version = 999;
        write_report(&report, &path).unwrap();

        assert!(read_report(&path).is_err());
    }

    #[tokio::test]
    async fn flush_waits_for_queued_triggers() {
        let engine = HealthEngine::builder()
            .dispatch(DispatchMode::Worker { queue_capacity: 8 })
            .build()
            .unwrap();
        engine
            .register_group(GroupWatcher::builder("web").trigger(|_: &StatusTransition| {
                std::thread::sleep(Duration::from_millis(50));
            }))
            .unwrap();
        engine.mark_unavailable("web", "web-1", "refused").unwrap();
        engine.remove_resource("web", "web-1").unwrap();

        assert_eq!(flush_triggers(&engine, Duration::from_secs(5)).await, 0);
        assert_eq!(engine.dispatcher().delivered(), 2);
    }

    #[tokio::test]
    async fn flush_is_immediate_for_inline_dispatch() {
        let engine = HealthEngine::builder().build().unwrap();
        engine.register_group(GroupWatcher::builder("web")).unwrap();
        engine.mark_unavailable("web", "web-1", "refused").unwrap();
        assert_eq!(flush_triggers(&engine, Duration::ZERO).await, 0);
    }
}
