//! Replay of recorded spans into the topology graph.
//!
//! Spans are read as newline-delimited JSON, one [`Span`] per line.
//! Malformed lines are counted and skipped.

use std::path::Path;

use fleetwatch_engine::HealthEngine;
use fleetwatch_types::Span;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

/// Outcome counts of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Spans recorded in the graph.
    pub accepted: usize,
    /// Lines that are not valid span JSON.
    pub malformed: usize,
    /// Spans the graph refused, e.g. for an empty span id.
    pub rejected: usize,
}

/// Feed every span line of `reader` to `engine`.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use fleetwatch::replay::replay;
/// use fleetwatch_engine::HealthEngine;
///
/// # tokio_test::block_on(async {
/// let engine = HealthEngine::builder().build().unwrap();
/// let data = br#"{"component_name":"gateway","instance_name":"gw-1","correlation_id":"t1","span_id":"1"}
/// {"component_name":"orders","instance_name":"o-1","correlation_id":"t1","span_id":"2","parent_span_id":"1"}
/// "#;
/// let stats = replay(&engine, Cursor::new(data.to_vec())).await.unwrap();
/// assert_eq!(stats.accepted, 2);
/// assert!(engine.component("gateway").unwrap().contains("orders"));
/// # });
/// ```
pub async fn replay<R>(engine: &HealthEngine, reader: R) -> std::io::Result<ReplayStats>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut stats = ReplayStats::default();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let span = match serde_json::from_str::<Span>(line) {
            Ok(span) => span,
            Err(e) => {
                stats.malformed += 1;
                debug!(line = line_no, error = %e, "Skipping malformed span");
                continue;
            }
        };
        match engine.accept(&span) {
            Ok(()) => stats.accepted += 1,
            Err(e) => {
                stats.rejected += 1;
                debug!(line = line_no, error = %e, "Span rejected");
            }
        }
    }

    if stats.malformed > 0 || stats.rejected > 0 {
        warn!(
            malformed = stats.malformed,
            rejected = stats.rejected,
            "Some spans could not be replayed"
        );
    }
    Ok(stats)
}

/// Replay a span file.
pub async fn replay_file(engine: &HealthEngine, path: &Path) -> std::io::Result<ReplayStats> {
    let file = tokio::fs::File::open(path).await?;
    replay(engine, file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn engine() -> HealthEngine {
        HealthEngine::builder().graph_capacity(64).build().unwrap()
    }

    fn line(span: &Span) -> String {
        serde_json::to_string(span).unwrap()
    }

    #[tokio::test]
    async fn replays_parent_chains() {
        let engine = engine();
        let input = [
            line(&Span::builder("gateway", "gw-1", "t1", "1").build()),
            line(&Span::builder("orders", "o-1", "t1", "2").parent("1").build()),
            line(&Span::builder("db", "db-1", "t1", "3").parent("2").build()),
        ]
        .join("\n");

        let stats = replay(&engine, Cursor::new(input.into_bytes())).await.unwrap();
        assert_eq!(stats, ReplayStats { accepted: 3, malformed: 0, rejected: 0 });
        assert!(engine.component("gateway").unwrap().contains("orders"));
        assert!(engine.component("orders").unwrap().contains("db"));
    }

    #[tokio::test]
    async fn counts_bad_lines() {
        let engine = engine();
        let input = format!(
            "not json\n\n{}\n{}\n",
            line(&Span::builder("gateway", "gw-1", "t1", "1").build()),
            line(&Span::builder("orders", "o-1", "t1", "").build()),
        );

        let stats = replay(&engine, Cursor::new(input.into_bytes())).await.unwrap();
        assert_eq!(stats, ReplayStats { accepted: 1, malformed: 1, rejected: 1 });
    }

    #[tokio::test]
    async fn replays_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spans.jsonl");
        std::fs::write(&path, line(&Span::builder("gateway", "gw-1", "t1", "1").build())).unwrap();

        let engine = engine();
        assert_eq!(replay_file(&engine, &path).await.unwrap().accepted, 1);
        assert!(replay_file(&engine, &dir.path().join("missing.jsonl")).await.is_err());
    }
}
