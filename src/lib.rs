//! # fleetwatch
//!
//! Fleet monitoring around the live health-and-topology engine.
//!
//! This crate wires the pieces of the workspace into a runnable service:
//!
//! ```text
//! ┌───────────────┐  samples   ┌──────────────────────────────┐
//! │  connectors   │───────────▶│         HealthEngine         │
//! │ (file/static) │            │  GroupWatcher per group ──▶ triggers
//! └───────────────┘            │                              │
//! ┌───────────────┐   spans    │  GraphOfComponents           │
//! │ span replay   │───────────▶│                              │
//! └───────────────┘            └──────────────┬───────────────┘
//!                                             │ report()
//!                                             ▼
//!                                      EngineReport JSON
//! ```
//!
//! - **[`settings`]**: configuration loading (`config` crate) and wiring of
//!   engine, groups and connectors
//! - **[`replay`]**: newline-delimited JSON span replay into the graph
//! - **[`export`]**: report export for dashboards and alert gateways, and
//!   flushing of queued triggers before exit
//! - **[`logging`]**: console `tracing` subscriber for the binary
//!
//! ## Usage
//!
//! ```bash
//! # Poll configured resources until Ctrl-C
//! fleetwatch --config fleetwatch.toml
//!
//! # Replay recorded spans, poll once, write a report and exit
//! fleetwatch --config fleetwatch.toml --spans spans.jsonl --export report.json
//! ```

pub mod export;
pub mod logging;
pub mod replay;
pub mod settings;

pub use export::{flush_triggers, read_report, write_report};
pub use replay::{replay, replay_file, ReplayStats};
pub use settings::{GroupSettings, PollSettings, Settings};

// Re-export the workspace crates for library consumers
pub use fleetwatch_connectors as connectors;
pub use fleetwatch_engine as engine;
pub use fleetwatch_types as types;
