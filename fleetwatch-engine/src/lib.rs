//! # fleetwatch-engine
//!
//! Live health-and-topology engine for fleet monitoring.
//!
//! The engine consumes two kinds of already-decoded telemetry:
//!
//! - **Spans** build a [`GraphOfComponents`]: which component was observed
//!   calling which other component.
//! - **Attribute snapshots** of monitored resources are judged by
//!   [`AttributeChecker`]s and aggregated per group by a [`GroupWatcher`],
//!   which fires a [`HealthStatusTrigger`] whenever the group's status changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use fleetwatch_engine::{
//!     DispatchMode, GroupWatcher, HealthEngine, LogTrigger, Predicate, TieredChecker,
//! };
//! use fleetwatch_types::{AttributeSnapshot, AttributeValue, HealthStatus};
//!
//! let engine = HealthEngine::builder()
//!     .graph_capacity(10_000)
//!     .dispatch(DispatchMode::Inline)
//!     .build()
//!     .unwrap();
//!
//! // Green below 1s, yellow up to 2s, red beyond
//! engine.register_group(
//!     GroupWatcher::builder("checkout")
//!         .checker("latency_ms", TieredChecker::colored(
//!             Predicate::less_than(1000.0),
//!             Some(Predicate::between(1000.0, 2000.0)),
//!         ))
//!         .trigger(LogTrigger),
//! ).unwrap();
//!
//! let mut snapshot = AttributeSnapshot::new();
//! snapshot.insert("latency_ms".into(), AttributeValue::Int(1500));
//! engine.update_status("checkout", "checkout-1", &snapshot).unwrap();
//!
//! assert_eq!(engine.get_status("checkout").unwrap().status, HealthStatus::Suspicious);
//! ```
//!
//! ## Features
//!
//! - **Bounded memory**: the component graph and its span index evict their
//!   oldest entries; eviction never leaves a dangling edge
//! - **Pluggable policies**: closures, custom checkers, or rule data compiled
//!   from configuration via [`CheckerSpec`]
//! - **Isolated failures**: faulty checkers and triggers are logged and
//!   absorbed at the call boundary
//! - **Thread-safe**: feed spans and snapshots from any thread

mod bounded;
mod checker;
mod dispatch;
mod engine;
mod error;
mod graph;
mod registry;
mod trigger;
mod watcher;

pub use checker::{
    AttributeChecker, CheckerSpec, Comparison, ConstantChecker, Predicate, TierSpec, TieredChecker,
};
pub use dispatch::{DispatchMode, TriggerDispatcher};
pub use engine::{EngineConfig, HealthEngine, HealthEngineBuilder};
pub use error::{CheckError, EngineError, Result, TriggerError};
pub use graph::{ComponentVertex, GraphOfComponents};
pub use registry::WatcherRegistry;
pub use trigger::{
    ChannelTrigger, HealthStatusTrigger, LogTrigger, NoopTrigger, StatusTransition, TriggerSpec,
};
pub use watcher::{GroupWatcher, GroupWatcherBuilder};

// Re-export types for convenience
pub use fleetwatch_types::{
    AttributeSnapshot, AttributeValue, EngineReport, HealthCause, HealthStatus,
    ResourceHealthStatus, Span,
};
