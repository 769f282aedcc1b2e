//! # fleetwatch-connectors
//!
//! Resource connectors and the polling loop that feeds their samples into a
//! [`HealthEngine`](fleetwatch_engine::HealthEngine).
//!
//! A [`ResourceConnector`] knows how to obtain the current attribute values of
//! one monitored resource. The [`Poller`] samples every bound connector on an
//! interval and reports the result to the resource's group: a snapshot becomes
//! `update_status`, a failure becomes `mark_unavailable`.
//!
//! ## Built-in connectors
//!
//! - **file** - reads a JSON object of attributes from disk
//! - **static** - returns a fixed snapshot (or a fixed failure)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fleetwatch_connectors::{FileConnector, Poller};
//! use fleetwatch_engine::{GroupWatcher, HealthEngine, LogTrigger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(HealthEngine::builder().build()?);
//!     engine.register_group(GroupWatcher::builder("web").trigger(LogTrigger))?;
//!
//!     let poller = Poller::new(engine.clone())
//!         .interval(Duration::from_secs(1))
//!         .bind("web", "web-1", Arc::new(FileConnector::new("web-1.json")));
//!
//!     let handle = poller.start();
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     handle.stop();
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;

use async_trait::async_trait;

pub mod error;
mod file;
mod poller;
mod registry;
mod static_connector;

pub use error::ConnectorError;
pub use file::FileConnector;
pub use poller::{PollSummary, Poller, PollerHandle};
pub use registry::{ConnectorFactory, ConnectorRegistry, ConnectorSpec};
pub use static_connector::StaticConnector;

// Re-export types for convenience
pub use fleetwatch_types::{AttributeSnapshot, AttributeValue};

/// Obtains attribute values from one monitored resource.
///
/// Implementations should fail with [`ConnectorError`] rather than return a
/// partial snapshot when the resource cannot be reached.
#[async_trait]
pub trait ResourceConnector: Send + Sync + Debug {
    /// Take one sample of the resource's attributes.
    async fn sample(&self) -> Result<AttributeSnapshot, ConnectorError>;

    /// Returns a human-readable description of the connector.
    fn description(&self) -> &str;
}
