//! Health status triggers - callbacks fired when a group's verdict changes.

use std::sync::Arc;

use fleetwatch_types::{HealthStatus, ResourceHealthStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::TriggerError;

/// One change of a group's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub group_name: String,
    pub previous: HealthStatus,
    pub current: HealthStatus,
    /// Most severe resource at the time the transition was committed.
    pub root_cause: ResourceHealthStatus,
}

impl StatusTransition {
    /// True if the group got worse.
    pub fn is_degradation(&self) -> bool {
        self.current > self.previous
    }
}

/// Reacts to group status transitions.
///
/// Called at most once per distinct transition. Implementations may be slow
/// or fail; the watcher's state is already committed when this runs.
/// Closures `Fn(&StatusTransition)` implement this trait directly.
pub trait HealthStatusTrigger: Send + Sync {
    fn status_changed(&self, transition: &StatusTransition) -> Result<(), TriggerError>;
}

impl<F> HealthStatusTrigger for F
where
    F: Fn(&StatusTransition) + Send + Sync,
{
    fn status_changed(&self, transition: &StatusTransition) -> Result<(), TriggerError> {
        self(transition);
        Ok(())
    }
}

/// Does nothing. Used when a group has no trigger configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrigger;

impl HealthStatusTrigger for NoopTrigger {
    fn status_changed(&self, _transition: &StatusTransition) -> Result<(), TriggerError> {
        Ok(())
    }
}

/// Emits one tracing event per transition.
///
/// Degradations to `Malfunction` are logged at warn level, everything else
/// at info.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTrigger;

impl HealthStatusTrigger for LogTrigger {
    fn status_changed(&self, t: &StatusTransition) -> Result<(), TriggerError> {
        if t.current.is_critical() {
            warn!(
                group = %t.group_name,
                previous = %t.previous,
                current = %t.current,
                root_cause = %t.root_cause,
                "Group status changed"
            );
        } else {
            info!(
                group = %t.group_name,
                previous = %t.previous,
                current = %t.current,
                root_cause = %t.root_cause,
                "Group status changed"
            );
        }
        Ok(())
    }
}

/// Forwards transitions into a bounded tokio channel.
///
/// Delivery is best-effort: a full channel fails the notification instead of
/// blocking the caller.
///
/// # Example
///
/// ```rust
/// use fleetwatch_engine::ChannelTrigger;
///
/// let (trigger, mut rx) = ChannelTrigger::new(16);
///
/// // Later, receive transitions
/// // while let Some(transition) = rx.recv().await {
/// //     println!("{} is now {}", transition.group_name, transition.current);
/// // }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelTrigger {
    tx: mpsc::Sender<StatusTransition>,
}

impl ChannelTrigger {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<StatusTransition>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

impl HealthStatusTrigger for ChannelTrigger {
    fn status_changed(&self, transition: &StatusTransition) -> Result<(), TriggerError> {
        self.tx.try_send(transition.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TriggerError::Failed("transition channel is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                TriggerError::Closed("transition receiver dropped".to_string())
            }
        })
    }
}

/// Declarative trigger as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSpec {
    #[default]
    Log,
    None,
}

impl TriggerSpec {
    pub fn build(self) -> Arc<dyn HealthStatusTrigger> {
        match self {
            TriggerSpec::Log => Arc::new(LogTrigger),
            TriggerSpec::None => Arc::new(NoopTrigger),
        }
    }
}
