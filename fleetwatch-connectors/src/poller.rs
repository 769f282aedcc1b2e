//! Periodic sampling of bound connectors into a HealthEngine.

use std::sync::Arc;
use std::time::Duration;

use fleetwatch_engine::HealthEngine;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::{ConnectorError, ResourceConnector};

#[derive(Debug, Clone)]
struct Binding {
    group: String,
    resource: String,
    connector: Arc<dyn ResourceConnector>,
}

/// Outcome counts of one poll round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Samples delivered as attribute updates.
    pub sampled: usize,
    /// Resources reported unavailable (connector error or timeout).
    pub unavailable: usize,
    /// Results the engine refused, e.g. because the group is not registered.
    pub rejected: usize,
}

/// Samples every bound connector and feeds the engine.
///
/// A successful sample becomes `update_status(group, resource, snapshot)`; a
/// failed or timed-out sample becomes `mark_unavailable(group, resource, cause)`.
/// Connectors of one round are sampled concurrently.
#[derive(Debug, Clone)]
pub struct Poller {
    engine: Arc<HealthEngine>,
    bindings: Vec<Binding>,
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    /// Create a poller with a 1 second interval and a 5 second sample timeout.
    pub fn new(engine: Arc<HealthEngine>) -> Self {
        Self {
            engine,
            bindings: Vec::new(),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Maximum time a single `sample()` may take before the resource is
    /// reported unavailable.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sample `connector` as `resource` of `group`.
    pub fn bind(
        mut self,
        group: impl Into<String>,
        resource: impl Into<String>,
        connector: Arc<dyn ResourceConnector>,
    ) -> Self {
        self.bindings.push(Binding {
            group: group.into(),
            resource: resource.into(),
            connector,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run one round over every binding.
    pub async fn poll_once(&self) -> PollSummary {
        let mut tasks = JoinSet::new();
        for binding in &self.bindings {
            let binding = binding.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let result = match tokio::time::timeout(timeout, binding.connector.sample()).await {
                    Ok(result) => result,
                    Err(_) => Err(ConnectorError::Timeout(timeout)),
                };
                (binding, result)
            });
        }

        let mut summary = PollSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (binding, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Connector task failed");
                    summary.rejected += 1;
                    continue;
                }
            };
            self.apply(&binding, result, &mut summary);
        }
        debug!(
            sampled = summary.sampled,
            unavailable = summary.unavailable,
            rejected = summary.rejected,
            "Poll round complete"
        );
        summary
    }

    fn apply(
        &self,
        binding: &Binding,
        result: Result<fleetwatch_types::AttributeSnapshot, ConnectorError>,
        summary: &mut PollSummary,
    ) {
        let outcome = match result {
            Ok(snapshot) => {
                summary.sampled += 1;
                self.engine
                    .update_status(&binding.group, &binding.resource, &snapshot)
                    .map(|_| ())
            }
            Err(e) => {
                summary.unavailable += 1;
                warn!(
                    group = %binding.group,
                    resource = %binding.resource,
                    connector = %binding.connector.description(),
                    error = %e,
                    "Sampling failed"
                );
                self.engine
                    .mark_unavailable(&binding.group, &binding.resource, e.to_string())
            }
        };
        if let Err(e) = outcome {
            summary.rejected += 1;
            warn!(group = %binding.group, resource = %binding.resource, error = %e, "Engine rejected sample");
        }
    }

    /// Start polling in the background.
    ///
    /// This spawns a tokio task that runs a round every `interval`, starting
    /// immediately. Returns a handle that can be used to stop it.
    pub fn start(&self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let poller = self.clone();

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(poller.interval);
            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        poller.poll_once().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Poller stopped");
        });

        PollerHandle { stop_tx, task }
    }
}

/// Handle for controlling background polling.
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop background polling. The current round, if any, is not interrupted.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop background polling and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}
