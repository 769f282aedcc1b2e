//! Delivery of status transitions to triggers.
//!
//! Two modes are supported. `Inline` runs the trigger on a mutating thread
//! of the group once its state lock is released; a mutation never waits for
//! another thread's trigger. `Worker` hands the
//! transition to a bounded queue drained by a dedicated thread, so a hung
//! trigger can never stall telemetry ingestion.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::trigger::{HealthStatusTrigger, StatusTransition};

fn default_queue_capacity() -> usize {
    256
}

/// How triggers are invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DispatchMode {
    /// On the mutating thread, after the state lock is released.
    #[default]
    Inline,
    /// On a dedicated thread fed by a bounded queue. Overflow is dropped.
    Worker {
        #[serde(default = "default_queue_capacity")]
        queue_capacity: usize,
    },
}

struct Job {
    trigger: Arc<dyn HealthStatusTrigger>,
    transition: StatusTransition,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Invokes triggers according to a [`DispatchMode`] and counts outcomes.
///
/// One dispatcher is shared by every watcher of an engine.
pub struct TriggerDispatcher {
    queue: Option<mpsc::Sender<Job>>,
    counters: Arc<Counters>,
}

impl TriggerDispatcher {
    /// Create a dispatcher. `Worker` mode spawns the `fleetwatch-triggers` thread,
    /// which exits once the dispatcher is dropped.
    pub fn new(mode: DispatchMode) -> Result<Self> {
        let counters = Arc::new(Counters::default());
        let queue = match mode {
            DispatchMode::Inline => None,
            DispatchMode::Worker { queue_capacity } => {
                if queue_capacity == 0 {
                    return Err(EngineError::InvalidCapacity {
                        what: "trigger queue",
                    });
                }
                let (tx, mut rx) = mpsc::channel::<Job>(queue_capacity);
                let worker_counters = counters.clone();
                thread::Builder::new()
                    .name("fleetwatch-triggers".to_string())
                    .spawn(move || {
                        while let Some(job) = rx.blocking_recv() {
                            invoke_guarded(&worker_counters, job.trigger.as_ref(), &job.transition);
                        }
                        debug!("Trigger worker stopped");
                    })?;
                Some(tx)
            }
        };
        Ok(Self { queue, counters })
    }

    /// A dispatcher running every trigger inline.
    pub fn inline() -> Self {
        Self {
            queue: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn is_inline(&self) -> bool {
        self.queue.is_none()
    }

    /// Triggers that completed successfully.
    pub fn delivered(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    /// Triggers that returned an error or panicked.
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Transitions discarded because the worker queue was full.
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Transitions queued for the worker but not yet handled.
    pub fn pending(&self) -> u64 {
        let enqueued = self.counters.enqueued.load(Ordering::Acquire);
        enqueued.saturating_sub(self.delivered() + self.failed())
    }

    /// Run `trigger` on the current thread.
    pub(crate) fn invoke(&self, trigger: &dyn HealthStatusTrigger, transition: &StatusTransition) {
        invoke_guarded(&self.counters, trigger, transition);
    }

    /// Queue `transition` for the worker, or run it inline when there is none.
    ///
    /// Never blocks on a full queue.
    pub(crate) fn enqueue(&self, trigger: Arc<dyn HealthStatusTrigger>, transition: StatusTransition) {
        let Some(queue) = &self.queue else {
            self.invoke(trigger.as_ref(), &transition);
            return;
        };
        let group = transition.group_name.clone();
        match queue.try_send(Job { trigger, transition }) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::AcqRel);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(group = %group, "Trigger queue full, dropping status transition");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(group = %group, "Trigger worker gone, dropping status transition");
            }
        }
    }
}

impl Default for TriggerDispatcher {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Debug for TriggerDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerDispatcher")
            .field("inline", &self.is_inline())
            .field("delivered", &self.delivered())
            .field("failed", &self.failed())
            .field("dropped", &self.dropped())
            .finish()
    }
}

fn invoke_guarded(counters: &Counters, trigger: &dyn HealthStatusTrigger, transition: &StatusTransition) {
    match catch_unwind(AssertUnwindSafe(|| trigger.status_changed(transition))) {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Release);
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Release);
            warn!(
                group = %transition.group_name,
                previous = %transition.previous,
                current = %transition.current,
                error = %e,
                "Trigger failed, notification lost"
            );
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Release);
            warn!(
                group = %transition.group_name,
                previous = %transition.previous,
                current = %transition.current,
                "Trigger panicked, notification lost"
            );
        }
    }
}
