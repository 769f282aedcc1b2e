//! GroupWatcher - the health verdict of one named group of resources.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use fleetwatch_types::{
    AttributeSnapshot, AttributeValue, GroupReport, HealthStatus, ResourceHealthStatus,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::checker::{evaluate_guarded, AttributeChecker};
use crate::dispatch::TriggerDispatcher;
use crate::error::{require_non_empty, Result};
use crate::trigger::{HealthStatusTrigger, NoopTrigger, StatusTransition};

#[derive(Debug, Clone)]
struct Tracked {
    status: ResourceHealthStatus,
    /// Update sequence number; higher is more recent.
    seq: u64,
}

#[derive(Debug, Default)]
struct GroupState {
    resources: HashMap<String, Tracked>,
    /// Last status announced to the trigger.
    emitted: HealthStatus,
    next_seq: u64,
}

impl GroupState {
    fn store(&mut self, status: ResourceHealthStatus) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.resources
            .insert(status.resource_name.clone(), Tracked { status, seq });
    }

    fn join(&self) -> HealthStatus {
        HealthStatus::join_all(self.resources.values().map(|t| t.status.status))
    }

    /// Most severe resource, most recently updated among equals.
    fn root_cause(&self, group: &str) -> ResourceHealthStatus {
        self.resources
            .values()
            .max_by_key(|t| (t.status.status, t.seq))
            .map(|t| t.status.clone())
            .unwrap_or_else(|| ResourceHealthStatus::ok(group))
    }
}

/// Aggregates per-resource verdicts of one group and fires a trigger when the
/// group's status changes.
///
/// Mutations (`update_status`, `mark_unavailable`, `remove_resource`) are
/// linearizable. After each one the group status is recomputed as the join of
/// all resource statuses (`Ok` when empty); if it differs from the last
/// announced status the trigger receives exactly one [`StatusTransition`].
///
/// Triggers run after the new state is committed. With an inline dispatcher
/// each transition is queued in commit order under the state lock; once the
/// lock is released, whichever mutating thread holds the notification lock
/// delivers the queue. Other mutations never wait for a running trigger, and
/// a trigger may call back into its own watcher.
///
/// # Example
///
/// ```rust
/// use fleetwatch_engine::{GroupWatcher, Predicate, TieredChecker};
/// use fleetwatch_types::{AttributeSnapshot, AttributeValue, HealthStatus};
///
/// let watcher = GroupWatcher::builder("web")
///     .checker("latency", TieredChecker::colored(
///         Predicate::less_than(1000.0),
///         Some(Predicate::between(1000.0, 2000.0)),
///     ))
///     .build()
///     .unwrap();
///
/// let mut snapshot = AttributeSnapshot::new();
/// snapshot.insert("latency".into(), AttributeValue::Int(1500));
/// watcher.update_status("web-1", &snapshot).unwrap();
///
/// assert_eq!(watcher.status(), HealthStatus::Suspicious);
/// assert_eq!(watcher.get_status().attribute_name(), Some("latency"));
///
/// watcher.remove_resource("web-1");
/// assert_eq!(watcher.status(), HealthStatus::Ok);
/// ```
pub struct GroupWatcher {
    name: String,
    checkers: RwLock<BTreeMap<String, Arc<dyn AttributeChecker>>>,
    trigger: Arc<dyn HealthStatusTrigger>,
    dispatcher: Arc<TriggerDispatcher>,
    state: Mutex<GroupState>,
    /// Inline transitions not yet delivered, in commit order.
    pending: Mutex<VecDeque<StatusTransition>>,
    notify: Mutex<()>,
}

impl GroupWatcher {
    pub fn builder(name: impl Into<String>) -> GroupWatcherBuilder {
        GroupWatcherBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate `snapshot` for `resource` and store the verdict.
    ///
    /// Attributes without a checker are ignored. The worst attribute becomes
    /// the root cause; among equally bad attributes the first by name wins.
    /// Replaces any previous status of the resource, including unavailability.
    pub fn update_status(
        &self,
        resource: &str,
        snapshot: &AttributeSnapshot,
    ) -> Result<ResourceHealthStatus> {
        require_non_empty(resource, "resource name")?;
        let verdict = self.evaluate(resource, snapshot);
        self.commit(|state| state.store(verdict.clone()));
        Ok(verdict)
    }

    /// Record that `resource` could not be sampled. Always `Malfunction`.
    pub fn mark_unavailable(&self, resource: &str, cause: impl Into<String>) -> Result<()> {
        require_non_empty(resource, "resource name")?;
        let status = ResourceHealthStatus::unavailable(resource, cause);
        debug!(group = %self.name, resource = %resource, cause = %status, "Resource unavailable");
        self.commit(|state| state.store(status));
        Ok(())
    }

    /// Forget `resource`. Returns whether it was tracked.
    pub fn remove_resource(&self, resource: &str) -> bool {
        self.commit(|state| state.resources.remove(resource).is_some())
    }

    /// The most severe contributing resource status.
    ///
    /// Ties are broken by the most recent update. An empty group reports `Ok`
    /// under the group's own name.
    pub fn get_status(&self) -> ResourceHealthStatus {
        self.state.lock().root_cause(&self.name)
    }

    /// The group status: join of all resource statuses.
    pub fn status(&self) -> HealthStatus {
        self.state.lock().join()
    }

    /// Status of a single resource, if tracked.
    pub fn resource(&self, resource: &str) -> Option<ResourceHealthStatus> {
        self.state
            .lock()
            .resources
            .get(resource)
            .map(|t| t.status.clone())
    }

    /// Snapshot of every tracked resource.
    pub fn resources(&self) -> BTreeMap<String, ResourceHealthStatus> {
        self.state
            .lock()
            .resources
            .iter()
            .map(|(name, t)| (name.clone(), t.status.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consistent view of status, root cause and resources.
    pub fn report(&self) -> GroupReport {
        let state = self.state.lock();
        GroupReport {
            status: state.join(),
            root_cause: state.root_cause(&self.name),
            resources: state
                .resources
                .iter()
                .map(|(name, t)| (name.clone(), t.status.clone()))
                .collect(),
        }
    }

    /// Install or replace the checker for `attribute`.
    ///
    /// Applies to subsequent updates only; stored verdicts are not re-evaluated.
    pub fn set_checker(
        &self,
        attribute: impl Into<String>,
        checker: Arc<dyn AttributeChecker>,
    ) -> Result<()> {
        let attribute = attribute.into();
        require_non_empty(&attribute, "attribute name")?;
        self.checkers.write().insert(attribute, checker);
        Ok(())
    }

    pub fn remove_checker(&self, attribute: &str) -> bool {
        self.checkers.write().remove(attribute).is_some()
    }

    pub fn checker_names(&self) -> Vec<String> {
        self.checkers.read().keys().cloned().collect()
    }

    /// Runs outside the state lock; checkers may be slow.
    fn evaluate(&self, resource: &str, snapshot: &AttributeSnapshot) -> ResourceHealthStatus {
        let relevant: Vec<(&String, &AttributeValue, Arc<dyn AttributeChecker>)> = {
            let checkers = self.checkers.read();
            snapshot
                .iter()
                .filter_map(|(attr, value)| match checkers.get(attr) {
                    Some(checker) => Some((attr, value, checker.clone())),
                    None => {
                        trace!(group = %self.name, attribute = %attr, "No checker for attribute");
                        None
                    }
                })
                .collect()
        };

        let mut worst: Option<(&String, &AttributeValue, HealthStatus)> = None;
        for (attr, value, checker) in relevant {
            let Some(verdict) = evaluate_guarded(checker.as_ref(), attr, value) else {
                continue;
            };
            if verdict.is_ok() {
                continue;
            }
            if worst.map_or(true, |(_, _, w)| verdict > w) {
                worst = Some((attr, value, verdict));
            }
        }

        match worst {
            Some((attr, value, verdict)) => {
                ResourceHealthStatus::invalid_attribute(resource, attr.as_str(), value.clone(), verdict)
            }
            None => ResourceHealthStatus::ok(resource),
        }
    }

    /// Apply `mutate` under the state lock and announce a transition if the
    /// group status changed.
    fn commit<R>(&self, mutate: impl FnOnce(&mut GroupState) -> R) -> R {
        let mut state = self.state.lock();
        let result = mutate(&mut state);

        let current = state.join();
        if current == state.emitted {
            return result;
        }
        let transition = StatusTransition {
            group_name: self.name.clone(),
            previous: state.emitted,
            current,
            root_cause: state.root_cause(&self.name),
        };
        state.emitted = current;

        if self.dispatcher.is_inline() {
            self.pending.lock().push_back(transition);
            drop(state);
            self.deliver_pending();
        } else {
            self.dispatcher.enqueue(self.trigger.clone(), transition);
        }
        result
    }

    /// Deliver queued inline transitions unless another thread already is.
    fn deliver_pending(&self) {
        loop {
            let Some(delivering) = self.notify.try_lock() else {
                return;
            };
            loop {
                let next = self.pending.lock().pop_front();
                let Some(transition) = next else { break };
                self.dispatcher.invoke(self.trigger.as_ref(), &transition);
            }
            drop(delivering);

            // A transition queued between the last pop and the unlock is ours.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }
}

impl fmt::Debug for GroupWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupWatcher")
            .field("name", &self.name)
            .field("checkers", &self.checker_names())
            .field("resources", &self.len())
            .finish()
    }
}

/// Builder for a [`GroupWatcher`].
pub struct GroupWatcherBuilder {
    name: String,
    checkers: BTreeMap<String, Arc<dyn AttributeChecker>>,
    trigger: Option<Arc<dyn HealthStatusTrigger>>,
}

impl GroupWatcherBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            checkers: BTreeMap::new(),
            trigger: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checker(self, attribute: impl Into<String>, checker: impl AttributeChecker + 'static) -> Self {
        self.checker_arc(attribute, Arc::new(checker))
    }

    pub fn checker_arc(mut self, attribute: impl Into<String>, checker: Arc<dyn AttributeChecker>) -> Self {
        self.checkers.insert(attribute.into(), checker);
        self
    }

    /// Set the trigger. Defaults to a trigger that does nothing.
    pub fn trigger(self, trigger: impl HealthStatusTrigger + 'static) -> Self {
        self.trigger_arc(Arc::new(trigger))
    }

    pub fn trigger_arc(mut self, trigger: Arc<dyn HealthStatusTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Build a watcher that runs its trigger inline.
    pub fn build(self) -> Result<GroupWatcher> {
        self.build_with(Arc::new(TriggerDispatcher::inline()))
    }

    /// Build a watcher sharing `dispatcher` with other watchers.
    pub fn build_with(self, dispatcher: Arc<TriggerDispatcher>) -> Result<GroupWatcher> {
        require_non_empty(&self.name, "group name")?;
        for attribute in self.checkers.keys() {
            require_non_empty(attribute, "attribute name")?;
        }
        Ok(GroupWatcher {
            name: self.name,
            checkers: RwLock::new(self.checkers),
            trigger: self.trigger.unwrap_or_else(|| Arc::new(NoopTrigger)),
            dispatcher,
            state: Mutex::new(GroupState::default()),
            pending: Mutex::new(VecDeque::new()),
            notify: Mutex::new(()),
        })
    }
}
