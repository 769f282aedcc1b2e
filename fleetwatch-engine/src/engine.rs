//! The HealthEngine facade tying topology and health together.

use std::sync::Arc;

use fleetwatch_types::{AttributeSnapshot, EngineReport, ResourceHealthStatus, Span};
use serde::{Deserialize, Serialize};

use crate::dispatch::{DispatchMode, TriggerDispatcher};
use crate::error::Result;
use crate::graph::{ComponentVertex, GraphOfComponents};
use crate::registry::WatcherRegistry;
use crate::watcher::{GroupWatcher, GroupWatcherBuilder};

const DEFAULT_GRAPH_CAPACITY: usize = 10_000;

fn default_graph_capacity() -> usize {
    DEFAULT_GRAPH_CAPACITY
}

/// Engine sizing and dispatch settings, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_graph_capacity")]
    pub graph_capacity: usize,
    /// Defaults to `graph_capacity`.
    #[serde(default)]
    pub span_index_capacity: Option<usize>,
    #[serde(default)]
    pub dispatch: DispatchMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            graph_capacity: DEFAULT_GRAPH_CAPACITY,
            span_index_capacity: None,
            dispatch: DispatchMode::default(),
        }
    }
}

/// One process-local view of component topology and group health.
///
/// Spans feed the [`GraphOfComponents`]; attribute snapshots and connector
/// failures feed the [`GroupWatcher`] of their group. Both sides can be
/// driven concurrently from any number of threads.
///
/// # Example
///
/// ```rust
/// use fleetwatch_engine::{GroupWatcher, HealthEngine, LogTrigger, Predicate, TieredChecker};
/// use fleetwatch_types::{AttributeSnapshot, AttributeValue, HealthStatus, Span};
///
/// let engine = HealthEngine::builder().graph_capacity(1_000).build().unwrap();
///
/// engine.register_group(
///     GroupWatcher::builder("web")
///         .checker("latency", TieredChecker::colored(Predicate::less_than(1000.0), None))
///         .trigger(LogTrigger),
/// ).unwrap();
///
/// let mut snapshot = AttributeSnapshot::new();
/// snapshot.insert("latency".into(), AttributeValue::Int(2500));
/// engine.update_status("web", "web-1", &snapshot).unwrap();
/// assert_eq!(engine.get_status("web").unwrap().status, HealthStatus::Malfunction);
///
/// engine.accept(&Span::builder("gateway", "gw-1", "trace-1", "1").build()).unwrap();
/// engine.accept(&Span::builder("orders", "orders-1", "trace-1", "2").parent("1").build()).unwrap();
/// assert!(engine.component("gateway").unwrap().contains("orders"));
/// ```
#[derive(Debug)]
pub struct HealthEngine {
    graph: GraphOfComponents,
    registry: WatcherRegistry,
    dispatcher: Arc<TriggerDispatcher>,
}

impl HealthEngine {
    pub fn builder() -> HealthEngineBuilder {
        HealthEngineBuilder::new()
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .graph_capacity(config.graph_capacity)
            .dispatch(config.dispatch);
        if let Some(capacity) = config.span_index_capacity {
            builder = builder.span_index_capacity(capacity);
        }
        builder.build()
    }

    /// Record a span in the topology graph.
    pub fn accept(&self, span: &Span) -> Result<()> {
        self.graph.accept(span)
    }

    pub fn graph(&self) -> &GraphOfComponents {
        &self.graph
    }

    pub fn component(&self, name: &str) -> Option<ComponentVertex> {
        self.graph.get(name)
    }

    /// Build a watcher sharing this engine's trigger dispatcher and register it.
    pub fn register_group(&self, builder: GroupWatcherBuilder) -> Result<Arc<GroupWatcher>> {
        let watcher = builder.build_with(self.dispatcher.clone())?;
        let watcher = self.registry.register(watcher)?;
        tracing::debug!(group = %watcher.name(), "Registered group");
        Ok(watcher)
    }

    pub fn group(&self, name: &str) -> Option<Arc<GroupWatcher>> {
        self.registry.get(name)
    }

    pub fn unregister_group(&self, name: &str) -> bool {
        self.registry.unregister(name).is_some()
    }

    pub fn groups(&self) -> &WatcherRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &TriggerDispatcher {
        &self.dispatcher
    }

    pub fn update_status(
        &self,
        group: &str,
        resource: &str,
        snapshot: &AttributeSnapshot,
    ) -> Result<ResourceHealthStatus> {
        self.registry.require(group)?.update_status(resource, snapshot)
    }

    pub fn mark_unavailable(&self, group: &str, resource: &str, cause: impl Into<String>) -> Result<()> {
        self.registry.require(group)?.mark_unavailable(resource, cause)
    }

    pub fn remove_resource(&self, group: &str, resource: &str) -> Result<bool> {
        Ok(self.registry.require(group)?.remove_resource(resource))
    }

    pub fn get_status(&self, group: &str) -> Result<ResourceHealthStatus> {
        Ok(self.registry.require(group)?.get_status())
    }

    /// Snapshot of every group and the whole topology.
    ///
    /// Each group is internally consistent; groups are not captured atomically
    /// with respect to each other.
    pub fn report(&self) -> EngineReport {
        let mut builder = EngineReport::builder();
        for watcher in self.registry.watchers() {
            let group = watcher.report();
            builder = builder.group(watcher.name(), group.status, group.root_cause, group.resources);
        }
        for (name, component) in self.graph.report() {
            builder = builder.component(name, component);
        }
        builder.build()
    }
}

/// Builder for a [`HealthEngine`].
#[derive(Debug, Default)]
pub struct HealthEngineBuilder {
    graph_capacity: Option<usize>,
    span_index_capacity: Option<usize>,
    dispatch: DispatchMode,
}

impl HealthEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of components. Defaults to 10,000.
    pub fn graph_capacity(mut self, capacity: usize) -> Self {
        self.graph_capacity = Some(capacity);
        self
    }

    /// Maximum number of remembered spans. Defaults to the graph capacity.
    pub fn span_index_capacity(mut self, capacity: usize) -> Self {
        self.span_index_capacity = Some(capacity);
        self
    }

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    pub fn build(self) -> Result<HealthEngine> {
        let graph_capacity = self.graph_capacity.unwrap_or(DEFAULT_GRAPH_CAPACITY);
        let span_index_capacity = self.span_index_capacity.unwrap_or(graph_capacity);
        Ok(HealthEngine {
            graph: GraphOfComponents::with_capacities(graph_capacity, span_index_capacity)?,
            registry: WatcherRegistry::new(),
            dispatcher: Arc::new(TriggerDispatcher::new(self.dispatch)?),
        })
    }
}
