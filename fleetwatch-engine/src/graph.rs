//! Component call graph built from trace spans.
//!
//! Every span names the component that produced it. When a span's parent
//! can be resolved, the parent's component is recorded as calling the
//! span's component. Parents are resolved through a bounded span index, so
//! arbitrarily delayed children still link up as long as their parent's
//! entry has not been evicted.

use std::collections::{BTreeMap, BTreeSet};

use fleetwatch_types::{ComponentReport, Span};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::bounded::BoundedMap;
use crate::error::{require_non_empty, EngineError, Result};

/// A logical component and the components it was observed calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVertex {
    name: String,
    adjacent: BTreeSet<String>,
    instances: BTreeSet<String>,
    modules: BTreeSet<String>,
}

impl ComponentVertex {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            adjacent: BTreeSet::new(),
            instances: BTreeSet::new(),
            modules: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this component was observed calling `component`.
    pub fn contains(&self, component: &str) -> bool {
        self.adjacent.contains(component)
    }

    /// Components called by this component, in name order.
    pub fn adjacent(&self) -> impl Iterator<Item = &str> {
        self.adjacent.iter().map(String::as_str)
    }

    pub fn adjacent_len(&self) -> usize {
        self.adjacent.len()
    }

    /// Instance names seen in spans of this component.
    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn to_report(&self) -> ComponentReport {
        ComponentReport {
            calls: self.adjacent.clone(),
            instances: self.instances.clone(),
            modules: self.modules.clone(),
        }
    }

    fn record(&mut self, span: &Span) {
        if !self.instances.contains(&span.instance_name) {
            self.instances.insert(span.instance_name.clone());
        }
        if let Some(module) = &span.module_name {
            if !self.modules.contains(module) {
                self.modules.insert(module.clone());
            }
        }
    }
}

/// Span identity; span IDs are only unique within one trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SpanKey {
    correlation_id: String,
    span_id: String,
}

impl SpanKey {
    fn new(correlation_id: &str, span_id: &str) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            span_id: span_id.to_string(),
        }
    }
}

#[derive(Debug)]
struct GraphInner {
    vertices: BoundedMap<String, ComponentVertex>,
    span_index: BoundedMap<SpanKey, String>,
}

impl GraphInner {
    fn ensure_vertex(&mut self, name: &str) {
        let evicted = self
            .vertices
            .insert_if_absent(name.to_string(), || ComponentVertex::new(name));
        self.forget_evicted(evicted);
    }

    /// Drop every edge that points at a vertex that just left the map.
    fn forget_evicted(&mut self, evicted: Vec<(String, ComponentVertex)>) {
        for (name, _) in evicted {
            debug!(component = %name, "Evicted component vertex");
            self.detach(&name);
        }
    }

    fn detach(&mut self, name: &str) {
        for vertex in self.vertices.values_mut() {
            vertex.adjacent.remove(name);
        }
    }

    fn link(&mut self, parent: &str, child: &str) {
        self.ensure_vertex(parent);
        // Re-creating the parent can evict the child when capacity is tiny.
        if !self.vertices.contains_key(child) {
            return;
        }
        if let Some(vertex) = self.vertices.get_mut(parent) {
            if !vertex.adjacent.contains(child) {
                vertex.adjacent.insert(child.to_string());
                trace!(parent = %parent, child = %child, "Recorded call edge");
            }
        }
    }
}

/// A bounded, thread-safe directed graph of component calls.
///
/// Both the vertex map and the internal span index evict their oldest
/// entries once their capacity is exceeded. Evicting or removing a vertex
/// also removes it from every other vertex's adjacency set, so the graph
/// never holds an edge to a missing vertex.
///
/// # Example
///
/// ```rust
/// use fleetwatch_engine::GraphOfComponents;
/// use fleetwatch_types::Span;
///
/// let graph = GraphOfComponents::new(1024).unwrap();
/// graph.accept(&Span::builder("gateway", "gw-0", "t1", "a").build()).unwrap();
/// graph.accept(&Span::builder("orders", "orders-1", "t1", "b").parent("a").build()).unwrap();
///
/// assert!(graph.get("gateway").unwrap().contains("orders"));
/// assert!(!graph.get("orders").unwrap().contains("gateway"));
/// ```
#[derive(Debug)]
pub struct GraphOfComponents {
    inner: Mutex<GraphInner>,
}

impl GraphOfComponents {
    /// Create a graph whose vertex map and span index both hold `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_capacities(capacity, capacity)
    }

    /// Create a graph with independent vertex and span index capacities.
    pub fn with_capacities(vertex_capacity: usize, span_index_capacity: usize) -> Result<Self> {
        if vertex_capacity == 0 {
            return Err(EngineError::InvalidCapacity {
                what: "component vertices",
            });
        }
        if span_index_capacity == 0 {
            return Err(EngineError::InvalidCapacity { what: "span index" });
        }
        Ok(Self {
            inner: Mutex::new(GraphInner {
                vertices: BoundedMap::new(vertex_capacity),
                span_index: BoundedMap::new(span_index_capacity),
            }),
        })
    }

    /// Record a span.
    ///
    /// A span whose parent cannot be resolved (never seen, or evicted from
    /// the span index) is recorded like a trace root: its component vertex
    /// exists but no edge is added.
    pub fn accept(&self, span: &Span) -> Result<()> {
        require_non_empty(&span.component_name, "span component name")?;
        require_non_empty(&span.span_id, "span id")?;

        let mut inner = self.inner.lock();

        let parent_component = match &span.parent_span_id {
            Some(parent_id) => {
                let key = SpanKey::new(&span.correlation_id, parent_id);
                let resolved = inner.span_index.get(&key).cloned();
                if resolved.is_none() {
                    debug!(
                        correlation_id = %span.correlation_id,
                        span_id = %span.span_id,
                        parent_span_id = %parent_id,
                        "Parent span not resolvable, recording span without edge"
                    );
                }
                resolved
            }
            None => None,
        };

        inner.ensure_vertex(&span.component_name);
        if let Some(vertex) = inner.vertices.get_mut(&span.component_name) {
            vertex.record(span);
        }

        if let Some(parent) = parent_component {
            if parent != span.component_name {
                inner.link(&parent, &span.component_name);
            }
        }

        let dropped = inner.span_index.insert(
            SpanKey::new(&span.correlation_id, &span.span_id),
            span.component_name.clone(),
        );
        if !dropped.is_empty() {
            trace!(count = dropped.len(), "Evicted span index entries");
        }

        Ok(())
    }

    /// A copy of the vertex for `component`.
    pub fn get(&self, component: &str) -> Option<ComponentVertex> {
        self.inner.lock().vertices.get(component).cloned()
    }

    pub fn contains(&self, component: &str) -> bool {
        self.inner.lock().vertices.contains_key(component)
    }

    /// Number of component vertices.
    pub fn size(&self) -> usize {
        self.inner.lock().vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Consistent copy of all vertices, oldest first.
    pub fn values(&self) -> Vec<ComponentVertex> {
        self.inner
            .lock()
            .vertices
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Components observed calling `component`.
    pub fn callers(&self, component: &str) -> Vec<String> {
        self.inner
            .lock()
            .vertices
            .iter()
            .filter(|(_, v)| v.contains(component))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Remove a vertex and every edge pointing at it.
    pub fn remove(&self, component: &str) -> Option<ComponentVertex> {
        let mut inner = self.inner.lock();
        let removed = inner.vertices.remove(component)?;
        inner.detach(component);
        Some(removed)
    }

    /// Remove all vertices and forget every indexed span.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.vertices.clear();
        inner.span_index.clear();
    }

    /// Number of spans currently resolvable as parents.
    pub fn span_index_len(&self) -> usize {
        self.inner.lock().span_index.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().vertices.capacity()
    }

    /// Export all vertices keyed by component name.
    pub fn report(&self) -> BTreeMap<String, ComponentReport> {
        self.inner
            .lock()
            .vertices
            .iter()
            .map(|(name, v)| (name.clone(), v.to_report()))
            .collect()
    }
}
