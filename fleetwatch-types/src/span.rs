//! Spans - one observed unit of work in a distributed trace.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::time::Duration;

/// One recorded unit of work with an optional causal link to its parent.
///
/// Spans are immutable once built. `span_id` is unique within the trace
/// identified by `correlation_id`.
///
/// # Example
///
/// ```rust
/// use fleetwatch_types::Span;
/// use std::time::Duration;
///
/// let root = Span::builder("gateway", "gateway-0", "trace-42", "a").build();
/// let child = Span::builder("orders", "orders-3", "trace-42", "b")
///     .parent("a")
///     .module("orders.api")
///     .duration(Duration::from_millis(12))
///     .build();
///
/// assert!(root.is_root());
/// assert_eq!(child.parent_span_id.as_deref(), Some("a"));
/// assert_eq!(child.duration(), Duration::from_millis(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// Logical service identity.
    pub component_name: String,
    /// Physical instance of the component that produced the span.
    pub instance_name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub module_name: Option<String>,
    /// Groups all spans of one trace.
    pub correlation_id: String,
    pub span_id: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub parent_span_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration_micros: u64,
    /// Milliseconds since the Unix epoch.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timestamp_ms: u64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    pub annotations: BTreeMap<String, String>,
}

impl Span {
    /// Start building a span with its mandatory identifiers.
    pub fn builder(
        component_name: impl Into<String>,
        instance_name: impl Into<String>,
        correlation_id: impl Into<String>,
        span_id: impl Into<String>,
    ) -> SpanBuilder {
        SpanBuilder {
            span: Span {
                component_name: component_name.into(),
                instance_name: instance_name.into(),
                module_name: None,
                correlation_id: correlation_id.into(),
                span_id: span_id.into(),
                parent_span_id: None,
                duration_micros: 0,
                timestamp_ms: 0,
                annotations: BTreeMap::new(),
            },
        }
    }

    /// True if the span has no parent, i.e. it starts a trace.
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.duration_micros)
    }
}

/// Builder for [`Span`].
#[derive(Debug, Clone)]
pub struct SpanBuilder {
    span: Span,
}

impl SpanBuilder {
    pub fn parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.span.parent_span_id = Some(parent_span_id.into());
        self
    }

    pub fn module(mut self, module_name: impl Into<String>) -> Self {
        self.span.module_name = Some(module_name.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.span.duration_micros = duration.as_micros() as u64;
        self
    }

    pub fn duration_micros(mut self, micros: u64) -> Self {
        self.span.duration_micros = micros;
        self
    }

    /// Set the start timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.span.timestamp_ms = ts;
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.span.annotations.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let span = Span::builder("svc", "svc-1", "t", "s").build();
        assert!(span.is_root());
        assert_eq!(span.module_name, None);
        assert_eq!(span.duration_micros, 0);
        assert!(span.annotations.is_empty());
    }

    #[test]
    fn builder_sets_everything() {
        let span = Span::builder("svc", "svc-1", "t", "s")
            .parent("p")
            .module("svc.db")
            .duration_micros(1_500)
            .timestamp_ms(1_703_160_000_000)
            .annotation("peer", "db-1")
            .build();

        assert!(!span.is_root());
        assert_eq!(span.module_name.as_deref(), Some("svc.db"));
        assert_eq!(span.duration(), Duration::from_micros(1_500));
        assert_eq!(span.timestamp_ms, 1_703_160_000_000);
        assert_eq!(span.annotations.get("peer").map(String::as_str), Some("db-1"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_with_optional_fields_missing() {
        let json = r#"{
            "component_name": "orders",
            "instance_name": "orders-1",
            "correlation_id": "t1",
            "span_id": "s2",
            "parent_span_id": "s1"
        }"#;
        let span: Span = serde_json::from_str(json).unwrap();
        assert_eq!(span.parent_span_id.as_deref(), Some("s1"));
        assert_eq!(span.duration_micros, 0);
        assert!(span.annotations.is_empty());
    }
}
