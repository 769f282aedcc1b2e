//! EngineReport - a point-in-time export of group health and component topology.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;

use crate::{HealthStatus, ResourceHealthStatus, REPORT_VERSION};

/// Health of one group as exported in a report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupReport {
    /// Join of all resource statuses.
    pub status: HealthStatus,
    /// The most severe contributing resource.
    pub root_cause: ResourceHealthStatus,
    /// Every tracked resource, keyed by resource name.
    pub resources: BTreeMap<String, ResourceHealthStatus>,
}

/// One component of the topology graph as exported in a report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentReport {
    /// Components this component was observed calling.
    pub calls: BTreeSet<String>,
    pub instances: BTreeSet<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeSet::is_empty"))]
    pub modules: BTreeSet<String>,
}

/// A point-in-time report of everything the engine knows.
///
/// Reports are what dashboards and alert gateways consume; the CLI writes
/// one as pretty-printed JSON with `--export`.
///
/// # Example
///
/// ```rust
/// use fleetwatch_types::{ComponentReport, EngineReport, HealthStatus, ResourceHealthStatus};
/// use std::collections::BTreeMap;
///
/// let report = EngineReport::builder()
///     .timestamp_ms(1_703_160_000_000)
///     .group("web", HealthStatus::Ok, ResourceHealthStatus::ok("web"), BTreeMap::new())
///     .component("gateway", ComponentReport::default())
///     .build();
///
/// assert_eq!(report.groups.len(), 1);
/// assert_eq!(report.worst_status(), HealthStatus::Ok);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineReport {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// Unix timestamp in milliseconds when this report was taken.
    pub timestamp_ms: u64,
    pub groups: BTreeMap<String, GroupReport>,
    pub components: BTreeMap<String, ComponentReport>,
}

impl EngineReport {
    pub fn builder() -> EngineReportBuilder {
        EngineReportBuilder::new()
    }

    /// Check if this report was written with a compatible schema.
    pub fn is_compatible(&self) -> bool {
        self.version == REPORT_VERSION
    }

    /// Worst status over all groups; `Ok` if there are none.
    pub fn worst_status(&self) -> HealthStatus {
        HealthStatus::join_all(self.groups.values().map(|g| g.status))
    }

    /// Names of groups whose status is `Malfunction`.
    pub fn critical_groups(&self) -> impl Iterator<Item = &String> {
        self.groups
            .iter()
            .filter(|(_, g)| g.status.is_critical())
            .map(|(name, _)| name)
    }

    /// Total number of directed call edges.
    pub fn edge_count(&self) -> usize {
        self.components.values().map(|c| c.calls.len()).sum()
    }
}

/// Builder for [`EngineReport`].
#[derive(Debug, Default)]
pub struct EngineReportBuilder {
    timestamp_ms: Option<u64>,
    groups: BTreeMap<String, GroupReport>,
    components: BTreeMap<String, ComponentReport>,
}

impl EngineReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    pub fn group(
        mut self,
        name: impl Into<String>,
        status: HealthStatus,
        root_cause: ResourceHealthStatus,
        resources: BTreeMap<String, ResourceHealthStatus>,
    ) -> Self {
        self.groups.insert(
            name.into(),
            GroupReport {
                status,
                root_cause,
                resources,
            },
        );
        self
    }

    pub fn component(mut self, name: impl Into<String>, component: ComponentReport) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    #[cfg(feature = "std")]
    pub fn build(self) -> EngineReport {
        EngineReport {
            version: REPORT_VERSION,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(current_timestamp_ms),
            groups: self.groups,
            components: self.components,
        }
    }

    /// Build the report with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> EngineReport {
        EngineReport {
            version: REPORT_VERSION,
            timestamp_ms: self.timestamp_ms.unwrap_or(0),
            groups: self.groups,
            components: self.components,
        }
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeValue;

    fn degraded_group() -> (HealthStatus, ResourceHealthStatus, BTreeMap<String, ResourceHealthStatus>) {
        let bad = ResourceHealthStatus::invalid_attribute(
            "db-1",
            "connections",
            AttributeValue::Int(900),
            HealthStatus::Malfunction,
        );
        let mut resources = BTreeMap::new();
        resources.insert("db-1".into(), bad.clone());
        resources.insert("db-2".into(), ResourceHealthStatus::ok("db-2"));
        (HealthStatus::Malfunction, bad, resources)
    }

    #[test]
    fn builder_collects_groups_and_components() {
        let (status, cause, resources) = degraded_group();
        let mut gateway = ComponentReport::default();
        gateway.calls.insert("orders".into());
        gateway.calls.insert("users".into());

        let report = EngineReport::builder()
            .timestamp_ms(1_703_160_000_000)
            .group("db", status, cause, resources)
            .group("web", HealthStatus::Ok, ResourceHealthStatus::ok("web"), BTreeMap::new())
            .component("gateway", gateway)
            .component("orders", ComponentReport::default())
            .build();

        assert_eq!(report.timestamp_ms, 1_703_160_000_000);
        assert_eq!(report.worst_status(), HealthStatus::Malfunction);
        assert_eq!(report.critical_groups().collect::<alloc::vec::Vec<_>>(), ["db"]);
        assert_eq!(report.edge_count(), 2);
        assert!(report.is_compatible());
    }

    #[test]
    fn empty_report_is_ok() {
        let report = EngineReport::builder().build();
        assert_eq!(report.worst_status(), HealthStatus::Ok);
        assert_eq!(report.edge_count(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let (status, cause, resources) = degraded_group();
        let report = EngineReport::builder()
            .timestamp_ms(1_703_160_000_000)
            .group("db", status, cause, resources)
            .build();

        let json = serde_json::to_string(&report).unwrap();
        let parsed: EngineReport = serde_json::from_str(&json).unwrap();

        assert_eq!(report, parsed);
    }
}
