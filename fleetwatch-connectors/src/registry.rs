//! Named connector factories.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use fleetwatch_types::AttributeSnapshot;
use serde::{Deserialize, Serialize};

use crate::{ConnectorError, FileConnector, ResourceConnector, StaticConnector};

/// Builds a connector for a resource from free-form options.
pub type ConnectorFactory = Arc<
    dyn Fn(&str, &serde_json::Value) -> Result<Arc<dyn ResourceConnector>, ConnectorError>
        + Send
        + Sync,
>;

/// Connector configuration of one resource.
///
/// ```toml
/// [groups.web.resources.web-1]
/// kind = "file"
/// options = { path = "web-1.json" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub kind: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Maps connector kinds to factories.
///
/// Registries are plain values handed to whoever builds connectors; custom
/// kinds are added with [`register`](Self::register).
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    factories: BTreeMap<String, ConnectorFactory>,
}

#[derive(Deserialize)]
struct FileOptions {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticOptions {
    #[serde(default)]
    attributes: AttributeSnapshot,
    #[serde(default)]
    unavailable: Option<String>,
}

fn options<T: for<'de> Deserialize<'de>>(kind: &str, value: &serde_json::Value) -> Result<T, ConnectorError> {
    let value = if value.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        value.clone()
    };
    serde_json::from_value(value).map_err(|e| ConnectorError::InvalidOptions {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

impl ConnectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `file` and `static` kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("file", |_resource: &str, value: &serde_json::Value| {
            let opts: FileOptions = options("file", value)?;
            Ok(Arc::new(FileConnector::new(opts.path)) as Arc<dyn ResourceConnector>)
        });
        registry.register("static", |_resource: &str, value: &serde_json::Value| {
            let opts: StaticOptions = options("static", value)?;
            let connector = match opts.unavailable {
                Some(cause) => StaticConnector::unavailable(cause),
                None => StaticConnector::new(opts.attributes),
            };
            Ok(Arc::new(connector) as Arc<dyn ResourceConnector>)
        });
        registry
    }

    /// Add or replace the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &serde_json::Value) -> Result<Arc<dyn ResourceConnector>, ConnectorError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Build the connector for `resource`.
    pub fn create(
        &self,
        resource: &str,
        spec: &ConnectorSpec,
    ) -> Result<Arc<dyn ResourceConnector>, ConnectorError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| ConnectorError::UnknownKind(spec.kind.clone()))?;
        factory(resource, &spec.options)
    }

    pub fn kinds(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::AttributeValue;
    use serde_json::json;

    fn spec(kind: &str, options: serde_json::Value) -> ConnectorSpec {
        ConnectorSpec {
            kind: kind.to_string(),
            options,
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ConnectorRegistry::with_builtins();
        assert_eq!(registry.kinds(), vec!["file".to_string(), "static".to_string()]);
    }

    #[tokio::test]
    async fn creates_static_connectors() {
        let registry = ConnectorRegistry::with_builtins();
        let up = registry
            .create("r", &spec("static", json!({ "attributes": { "load": 3 } })))
            .unwrap();
        assert_eq!(up.sample().await.unwrap()["load"], AttributeValue::Int(3));

        let down = registry
            .create("r", &spec("static", json!({ "unavailable": "powered off" })))
            .unwrap();
        assert!(down.sample().await.is_err());
    }

    #[test]
    fn creates_file_connectors() {
        let registry = ConnectorRegistry::with_builtins();
        let connector = registry
            .create("r", &spec("file", json!({ "path": "status/r.json" })))
            .unwrap();
        assert_eq!(connector.description(), "file: status/r.json");
    }

    #[test]
    fn rejects_bad_specs() {
        let registry = ConnectorRegistry::with_builtins();
        assert!(matches!(
            registry.create("r", &spec("snmp", serde_json::Value::Null)),
            Err(ConnectorError::UnknownKind(kind)) if kind == "snmp"
        ));
        assert!(matches!(
            registry.create("r", &spec("file", serde_json::Value::Null)),
            Err(ConnectorError::InvalidOptions { .. })
        ));
    }

    #[tokio::test]
    async fn custom_kinds_can_be_added() {
        let mut registry = ConnectorRegistry::new();
        registry.register("probe", |resource: &str, _: &serde_json::Value| {
            let mut snapshot = AttributeSnapshot::new();
            snapshot.insert("name".into(), AttributeValue::from(resource));
            Ok(Arc::new(StaticConnector::new(snapshot)) as Arc<dyn ResourceConnector>)
        });

        let connector = registry.create("db-1", &spec("probe", json!({}))).unwrap();
        assert_eq!(
            connector.sample().await.unwrap()["name"],
            AttributeValue::from("db-1")
        );
    }
}
