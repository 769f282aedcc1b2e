//! Configuration loading and wiring of engine, groups and connectors.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use fleetwatch_connectors::{ConnectorRegistry, ConnectorSpec, Poller};
use fleetwatch_engine::{CheckerSpec, EngineConfig, GroupWatcher, HealthEngine, TriggerSpec};
use serde::Deserialize;
use tracing::info;

/// Prefix of environment variables overriding file settings,
/// e.g. `FLEETWATCH_ENGINE__GRAPH_CAPACITY=5000`.
pub const ENV_PREFIX: &str = "FLEETWATCH";

fn default_interval_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// One monitored group: its checkers, its trigger and the connectors of its resources.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroupSettings {
    #[serde(default)]
    pub checkers: BTreeMap<String, CheckerSpec>,
    #[serde(default)]
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub resources: BTreeMap<String, ConnectorSpec>,
}

/// Everything `fleetwatch` reads from its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupSettings>,
}

impl Settings {
    /// Load `path` (TOML, JSON or YAML by extension) with environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Self::environment())
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        config
            .try_deserialize()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse TOML text with environment overrides.
    pub fn from_toml(toml: &str) -> Result<Self> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Build the engine and register every configured group.
    pub fn build_engine(&self) -> Result<Arc<HealthEngine>> {
        let engine = HealthEngine::from_config(&self.engine).context("Failed to build engine")?;

        for (name, group) in &self.groups {
            let mut builder = GroupWatcher::builder(name.as_str()).trigger_arc(group.trigger.build());
            for (attribute, spec) in &group.checkers {
                let checker = spec
                    .compile(attribute)
                    .with_context(|| format!("Group '{}'", name))?;
                builder = builder.checker_arc(attribute.as_str(), checker);
            }
            engine
                .register_group(builder)
                .with_context(|| format!("Failed to register group '{}'", name))?;
            info!(
                group = %name,
                checkers = group.checkers.len(),
                resources = group.resources.len(),
                "Group configured"
            );
        }
        Ok(Arc::new(engine))
    }

    /// Bind every configured resource to a connector built from `registry`.
    pub fn build_poller(&self, engine: Arc<HealthEngine>, registry: &ConnectorRegistry) -> Result<Poller> {
        let mut poller = Poller::new(engine)
            .interval(Duration::from_millis(self.poll.interval_ms))
            .timeout(Duration::from_millis(self.poll.timeout_ms));

        for (group, settings) in &self.groups {
            for (resource, spec) in &settings.resources {
                let connector = registry
                    .create(resource, spec)
                    .with_context(|| format!("Resource '{}' of group '{}'", resource, group))?;
                poller = poller.bind(group.as_str(), resource.as_str(), connector);
            }
        }
        Ok(poller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_engine::{DispatchMode, Predicate};
    use fleetwatch_types::{AttributeSnapshot, AttributeValue, HealthStatus};
    use std::io::Write;

    const SAMPLE: &str = r#"
        [engine]
        graph_capacity = 500
        span_index_capacity = 2000

        [engine.dispatch]
        mode = "worker"
        queue_capacity = 32

        [poll]
        interval_ms = 250

        [groups.web.checkers.latency]
        kind = "colored"
        green = { type = "comparison", operator = "<", value = 1000 }
        yellow = { type = "range", lower = 1000, upper = 2000 }

        [groups.web.trigger]
        kind = "none"

        [groups.web.resources.web-1]
        kind = "static"
        options = { attributes = { latency = 1500 } }
    "#;

    #[test]
    fn parses_full_configuration() {
        let settings = Settings::from_toml(SAMPLE).unwrap();

        assert_eq!(settings.engine.graph_capacity, 500);
        assert_eq!(settings.engine.span_index_capacity, Some(2000));
        assert_eq!(settings.engine.dispatch, DispatchMode::Worker { queue_capacity: 32 });
        assert_eq!(settings.poll.interval_ms, 250);
        assert_eq!(settings.poll.timeout_ms, 5000);

        let web = &settings.groups["web"];
        assert_eq!(web.trigger, TriggerSpec::None);
        assert_eq!(
            web.checkers["latency"],
            CheckerSpec::Colored {
                green: Predicate::less_than(1000.0),
                yellow: Some(Predicate::between(1000.0, 2000.0)),
            }
        );
        assert_eq!(web.resources["web-1"].kind, "static");
    }

    #[test]
    fn empty_configuration_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert!(settings.groups.contains_key("web"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn invalid_checker_is_reported() {
        let toml = r#"
            [groups.db.checkers.connections]
            kind = "colored"
            green = { type = "range", lower = 10, upper = 1 }
        "#;
        let settings = Settings::from_toml(toml).unwrap();
        let err = settings.build_engine().unwrap_err();
        assert!(format!("{:#}", err).contains("connections"));
    }

    #[tokio::test]
    async fn wires_engine_and_poller() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        let engine = settings.build_engine().unwrap();
        assert_eq!(engine.groups().names(), vec!["web".to_string()]);

        let poller = settings
            .build_poller(engine.clone(), &ConnectorRegistry::with_builtins())
            .unwrap();
        assert_eq!(poller.len(), 1);

        let summary = poller.poll_once().await;
        assert_eq!(summary.sampled, 1);
        assert_eq!(engine.get_status("web").unwrap().status, HealthStatus::Suspicious);

        let mut direct = AttributeSnapshot::new();
        direct.insert("latency".into(), AttributeValue::Int(10));
        engine.update_status("web", "web-1", &direct).unwrap();
        assert_eq!(engine.get_status("web").unwrap().status, HealthStatus::Ok);
    }

    #[test]
    fn unknown_connector_kind_is_reported() {
        let toml = r#"
            [groups.db.resources.db-1]
            kind = "snmp"
        "#;
        let settings = Settings::from_toml(toml).unwrap();
        let engine = settings.build_engine().unwrap();
        let err = settings
            .build_poller(engine, &ConnectorRegistry::with_builtins())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("db-1"));
    }
}
