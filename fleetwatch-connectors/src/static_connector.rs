//! Connector returning a fixed sample.

use async_trait::async_trait;
use fleetwatch_types::AttributeSnapshot;

use crate::{ConnectorError, ResourceConnector};

/// Always returns the same snapshot, or always fails with the same cause.
///
/// Useful for synthetic resources and for wiring tests.
#[derive(Debug, Clone)]
pub struct StaticConnector {
    outcome: Result<AttributeSnapshot, String>,
    description: String,
}

impl StaticConnector {
    pub fn new(snapshot: AttributeSnapshot) -> Self {
        Self {
            description: format!("static: {} attributes", snapshot.len()),
            outcome: Ok(snapshot),
        }
    }

    /// A connector whose resource is never reachable.
    pub fn unavailable(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        Self {
            description: format!("static: unavailable ({})", cause),
            outcome: Err(cause),
        }
    }
}

#[async_trait]
impl ResourceConnector for StaticConnector {
    async fn sample(&self) -> Result<AttributeSnapshot, ConnectorError> {
        self.outcome
            .clone()
            .map_err(ConnectorError::Unavailable)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
