//! Per-resource health verdicts with root-cause detail.

use alloc::string::String;
use core::fmt;

use crate::{AttributeValue, HealthStatus};

/// Why a resource has the status it has.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum HealthCause {
    /// Every checked attribute is within its healthy range.
    Ok,
    /// An attribute value was judged non-OK by its checker.
    InvalidAttributeValue {
        attribute_name: String,
        value: AttributeValue,
        verdict: HealthStatus,
    },
    /// The resource could not be sampled at all.
    ResourceIsNotAvailable { cause: String },
}

/// Immutable health verdict of one monitored resource.
///
/// # Example
///
/// ```rust
/// use fleetwatch_types::{AttributeValue, HealthStatus, ResourceHealthStatus};
///
/// let status = ResourceHealthStatus::invalid_attribute(
///     "web-1",
///     "latency",
///     AttributeValue::Int(1500),
///     HealthStatus::Suspicious,
/// );
/// assert_eq!(status.status, HealthStatus::Suspicious);
/// assert!(!status.is_critical());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceHealthStatus {
    pub resource_name: String,
    pub status: HealthStatus,
    pub cause: HealthCause,
}

impl ResourceHealthStatus {
    /// A healthy resource.
    pub fn ok(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            status: HealthStatus::Ok,
            cause: HealthCause::Ok,
        }
    }

    /// A resource whose attribute was judged `verdict`.
    ///
    /// An `Ok` verdict degrades to [`ResourceHealthStatus::ok`] since nothing is invalid.
    pub fn invalid_attribute(
        resource_name: impl Into<String>,
        attribute_name: impl Into<String>,
        value: AttributeValue,
        verdict: HealthStatus,
    ) -> Self {
        if verdict.is_ok() {
            return Self::ok(resource_name);
        }
        Self {
            resource_name: resource_name.into(),
            status: verdict,
            cause: HealthCause::InvalidAttributeValue {
                attribute_name: attribute_name.into(),
                value,
                verdict,
            },
        }
    }

    /// A resource that could not be reached. Always `Malfunction`.
    pub fn unavailable(resource_name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            status: HealthStatus::Malfunction,
            cause: HealthCause::ResourceIsNotAvailable {
                cause: cause.into(),
            },
        }
    }

    /// True iff the status is `Malfunction`.
    pub fn is_critical(&self) -> bool {
        self.status.is_critical()
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.cause, HealthCause::ResourceIsNotAvailable { .. })
    }

    /// Name of the offending attribute, if the cause is an attribute value.
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.cause {
            HealthCause::InvalidAttributeValue { attribute_name, .. } => Some(attribute_name),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceHealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            HealthCause::Ok => write!(f, "{}: {}", self.resource_name, self.status),
            HealthCause::InvalidAttributeValue {
                attribute_name,
                value,
                ..
            } => write!(
                f,
                "{}: {} ({} = {})",
                self.resource_name, self.status, attribute_name, value
            ),
            HealthCause::ResourceIsNotAvailable { cause } => write!(
                f,
                "{}: {} (not available: {})",
                self.resource_name, self.status, cause
            ),
        }
    }
}
