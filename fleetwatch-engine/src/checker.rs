//! Attribute checkers - pure functions from an attribute value to a health status.
//!
//! The engine treats every checker as an opaque, deterministic callable.
//! Policies can be plain closures, hand-written [`AttributeChecker`]
//! implementations, or rule data compiled from configuration through
//! [`CheckerSpec`] and interpreted by [`TieredChecker`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use fleetwatch_types::{AttributeValue, HealthStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CheckError, EngineError};

/// Maps one attribute value to a health status.
///
/// Implementations must be deterministic and free of side effects visible
/// to the engine. Closures `Fn(&AttributeValue) -> HealthStatus` implement
/// this trait directly.
pub trait AttributeChecker: Send + Sync {
    fn evaluate(&self, value: &AttributeValue) -> Result<HealthStatus, CheckError>;
}

impl<F> AttributeChecker for F
where
    F: Fn(&AttributeValue) -> HealthStatus + Send + Sync,
{
    fn evaluate(&self, value: &AttributeValue) -> Result<HealthStatus, CheckError> {
        Ok(self(value))
    }
}

/// Run a checker, absorbing errors and panics.
///
/// Returns `None` when the checker failed; the failure is logged and the
/// attribute contributes nothing to the resource's status.
pub(crate) fn evaluate_guarded(
    checker: &dyn AttributeChecker,
    attribute: &str,
    value: &AttributeValue,
) -> Option<HealthStatus> {
    match catch_unwind(AssertUnwindSafe(|| checker.evaluate(value))) {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            warn!(attribute = %attribute, value = %value, error = %e, "Attribute checker failed");
            None
        }
        Err(_) => {
            warn!(attribute = %attribute, value = %value, "Attribute checker panicked");
            None
        }
    }
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    fn test(self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Less => actual < expected,
            Comparison::LessOrEqual => actual <= expected,
            Comparison::Greater => actual > expected,
            Comparison::GreaterOrEqual => actual >= expected,
            Comparison::Equal => actual == expected,
            Comparison::NotEqual => actual != expected,
        }
    }
}

fn inclusive() -> bool {
    true
}

/// A condition on an attribute value.
///
/// Numeric predicates accept `Int` and `Float` values and never match
/// booleans or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Comparison {
        operator: Comparison,
        value: f64,
    },
    Range {
        lower: f64,
        upper: f64,
        #[serde(default = "inclusive")]
        lower_inclusive: bool,
        #[serde(default = "inclusive")]
        upper_inclusive: bool,
    },
    Equals {
        value: AttributeValue,
    },
    Any,
}

impl Predicate {
    pub fn less_than(value: f64) -> Self {
        Predicate::Comparison {
            operator: Comparison::Less,
            value,
        }
    }

    pub fn at_most(value: f64) -> Self {
        Predicate::Comparison {
            operator: Comparison::LessOrEqual,
            value,
        }
    }

    pub fn greater_than(value: f64) -> Self {
        Predicate::Comparison {
            operator: Comparison::Greater,
            value,
        }
    }

    pub fn at_least(value: f64) -> Self {
        Predicate::Comparison {
            operator: Comparison::GreaterOrEqual,
            value,
        }
    }

    /// `[lower, upper]`
    pub fn between(lower: f64, upper: f64) -> Self {
        Predicate::Range {
            lower,
            upper,
            lower_inclusive: true,
            upper_inclusive: true,
        }
    }

    /// `(lower, upper)`
    pub fn strictly_between(lower: f64, upper: f64) -> Self {
        Predicate::Range {
            lower,
            upper,
            lower_inclusive: false,
            upper_inclusive: false,
        }
    }

    pub fn equals(value: impl Into<AttributeValue>) -> Self {
        Predicate::Equals {
            value: value.into(),
        }
    }

    pub fn matches(&self, value: &AttributeValue) -> bool {
        match self {
            Predicate::Comparison { operator, value: expected } => value
                .as_f64()
                .is_some_and(|actual| operator.test(actual, *expected)),
            Predicate::Range {
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => value.as_f64().is_some_and(|actual| {
                let above = if *lower_inclusive { actual >= *lower } else { actual > *lower };
                let below = if *upper_inclusive { actual <= *upper } else { actual < *upper };
                above && below
            }),
            Predicate::Equals { value: expected } => match (value.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => value == expected,
            },
            Predicate::Any => true,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Predicate::Comparison { value, .. } if value.is_nan() => {
                Err("comparison value is NaN".to_string())
            }
            Predicate::Range { lower, upper, .. } if lower.is_nan() || upper.is_nan() => {
                Err("range bound is NaN".to_string())
            }
            Predicate::Range { lower, upper, .. } if lower > upper => {
                Err(format!("range lower bound {} exceeds upper bound {}", lower, upper))
            }
            _ => Ok(()),
        }
    }
}

/// Ordered list of `(status, predicate)` tiers.
///
/// The first tier whose predicate matches decides the status; a value that
/// matches no tier is `Malfunction`.
///
/// # Example
///
/// ```rust
/// use fleetwatch_engine::{AttributeChecker, Predicate, TieredChecker};
/// use fleetwatch_types::{AttributeValue, HealthStatus};
///
/// // green below 1000, yellow in [1000, 2000], red otherwise
/// let checker = TieredChecker::colored(
///     Predicate::less_than(1000.0),
///     Some(Predicate::between(1000.0, 2000.0)),
/// );
///
/// assert_eq!(checker.evaluate(&AttributeValue::Int(500)).unwrap(), HealthStatus::Ok);
/// assert_eq!(checker.evaluate(&AttributeValue::Int(1500)).unwrap(), HealthStatus::Suspicious);
/// assert_eq!(checker.evaluate(&AttributeValue::Int(2500)).unwrap(), HealthStatus::Malfunction);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredChecker {
    tiers: Vec<(HealthStatus, Predicate)>,
}

impl TieredChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier; earlier tiers take precedence.
    pub fn tier(mut self, status: HealthStatus, predicate: Predicate) -> Self {
        self.tiers.push((status, predicate));
        self
    }

    /// Green predicate means `Ok`, yellow means `Suspicious`, anything else `Malfunction`.
    pub fn colored(green: Predicate, yellow: Option<Predicate>) -> Self {
        let checker = Self::new().tier(HealthStatus::Ok, green);
        match yellow {
            Some(yellow) => checker.tier(HealthStatus::Suspicious, yellow),
            None => checker,
        }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl AttributeChecker for TieredChecker {
    fn evaluate(&self, value: &AttributeValue) -> Result<HealthStatus, CheckError> {
        Ok(self
            .tiers
            .iter()
            .find(|(_, predicate)| predicate.matches(value))
            .map(|(status, _)| *status)
            .unwrap_or(HealthStatus::Malfunction))
    }
}

/// Always reports the same status, regardless of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantChecker(pub HealthStatus);

impl AttributeChecker for ConstantChecker {
    fn evaluate(&self, _value: &AttributeValue) -> Result<HealthStatus, CheckError> {
        Ok(self.0)
    }
}

/// One tier of a [`CheckerSpec::Tiered`] specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub status: HealthStatus,
    pub when: Predicate,
}

/// Declarative checker policy as it appears in configuration.
///
/// ```toml
/// [groups.web.checkers.latency]
/// kind = "colored"
/// green = { type = "comparison", operator = "<", value = 1000 }
/// yellow = { type = "range", lower = 1000, upper = 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckerSpec {
    Colored {
        green: Predicate,
        #[serde(default)]
        yellow: Option<Predicate>,
    },
    Tiered {
        tiers: Vec<TierSpec>,
    },
    Constant {
        status: HealthStatus,
    },
}

impl CheckerSpec {
    /// Compile this policy into a checker for `attribute`.
    pub fn compile(&self, attribute: &str) -> Result<Arc<dyn AttributeChecker>, EngineError> {
        let invalid = |reason: String| EngineError::InvalidChecker {
            attribute: attribute.to_string(),
            reason,
        };

        match self {
            CheckerSpec::Colored { green, yellow } => {
                green.validate().map_err(invalid)?;
                if let Some(yellow) = yellow {
                    yellow.validate().map_err(invalid)?;
                }
                Ok(Arc::new(TieredChecker::colored(green.clone(), yellow.clone())))
            }
            CheckerSpec::Tiered { tiers } => {
                if tiers.is_empty() {
                    return Err(invalid("tiered checker has no tiers".to_string()));
                }
                let mut checker = TieredChecker::new();
                for tier in tiers {
                    tier.when.validate().map_err(invalid)?;
                    checker = checker.tier(tier.status, tier.when.clone());
                }
                Ok(Arc::new(checker))
            }
            CheckerSpec::Constant { status } => Ok(Arc::new(ConstantChecker(*status))),
        }
    }
}
