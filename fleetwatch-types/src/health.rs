//! The health status lattice.

use core::fmt;

/// Severity of a resource or group, totally ordered `Ok < Suspicious < Malfunction`.
///
/// Aggregation is worst-case-wins: the join of two statuses is the more
/// severe one ([`HealthStatus::max`]) and the meet is the less severe one
/// ([`HealthStatus::min`]). `Ok` is the identity of the join and
/// `Malfunction` absorbs everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HealthStatus {
    #[default]
    Ok,
    Suspicious,
    Malfunction,
}

impl HealthStatus {
    /// The more severe of the two statuses.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    /// The less severe of the two statuses.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    /// Join an arbitrary number of statuses. An empty input is `Ok`.
    pub fn join_all<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().fold(HealthStatus::Ok, HealthStatus::max)
    }

    /// True iff this status is `Malfunction`.
    pub fn is_critical(self) -> bool {
        self == HealthStatus::Malfunction
    }

    /// True iff this status is `Ok`.
    pub fn is_ok(self) -> bool {
        self == HealthStatus::Ok
    }

    /// Upper-case label used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Ok => "OK",
            HealthStatus::Suspicious => "SUSPICIOUS",
            HealthStatus::Malfunction => "MALFUNCTION",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [HealthStatus; 3] = [
        HealthStatus::Ok,
        HealthStatus::Suspicious,
        HealthStatus::Malfunction,
    ];

    #[test]
    fn severity_order() {
        assert!(HealthStatus::Ok < HealthStatus::Suspicious);
        assert!(HealthStatus::Suspicious < HealthStatus::Malfunction);
    }

    #[test]
    fn max_is_commutative_and_associative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.max(b), b.max(a));
                for c in ALL {
                    assert_eq!(a.max(b).max(c), a.max(b.max(c)));
                }
            }
        }
    }

    #[test]
    fn ok_is_identity_and_malfunction_absorbs() {
        for a in ALL {
            assert_eq!(a.max(HealthStatus::Ok), a);
            assert_eq!(a.max(HealthStatus::Malfunction), HealthStatus::Malfunction);
            assert_eq!(a.min(HealthStatus::Malfunction), a);
            assert_eq!(a.min(HealthStatus::Ok), HealthStatus::Ok);
        }
    }

    #[test]
    fn join_all_of_nothing_is_ok() {
        assert_eq!(HealthStatus::join_all([]), HealthStatus::Ok);
        assert_eq!(
            HealthStatus::join_all([HealthStatus::Suspicious, HealthStatus::Ok]),
            HealthStatus::Suspicious
        );
    }

    #[test]
    fn only_malfunction_is_critical() {
        assert!(!HealthStatus::Ok.is_critical());
        assert!(!HealthStatus::Suspicious.is_critical());
        assert!(HealthStatus::Malfunction.is_critical());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&HealthStatus::Malfunction).unwrap();
        assert_eq!(json, "\"malfunction\"");
        let parsed: HealthStatus = serde_json::from_str("\"suspicious\"").unwrap();
        assert_eq!(parsed, HealthStatus::Suspicious);
    }
}
