use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event::GeoClass;

/// Rule label attached to every alert this service produces.
pub const DETECTION_RULE: &str = "Brute Force Detection Rule";

/// Ordinal severity of a source's behavior. The derive order gives
/// Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Severity::Low),
            "Medium" => Ok(Severity::Medium),
            "High" => Ok(Severity::High),
            "Critical" => Ok(Severity::Critical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static investigation context attached to an alert. The reputation label
/// and blacklist flag are simulated; only the geo class is derived from the
/// triggering events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investigation {
    pub geo: GeoClass,
    pub reputation: String,
    pub blacklisted: bool,
}

impl Investigation {
    pub fn for_geo(geo: GeoClass) -> Self {
        let reputation = match geo {
            GeoClass::Internal => "Trusted network segment",
            GeoClass::External => "Unverified external host",
        };
        Investigation {
            geo,
            reputation: reputation.to_string(),
            blacklisted: false,
        }
    }
}

/// Mutable alert aggregate, unique per source identity.
///
/// The alert's timeline is the source's full ordered event history; it is
/// referenced by the `source` key and resolved against the event store on
/// demand, never copied into the alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub source: String,
    pub severity: Severity,
    pub risk_score: u8,
    pub rule: String,
    pub reason: String,
    pub summary: String,
    pub investigation: Investigation,
    /// Unix seconds; immutable once set.
    pub created_at: i64,
    /// Unix seconds; advances on every qualifying re-detection.
    pub updated_at: i64,
}

/// Detection output handed to the alert registry. The registry owns the
/// create-vs-update decision and both timestamps.
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub source: String,
    pub severity: Severity,
    pub risk_score: u8,
    pub reason: String,
    pub summary: String,
    pub investigation: Investigation,
}

/// Operator dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_events: u64,
    pub total_alerts: u64,
    pub critical_alerts: u64,
}

/// Snapshot of an alert upsert, consumed by the notification dispatcher and
/// the detection log sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotification {
    pub source: String,
    pub severity: Severity,
    pub risk_score: u8,
    pub summary: String,
    /// True when this upsert created the alert, false when it refreshed an
    /// existing one.
    pub created: bool,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_roundtrip() {
        for severity in [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            assert_eq!(severity.as_str().parse(), Ok(severity));
        }
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_investigation_reputation_tracks_geo() {
        let internal = Investigation::for_geo(GeoClass::Internal);
        let external = Investigation::for_geo(GeoClass::External);
        assert_ne!(internal.reputation, external.reputation);
        assert!(!internal.blacklisted);
        assert!(!external.blacklisted);
    }
}
