//! Brute-force correlation engine
//!
//! Re-evaluates a source identity's stored history on every new event for
//! that identity, classifies its severity, and maintains the per-source
//! alert through the registry. State is recomputed from scratch each time
//! rather than incrementally cached, so repeated submissions cannot drift
//! from the stored history.

use std::sync::Arc;

use super::{scorer, summary};
use crate::models::{AlertDraft, GeoClass, Investigation, Severity};
use crate::store::{DetectionStore, StoreError, UpsertOutcome};

/// Failed attempts at or above this count qualify a source for alerting.
pub const FAIL_THRESHOLD: u64 = 3;

/// Failed attempts at or above this count escalate to High.
pub const HIGH_THRESHOLD: u64 = 6;

/// Severity for a source's current state, or `None` while the source is
/// below the alerting threshold. A success following the failures dominates
/// the count thresholds.
pub fn classify_severity(fail_count: u64, success_after_fail: bool) -> Option<Severity> {
    if fail_count < FAIL_THRESHOLD {
        return None;
    }
    Some(if success_after_fail {
        Severity::Critical
    } else if fail_count >= HIGH_THRESHOLD {
        Severity::High
    } else {
        Severity::Medium
    })
}

/// Outcome of evaluating one source after a new event.
#[derive(Debug, Clone)]
pub struct Detection {
    pub source: String,
    pub severity: Severity,
    pub fail_count: u64,
    pub success_after_fail: bool,
    pub risk_score: u8,
    pub outcome: UpsertOutcome,
}

impl Detection {
    /// Snapshot suitable for the notification queue and the detection log.
    pub fn to_notification(&self, timestamp: i64) -> crate::models::AlertNotification {
        crate::models::AlertNotification {
            source: self.source.clone(),
            severity: self.severity,
            risk_score: self.risk_score,
            summary: summary::summary_for(&self.source, self.success_after_fail),
            created: self.outcome == UpsertOutcome::Created,
            timestamp,
        }
    }
}

pub struct DetectionEngine {
    store: Arc<dyn DetectionStore>,
}

impl DetectionEngine {
    pub fn new(store: Arc<dyn DetectionStore>) -> Self {
        DetectionEngine { store }
    }

    /// Re-evaluate `source` against its stored history and upsert the alert
    /// when the state qualifies.
    ///
    /// `window_start` bounds the counted history (None = all-time). Returns
    /// `Ok(None)` when the source is below the alerting threshold; that is a
    /// normal outcome, not an error. Store failures propagate without
    /// touching the already-appended event history.
    pub fn evaluate(
        &self,
        source: &str,
        geo: GeoClass,
        window_start: Option<i64>,
        now: i64,
    ) -> Result<Option<Detection>, StoreError> {
        let fail_count = self.store.fail_count_for(source, window_start)?;
        let success_after_fail =
            self.store
                .has_success_after_failures(source, FAIL_THRESHOLD, window_start)?;

        let severity = match classify_severity(fail_count, success_after_fail) {
            Some(severity) => severity,
            None => return Ok(None),
        };

        let risk_score = scorer::risk_score(fail_count, severity, success_after_fail);
        let draft = AlertDraft {
            source: source.to_string(),
            severity,
            risk_score,
            reason: summary::reason_for(source, fail_count),
            summary: summary::summary_for(source, success_after_fail),
            investigation: Investigation::for_geo(geo),
        };
        let outcome = self.store.upsert(&draft, now)?;

        match outcome {
            UpsertOutcome::Created => log::warn!(
                "NEW ALERT | {} | {} | risk {}",
                source,
                severity,
                risk_score
            ),
            UpsertOutcome::Updated => log::info!(
                "Alert refreshed | {} | {} | risk {}",
                source,
                severity,
                risk_score
            ),
        }

        Ok(Some(Detection {
            source: source.to_string(),
            severity,
            fail_count,
            success_after_fail,
            risk_score,
            outcome,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthEvent, LoginStatus};
    use crate::store::{AlertRegistry, EventStore, MemoryStore};

    fn engine_with_store() -> (DetectionEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DetectionEngine::new(store.clone()), store)
    }

    fn append(store: &MemoryStore, source: &str, status: LoginStatus, timestamp: i64) {
        store
            .append(&AuthEvent::new(
                timestamp,
                source.to_string(),
                "admin".to_string(),
                status,
                GeoClass::External,
            ))
            .unwrap();
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify_severity(0, false), None);
        assert_eq!(classify_severity(2, false), None);
        assert_eq!(classify_severity(3, false), Some(Severity::Medium));
        assert_eq!(classify_severity(5, false), Some(Severity::Medium));
        assert_eq!(classify_severity(6, false), Some(Severity::High));
        assert_eq!(classify_severity(20, false), Some(Severity::High));
        assert_eq!(classify_severity(3, true), Some(Severity::Critical));
        assert_eq!(classify_severity(20, true), Some(Severity::Critical));
    }

    #[test]
    fn test_below_threshold_is_clean() {
        let (engine, store) = engine_with_store();
        append(&store, "1.1.1.1", LoginStatus::Failed, 100);
        append(&store, "1.1.1.1", LoginStatus::Failed, 101);

        let detection = engine
            .evaluate("1.1.1.1", GeoClass::External, None, 101)
            .unwrap();
        assert!(detection.is_none());
        assert_eq!(store.count_alerts().unwrap(), 0);
    }

    #[test]
    fn test_medium_detection() {
        let (engine, store) = engine_with_store();
        for i in 0..4 {
            append(&store, "10.0.0.5", LoginStatus::Failed, 100 + i);
        }

        let detection = engine
            .evaluate("10.0.0.5", GeoClass::Internal, None, 103)
            .unwrap()
            .unwrap();
        assert_eq!(detection.severity, Severity::Medium);
        assert_eq!(detection.fail_count, 4);
        assert_eq!(detection.risk_score, 60);
        assert_eq!(detection.outcome, UpsertOutcome::Created);

        let alert = store.get_alert("10.0.0.5").unwrap().unwrap();
        assert_eq!(alert.investigation.geo, GeoClass::Internal);
        assert_eq!(alert.severity, Severity::Medium);
    }

    #[test]
    fn test_high_detection() {
        let (engine, store) = engine_with_store();
        for i in 0..6 {
            append(&store, "1.2.3.4", LoginStatus::Failed, 100 + i);
        }

        let detection = engine
            .evaluate("1.2.3.4", GeoClass::External, None, 105)
            .unwrap()
            .unwrap();
        assert_eq!(detection.severity, Severity::High);
        assert_eq!(detection.risk_score, 100);
    }

    #[test]
    fn test_critical_dominates_counts() {
        let (engine, store) = engine_with_store();
        for i in 0..5 {
            append(&store, "45.33.22.11", LoginStatus::Failed, 100 + i);
        }
        append(&store, "45.33.22.11", LoginStatus::Success, 105);

        let detection = engine
            .evaluate("45.33.22.11", GeoClass::External, None, 105)
            .unwrap()
            .unwrap();
        assert_eq!(detection.severity, Severity::Critical);
        assert!(detection.success_after_fail);
        assert_eq!(detection.risk_score, 100);

        let alert = store.get_alert("45.33.22.11").unwrap().unwrap();
        assert!(alert.reason.contains("5 failed login attempts from same IP"));
        assert!(alert.summary.contains("brute-force attack pattern"));
    }

    #[test]
    fn test_repeated_evaluation_updates_in_place() {
        let (engine, store) = engine_with_store();
        for i in 0..3 {
            append(&store, "1.1.1.1", LoginStatus::Failed, 100 + i);
        }
        let first = engine
            .evaluate("1.1.1.1", GeoClass::External, None, 102)
            .unwrap()
            .unwrap();
        assert_eq!(first.outcome, UpsertOutcome::Created);
        assert_eq!(first.risk_score, 50);

        append(&store, "1.1.1.1", LoginStatus::Failed, 103);
        let second = engine
            .evaluate("1.1.1.1", GeoClass::External, None, 103)
            .unwrap()
            .unwrap();
        assert_eq!(second.outcome, UpsertOutcome::Updated);
        assert_eq!(second.risk_score, 60);

        assert_eq!(store.count_alerts().unwrap(), 1);
        let alert = store.get_alert("1.1.1.1").unwrap().unwrap();
        assert_eq!(alert.risk_score, 60);
    }

    #[test]
    fn test_windowed_counting_excludes_old_failures() {
        let (engine, store) = engine_with_store();
        for i in 0..4 {
            append(&store, "1.1.1.1", LoginStatus::Failed, 100 + i);
        }

        // Window starting after the burst sees a clean source.
        let detection = engine
            .evaluate("1.1.1.1", GeoClass::External, Some(500), 600)
            .unwrap();
        assert!(detection.is_none());
    }
}
