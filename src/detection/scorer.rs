//! Risk scoring for brute-force detections

use crate::models::Severity;

fn severity_bonus(severity: Severity) -> u64 {
    match severity {
        Severity::Low => 0,
        Severity::Medium => 20,
        Severity::High => 40,
        Severity::Critical => 60,
    }
}

/// Deterministic risk score in [0, 100].
///
/// Ten points per failed attempt, plus the severity bonus, plus 20 when a
/// success followed the failure run. Capped at 100. Pure and total over
/// every fail count.
pub fn risk_score(fail_count: u64, severity: Severity, success_after_fail: bool) -> u8 {
    let mut score = fail_count.saturating_mul(10);
    score = score.saturating_add(severity_bonus(severity));
    if success_after_fail {
        score = score.saturating_add(20);
    }
    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medium_band() {
        assert_eq!(risk_score(3, Severity::Medium, false), 50);
        assert_eq!(risk_score(4, Severity::Medium, false), 60);
        assert_eq!(risk_score(5, Severity::Medium, false), 70);
    }

    #[test]
    fn test_high_band_caps() {
        assert_eq!(risk_score(6, Severity::High, false), 100);
        assert_eq!(risk_score(9, Severity::High, false), 100);
    }

    #[test]
    fn test_critical_includes_success_bonus() {
        // 5*10 + 60 + 20 = 130, capped
        assert_eq!(risk_score(5, Severity::Critical, true), 100);
        // 3*10 + 60 + 20 = 110, capped
        assert_eq!(risk_score(3, Severity::Critical, true), 100);
    }

    #[test]
    fn test_low_end() {
        assert_eq!(risk_score(0, Severity::Low, false), 0);
        assert_eq!(risk_score(1, Severity::Low, false), 10);
    }

    #[test]
    fn test_never_exceeds_cap() {
        assert_eq!(risk_score(u64::MAX, Severity::Critical, true), 100);
    }
}
