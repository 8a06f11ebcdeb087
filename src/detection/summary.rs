//! Narrative text attached to alerts

/// Operator-facing incident summary. One of two fixed templates, selected by
/// whether a success followed the failure run.
pub fn summary_for(source: &str, success_after_fail: bool) -> String {
    if success_after_fail {
        format!(
            "Multiple failed login attempts from IP {source} followed by a successful login. \
             This matches a brute-force attack pattern. Immediate attention recommended."
        )
    } else {
        format!("Repeated failed login attempts detected from IP {source}. Monitoring advised.")
    }
}

/// Short reason line recording the evidence volume.
pub fn reason_for(source: &str, fail_count: u64) -> String {
    format!("{fail_count} failed login attempts from same IP {source}")
}
