pub mod engine;
pub mod scorer;
pub mod summary;

pub use engine::{classify_severity, Detection, DetectionEngine, FAIL_THRESHOLD, HIGH_THRESHOLD};
pub use scorer::risk_score;
