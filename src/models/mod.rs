pub mod alert;
pub mod event;

pub use alert::{
    Alert, AlertDraft, AlertNotification, Investigation, Metrics, Severity, DETECTION_RULE,
};
pub use event::{AuthEvent, GeoClass, LoginStatus, EVENT_TYPE_AUTH};
