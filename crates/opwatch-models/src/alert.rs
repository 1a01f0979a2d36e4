//! Compliance alert records.
//!
//! Alerts are append-only once created and always attached to a session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Category of compliance alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Observed activity deviates from the expected step
    StepDeviation,
    /// The oracle flagged a safety concern
    SafetyConcern,
    /// Expected instruments may not be visible
    InstrumentCheck,
    /// A step was skipped according to the tracker
    StepSkipped,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::StepDeviation => "step_deviation",
            AlertType::SafetyConcern => "safety_concern",
            AlertType::InstrumentCheck => "instrument_check",
            AlertType::StepSkipped => "step_skipped",
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

/// A single compliance alert.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Alert {
    /// Unique alert ID
    pub alert_id: String,

    /// Session the alert belongs to
    pub session_id: SessionId,

    /// Alert category
    pub alert_type: AlertType,

    /// Severity
    pub severity: AlertSeverity,

    /// Human-readable message
    pub message: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Whether an operator has acknowledged the alert
    #[serde(default)]
    pub acknowledged: bool,

    /// Free-form context (analysis excerpt, step info, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Alert {
    /// Create an unacknowledged alert stamped with the current time.
    pub fn new(
        session_id: SessionId,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            session_id,
            alert_type,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            acknowledged: false,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_defaults_unacknowledged() {
        let alert = Alert::new(
            SessionId::from_string("s1"),
            AlertType::StepSkipped,
            AlertSeverity::High,
            "Step 2 was skipped",
        );
        assert!(!alert.acknowledged);
        assert_eq!(alert.alert_type.as_str(), "step_skipped");
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::new(
            SessionId::from_string("s1"),
            AlertType::SafetyConcern,
            AlertSeverity::Medium,
            "Safety concern detected",
        )
        .with_metadata("step", serde_json::json!("Dissection"));

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"alert_type\":\"safety_concern\""));
        assert!(json.contains("\"severity\":\"medium\""));
        assert!(json.contains("\"acknowledged\":false"));
    }
}
