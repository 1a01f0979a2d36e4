//! Broadcast event schemas.
//!
//! The engine publishes these on an in-process topic; delivery transports
//! (WebSocket relays, logs, recorders) subscribe without the engine knowing
//! about them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::session::SessionId;
use crate::snapshot::ProgressSnapshot;

/// Event envelope published by a monitoring session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Live progress snapshot for a processed chunk
    Snapshot(ProgressSnapshot),

    /// A compliance alert was raised
    Alert(Alert),

    /// The session was stopped and finalized
    Stopped {
        session_id: SessionId,
        frames_processed: u64,
        timestamp: DateTime<Utc>,
    },
}

impl MonitorEvent {
    /// Create a stopped event stamped with the current time.
    pub fn stopped(session_id: SessionId, frames_processed: u64) -> Self {
        MonitorEvent::Stopped {
            session_id,
            frames_processed,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertSeverity, AlertType};

    #[test]
    fn test_event_tagging() {
        let event = MonitorEvent::Alert(Alert::new(
            SessionId::from_string("s1"),
            AlertType::StepDeviation,
            AlertSeverity::Warning,
            "deviation",
        ));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"alert\""));
    }

    #[test]
    fn test_stopped_event() {
        let event = MonitorEvent::stopped(SessionId::from_string("s1"), 42);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"stopped\""));
        assert!(json.contains("\"frames_processed\":42"));
    }
}
