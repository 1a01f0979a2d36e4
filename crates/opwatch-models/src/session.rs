//! Monitoring session records.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::procedure::ProcedureId;

/// Unique identifier for a monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is live and processing frames
    #[default]
    Active,
    /// Session was stopped and finalized
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

/// One monitoring run against a reference procedure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    /// Unique session ID
    pub session_id: SessionId,

    /// Procedure being monitored
    pub procedure_id: ProcedureId,

    /// Operator performing the procedure
    pub operator_id: String,

    /// Session start time
    pub start_time: DateTime<Utc>,

    /// Session end time, set on stop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Derived current step index at last persistence
    pub current_step: usize,

    /// Total frames ingested
    pub frame_count: u64,

    /// Lifecycle status
    pub status: SessionStatus,

    /// Free-form metadata (procedure name, total steps, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Session {
    /// Create a new active session.
    pub fn new(procedure_id: ProcedureId, operator_id: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            procedure_id,
            operator_id: operator_id.into(),
            start_time: Utc::now(),
            end_time: None,
            current_step: 0,
            frame_count: 0,
            status: SessionStatus::Active,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active() {
        let session = Session::new(ProcedureId::from("proc-1"), "operator-7");
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.end_time.is_none());
        assert_eq!(session.frame_count, 0);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
