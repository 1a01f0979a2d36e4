//! Reference procedure definitions.
//!
//! A reference procedure is the ordered list of expected steps a live
//! session is monitored against. Definitions are immutable once a session
//! starts; sessions operate on a snapshot copied at start time.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a reference procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProcedureId(pub String);

impl ProcedureId {
    /// Generate a new random procedure ID.
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

impl Default for ProcedureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProcedureId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Difficulty rating assigned during procedure extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }
}

/// One expected step of a reference procedure.
///
/// `step_number` is the 1-based ordinal shown to operators; tracker state is
/// keyed by the 0-based position in [`ReferenceProcedure::steps`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceStep {
    /// 1-based ordinal within the procedure
    pub step_number: u32,

    /// Short step name
    pub step_name: String,

    /// Full description of the expected activity
    #[serde(default)]
    pub description: String,

    /// Expected duration lower bound, in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_duration_min: Option<u32>,

    /// Expected duration upper bound, in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_duration_max: Option<u32>,

    /// Whether deviation from this step is high-severity
    #[serde(default)]
    pub is_critical: bool,

    /// Instruments that must be present during this step
    #[serde(default)]
    pub instruments_required: Vec<String>,

    /// Anatomical landmarks expected in view
    #[serde(default)]
    pub anatomical_landmarks: Vec<String>,

    /// Free-text visual cues that identify the step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_cues: Option<String>,

    /// Start offset in the source video ("MM:SS" or "HH:MM:SS")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_start: Option<String>,

    /// End offset in the source video ("MM:SS" or "HH:MM:SS")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<String>,
}

impl ReferenceStep {
    /// Minimal step used widely in tests and fixtures.
    pub fn named(step_number: u32, step_name: impl Into<String>) -> Self {
        Self {
            step_number,
            step_name: step_name.into(),
            description: String::new(),
            expected_duration_min: None,
            expected_duration_max: None,
            is_critical: false,
            instruments_required: Vec::new(),
            anatomical_landmarks: Vec::new(),
            visual_cues: None,
            timestamp_start: None,
            timestamp_end: None,
        }
    }
}

/// A full reference procedure definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceProcedure {
    /// Unique procedure ID
    pub procedure_id: ProcedureId,

    /// Human-readable procedure name
    pub procedure_name: String,

    /// Procedure category (e.g. "laparoscopic cholecystectomy")
    pub procedure_type: String,

    /// Average total duration in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_avg: Option<f64>,

    /// Duration of the source video in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,

    /// Difficulty rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,

    /// Notable characteristics of the recorded procedure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<String>,

    /// Ordered expected steps
    pub steps: Vec<ReferenceStep>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ReferenceProcedure {
    /// Create a procedure from a name, type and step list.
    pub fn new(
        procedure_name: impl Into<String>,
        procedure_type: impl Into<String>,
        steps: Vec<ReferenceStep>,
    ) -> Self {
        let now = Utc::now();
        Self {
            procedure_id: ProcedureId::new(),
            procedure_name: procedure_name.into(),
            procedure_type: procedure_type.into(),
            total_duration_avg: None,
            video_duration: None,
            difficulty_level: None,
            characteristics: None,
            steps,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Number of steps in the procedure.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_serialization_roundtrip() {
        let mut step = ReferenceStep::named(1, "Port placement");
        step.is_critical = true;
        step.instruments_required = vec!["trocar".to_string()];
        step.timestamp_start = Some("00:30".to_string());

        let proc_def = ReferenceProcedure::new("Lap chole", "laparoscopic", vec![step]);
        let json = serde_json::to_string(&proc_def).unwrap();
        let back: ReferenceProcedure = serde_json::from_str(&json).unwrap();

        assert_eq!(back.procedure_name, "Lap chole");
        assert_eq!(back.steps.len(), 1);
        assert!(back.steps[0].is_critical);
        assert_eq!(back.steps[0].timestamp_start.as_deref(), Some("00:30"));
    }

    #[test]
    fn test_difficulty_level_lowercase() {
        let json = serde_json::to_string(&DifficultyLevel::Advanced).unwrap();
        assert_eq!(json, "\"advanced\"");
    }

    #[test]
    fn test_step_defaults_on_deserialize() {
        let step: ReferenceStep =
            serde_json::from_str(r#"{"step_number": 2, "step_name": "Dissection"}"#).unwrap();
        assert_eq!(step.description, "");
        assert!(!step.is_critical);
        assert!(step.instruments_required.is_empty());
    }
}
