//! One-shot procedure extraction from a recorded video.
//!
//! A single schema-constrained oracle call turns a full recording into a
//! structured reference procedure. Unlike the live path this has no
//! concurrency or state-machine concerns.

use serde::{Deserialize, Serialize};
use tracing::warn;

use opwatch_models::{DifficultyLevel, ReferenceProcedure, ReferenceStep};

use crate::error::{OracleError, OracleResult};

/// Raw extraction payload as returned by the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProcedure {
    pub procedure_name: String,
    pub procedure_type: String,
    /// Average total duration; the oracle reports seconds
    pub total_duration_avg: Option<f64>,
    /// Source video duration; the oracle reports seconds
    pub video_duration: Option<f64>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub characteristics: Option<String>,
    #[serde(default)]
    pub steps: Vec<ExtractedStep>,
}

/// One extracted step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedStep {
    pub step_number: u32,
    pub step_name: String,
    #[serde(default)]
    pub description: String,
    pub expected_duration_min: Option<u32>,
    pub expected_duration_max: Option<u32>,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub instruments_required: Vec<String>,
    #[serde(default)]
    pub anatomical_landmarks: Vec<String>,
    pub visual_cues: Option<String>,
    pub timestamp_start: Option<String>,
    pub timestamp_end: Option<String>,
}

impl ExtractedProcedure {
    /// Convert oracle-reported second durations to minutes.
    pub fn normalize_durations(&mut self) {
        self.total_duration_avg = self.total_duration_avg.map(seconds_to_minutes);
        self.video_duration = self.video_duration.map(seconds_to_minutes);
    }

    /// Build a persistable reference procedure. Step offsets the oracle got
    /// wrong are dropped rather than stored.
    pub fn into_procedure(self) -> ReferenceProcedure {
        let steps = self
            .steps
            .into_iter()
            .map(|s| ReferenceStep {
                step_number: s.step_number,
                step_name: s.step_name,
                description: s.description,
                expected_duration_min: s.expected_duration_min,
                expected_duration_max: s.expected_duration_max,
                is_critical: s.is_critical,
                instruments_required: s.instruments_required,
                anatomical_landmarks: s.anatomical_landmarks,
                visual_cues: s.visual_cues,
                timestamp_start: sanitize_timestamp(s.timestamp_start),
                timestamp_end: sanitize_timestamp(s.timestamp_end),
            })
            .collect();

        let mut procedure =
            ReferenceProcedure::new(self.procedure_name, self.procedure_type, steps);
        procedure.total_duration_avg = self.total_duration_avg;
        procedure.video_duration = self.video_duration;
        procedure.difficulty_level = self.difficulty_level;
        procedure.characteristics = self.characteristics;
        procedure
    }
}

fn seconds_to_minutes(seconds: f64) -> f64 {
    (seconds / 60.0 * 100.0).round() / 100.0
}

fn sanitize_timestamp(field: Option<String>) -> Option<String> {
    field.filter(|ts| match opwatch_models::timestamp::parse_timestamp(ts) {
        Ok(_) => true,
        Err(e) => {
            warn!("Dropping invalid step offset '{}': {}", ts, e);
            false
        }
    })
}

/// JSON schema for structured extraction output.
pub fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "procedure_name": {"type": "string", "maxLength": 200},
            "procedure_type": {"type": "string", "maxLength": 100},
            "total_duration_avg": {"type": "integer"},
            "video_duration": {"type": "integer"},
            "difficulty_level": {
                "type": "string",
                "enum": ["beginner", "intermediate", "advanced", "expert"]
            },
            "characteristics": {"type": "string", "maxLength": 500},
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "step_number": {"type": "integer"},
                        "step_name": {"type": "string", "maxLength": 100},
                        "description": {"type": "string", "maxLength": 2000},
                        "expected_duration_min": {"type": "integer"},
                        "expected_duration_max": {"type": "integer"},
                        "is_critical": {"type": "boolean"},
                        "instruments_required": {
                            "type": "array",
                            "items": {"type": "string", "maxLength": 100}
                        },
                        "anatomical_landmarks": {
                            "type": "array",
                            "items": {"type": "string", "maxLength": 100}
                        },
                        "visual_cues": {"type": "string", "maxLength": 300},
                        "timestamp_start": {"type": "string", "pattern": "^[0-9]{2}:[0-9]{2}$"},
                        "timestamp_end": {"type": "string", "pattern": "^[0-9]{2}:[0-9]{2}$"}
                    },
                    "required": ["step_number", "step_name", "description", "is_critical"]
                }
            }
        },
        "required": ["procedure_name", "procedure_type", "steps"]
    })
}

/// Prompt for structured extraction.
pub fn extraction_prompt() -> String {
    "You are an expert procedural video analyst.\n\n\
     **Task**: Analyze this video and extract detailed, structured information.\n\n\
     **Step 1: Identify the Procedure**\n\
     Determine what procedure is being performed by observing the approach, the \
     region and structures visible, the instruments and equipment in use, and \
     the techniques and maneuvers applied.\n\n\
     **Step 2: Extract the Step Sequence**\n\
     Break the recording into its ordered steps. For every step provide: the \
     1-based step number, a short name, a full description of the activity, \
     expected duration bounds in seconds, whether the step is critical, the \
     instruments required, the anatomical landmarks in view, free-text visual \
     cues that identify the step, and the MM:SS offsets where the step starts \
     and ends in this recording.\n\n\
     **Step 3: Characterize the Procedure**\n\
     Report the procedure name and type, the average total duration and the \
     video duration in seconds, a difficulty rating \
     (beginner/intermediate/advanced/expert), and notable characteristics of \
     this particular recording.\n\n\
     Respond with a single JSON object matching the provided schema. Do not \
     include any text outside the JSON object."
        .to_string()
}

/// Parse a JSON response that may be wrapped in markdown fences or
/// surrounded by extra text.
pub fn parse_json_response(response: &str) -> OracleResult<serde_json::Value> {
    let mut cleaned = response.trim();

    if cleaned.starts_with("```") {
        if let Some(first_newline) = cleaned.find('\n') {
            cleaned = &cleaned[first_newline + 1..];
        }
        if let Some(stripped) = cleaned.strip_suffix("```") {
            cleaned = stripped;
        }
        cleaned = cleaned.trim();
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            warn!("No JSON object found in oracle response");
            return Err(OracleError::invalid_response(
                "no JSON object found in response",
            ));
        }
    };

    Ok(serde_json::from_str(&cleaned[start..=end])?)
}

/// Parse and normalize a structured extraction response.
pub fn parse_extraction(response: &str) -> OracleResult<ExtractedProcedure> {
    let value = parse_json_response(response)?;
    let mut extracted: ExtractedProcedure = serde_json::from_value(value)?;
    extracted.normalize_durations();
    Ok(extracted)
}
