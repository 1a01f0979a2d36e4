//! Live progress snapshots delivered to subscribers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::procedure::ReferenceStep;
use crate::status::StepStatus;

/// Step status as shown to subscribers.
///
/// The cumulative detected set maps to `completed`; steps outside the set
/// keep their raw status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepDisplayStatus {
    Pending,
    Completed,
    Missed,
}

impl StepDisplayStatus {
    /// Derive the display status from the raw tracker status.
    pub fn from_raw(status: StepStatus, detected: bool) -> Self {
        if detected {
            StepDisplayStatus::Completed
        } else {
            match status {
                StepStatus::Missed => StepDisplayStatus::Missed,
                _ => StepDisplayStatus::Pending,
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepDisplayStatus::Pending => "pending",
            StepDisplayStatus::Completed => "completed",
            StepDisplayStatus::Missed => "missed",
        }
    }
}

/// One step's entry in a progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepSnapshot {
    /// 1-based step ordinal
    pub step_number: u32,

    /// Step name
    pub step_name: String,

    /// Step description
    pub description: String,

    /// Whether the step is critical
    pub is_critical: bool,

    /// Derived display status
    pub status: StepDisplayStatus,

    /// Whether the step is in the cumulative detected set
    pub detected: bool,
}

/// Live progress snapshot emitted after every processed chunk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    /// Index of the last frame covered by the analyzed chunk
    pub frame_count: u64,

    /// First frame of the analyzed chunk
    pub start_frame: u64,

    /// Last frame of the analyzed chunk
    pub end_frame: u64,

    /// Derived current step index (lowest not-yet-detected)
    pub current_step_index: usize,

    /// Name of the derived current step
    pub current_step_name: String,

    /// Step index detected in this chunk, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_step_index: Option<usize>,

    /// Whether the oracle affirmed a match against the expected step
    pub matches_expected: bool,

    /// Full record of the expected step
    pub expected_step: ReferenceStep,

    /// All steps with derived status annotations
    pub all_steps: Vec<StepSnapshot>,

    /// Raw oracle analysis text
    pub analysis_text: String,

    /// Snapshot creation time
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_status_derivation() {
        assert_eq!(
            StepDisplayStatus::from_raw(StepStatus::Pending, true),
            StepDisplayStatus::Completed
        );
        assert_eq!(
            StepDisplayStatus::from_raw(StepStatus::Missed, false),
            StepDisplayStatus::Missed
        );
        assert_eq!(
            StepDisplayStatus::from_raw(StepStatus::Pending, false),
            StepDisplayStatus::Pending
        );
        // Detection wins over a stale missed marking
        assert_eq!(
            StepDisplayStatus::from_raw(StepStatus::Missed, true),
            StepDisplayStatus::Completed
        );
    }
}
