//! Per-step tracking status for the cumulative model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of one reference step in the cumulative tracking model.
///
/// `Detected` is terminal for an index. `Missed` is advisory: a missed step
/// can still transition to `Detected` if evidence arrives later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet observed
    #[default]
    Pending,
    /// Confirmed in the video; never reverts
    Detected,
    /// Presumed skipped because a later step was confirmed first
    Missed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Detected => "detected",
            StepStatus::Missed => "missed",
        }
    }
}
