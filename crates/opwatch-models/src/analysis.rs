//! Parsed oracle analysis signals.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reported progress phase of the step under observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressPhase {
    JustStarted,
    InProgress,
    NearingCompletion,
    Completed,
}

impl ProgressPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressPhase::JustStarted => "just-started",
            ProgressPhase::InProgress => "in-progress",
            ProgressPhase::NearingCompletion => "nearing-completion",
            ProgressPhase::Completed => "completed",
        }
    }

    /// Parse the phase label as it appears in oracle output.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "just-started" => Some(ProgressPhase::JustStarted),
            "in-progress" => Some(ProgressPhase::InProgress),
            "nearing-completion" => Some(ProgressPhase::NearingCompletion),
            "completed" => Some(ProgressPhase::Completed),
            _ => None,
        }
    }
}

/// Structured signals extracted from one oracle response.
///
/// The raw response text is retained for audit and for the bounded
/// per-step detection history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Detected step index (0-based), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_step: Option<usize>,

    /// Whether the response affirms a match against the expected step
    pub matches_expected: bool,

    /// Reported progress phase, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressPhase>,

    /// Completion evidence text, absent when empty or a placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_evidence: Option<String>,

    /// Whether the response explicitly flags a repeated completed step
    #[serde(default)]
    pub repeated_completed: bool,

    /// Full raw response text
    pub raw_text: String,
}

impl AnalysisResult {
    /// An empty result carrying only the raw text (all signals absent).
    pub fn empty(raw_text: impl Into<String>) -> Self {
        Self {
            detected_step: None,
            matches_expected: false,
            progress: None,
            completion_evidence: None,
            repeated_completed: false,
            raw_text: raw_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_label_roundtrip() {
        for phase in [
            ProgressPhase::JustStarted,
            ProgressPhase::InProgress,
            ProgressPhase::NearingCompletion,
            ProgressPhase::Completed,
        ] {
            assert_eq!(ProgressPhase::from_label(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn test_phase_label_case_insensitive() {
        assert_eq!(
            ProgressPhase::from_label("  Nearing-Completion "),
            Some(ProgressPhase::NearingCompletion)
        );
        assert_eq!(ProgressPhase::from_label("done"), None);
    }

    #[test]
    fn test_phase_serde_kebab_case() {
        let json = serde_json::to_string(&ProgressPhase::JustStarted).unwrap();
        assert_eq!(json, "\"just-started\"");
    }
}
