//! Oracle response parsing.
//!
//! The oracle replies in a labeled free-text format; signals are extracted
//! with label-anchored, case-insensitive matching. Parsing never fails:
//! malformed input degrades to absent signals.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use opwatch_models::{AnalysisResult, ProgressPhase};

/// Evidence values treated as absent.
const EVIDENCE_PLACEHOLDERS: &[&str] = &["none", "n/a", "-", "null"];

fn detected_step_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Detected Step:\s*(\d+)").unwrap())
}

fn step_progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Step Progress:\s*(just-started|in-progress|nearing-completion|completed)")
            .unwrap()
    })
}

fn completion_evidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Completion Evidence:\s*([^\r\n]+)").unwrap())
}

/// Parse one oracle response into structured signals.
pub fn parse_analysis(text: &str) -> AnalysisResult {
    let lower = text.to_lowercase();

    // Double-check on purpose: a bare "yes" elsewhere in the text must not
    // count as a match affirmation.
    let matches_expected = lower.contains("yes") && lower.contains("matches expected: yes");
    let repeated_completed = lower.contains("repeated completed step: yes");

    let detected_step = parse_detected_step(text);
    let progress = parse_step_progress(text);
    let completion_evidence = parse_completion_evidence(text);

    if detected_step.is_none() && progress.is_none() {
        debug!("No structured signals found in oracle response");
    }

    AnalysisResult {
        detected_step,
        matches_expected,
        progress,
        completion_evidence,
        repeated_completed,
        raw_text: text.to_string(),
    }
}

/// `Detected Step: <n>` → 0-based index. A reported step 0 has no 0-based
/// counterpart and degrades to `None`.
fn parse_detected_step(text: &str) -> Option<usize> {
    detected_step_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
}

fn parse_step_progress(text: &str) -> Option<ProgressPhase> {
    step_progress_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ProgressPhase::from_label(m.as_str()))
}

fn parse_completion_evidence(text: &str) -> Option<String> {
    let evidence = completion_evidence_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())?;

    if evidence.is_empty() || EVIDENCE_PLACEHOLDERS.contains(&evidence.to_lowercase().as_str()) {
        return None;
    }
    Some(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_response_roundtrip() {
        let text = "Detected Step: 4\nStep Progress: completed\nCompletion Evidence: suture tied\nMatches Expected: yes";
        let result = parse_analysis(text);

        assert_eq!(result.detected_step, Some(3));
        assert_eq!(result.progress, Some(ProgressPhase::Completed));
        assert_eq!(result.completion_evidence.as_deref(), Some("suture tied"));
        assert!(result.matches_expected);
        assert!(!result.repeated_completed);
        assert_eq!(result.raw_text, text);
    }

    #[test]
    fn test_placeholder_evidence_rejected() {
        for placeholder in ["N/A", "none", "-", "null", "  "] {
            let text = format!("Completion Evidence: {}", placeholder);
            let result = parse_analysis(&text);
            assert_eq!(result.completion_evidence, None, "placeholder {placeholder:?}");
        }
    }

    #[test]
    fn test_incidental_yes_does_not_match() {
        let result = parse_analysis("Instruments Visible: yes, a grasper\nMatches Expected: no");
        assert!(!result.matches_expected);
    }

    #[test]
    fn test_match_requires_exact_phrase() {
        let result = parse_analysis("Matches Expected: yes");
        assert!(result.matches_expected);

        let result = parse_analysis("matches expected:  yes");
        // Extra whitespace breaks the literal phrase; the strict double-check
        // prefers false negatives over false positives
        assert!(!result.matches_expected);
    }

    #[test]
    fn test_malformed_input_degrades() {
        let result = parse_analysis("complete garbage with no labels at all");
        assert_eq!(result.detected_step, None);
        assert_eq!(result.progress, None);
        assert_eq!(result.completion_evidence, None);
        assert!(!result.matches_expected);
    }

    #[test]
    fn test_step_zero_degrades_to_none() {
        let result = parse_analysis("Detected Step: 0");
        assert_eq!(result.detected_step, None);
    }

    #[test]
    fn test_case_insensitive_labels() {
        let result = parse_analysis("detected step: 2\nstep progress: In-Progress");
        assert_eq!(result.detected_step, Some(1));
        assert_eq!(result.progress, Some(ProgressPhase::InProgress));
    }

    #[test]
    fn test_repeated_completed_flag() {
        let result = parse_analysis("Repeated Completed Step: yes\nMatches Expected: yes");
        assert!(result.repeated_completed);
    }

    #[test]
    fn test_evidence_stops_at_line_end() {
        let result =
            parse_analysis("Completion Evidence: clips applied\nAnalysis: other text here");
        assert_eq!(result.completion_evidence.as_deref(), Some("clips applied"));
    }

    #[test]
    fn test_huge_step_number_degrades() {
        let result = parse_analysis("Detected Step: 99999999999999999999999999");
        assert_eq!(result.detected_step, None);
    }
}
