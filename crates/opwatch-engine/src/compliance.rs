//! Compliance scanning and alert construction.
//!
//! Independent of the step trackers: every raw analysis is scanned for
//! trigger phrases, and tracker-reported skips are turned into alerts here.

use serde_json::json;

use opwatch_models::{Alert, AlertSeverity, AlertType, ReferenceStep, SessionId};

/// Keywords that raise a safety-concern alert.
const SAFETY_KEYWORDS: &[&str] = &["concern", "risk", "danger", "warning"];

/// Scan one analysis text for compliance triggers.
///
/// Substring matching is case-insensitive. Zero or more alerts are returned
/// per chunk; severity of safety concerns depends on whether the expected
/// step is critical.
pub fn scan(analysis: &str, expected_step: &ReferenceStep, session_id: &SessionId) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let lower = analysis.to_lowercase();

    if lower.contains("no") && lower.contains("expected step") {
        alerts.push(
            Alert::new(
                session_id.clone(),
                AlertType::StepDeviation,
                AlertSeverity::Warning,
                format!(
                    "Possible deviation from expected step: {}",
                    expected_step.step_name
                ),
            )
            .with_metadata("analysis", json!(analysis)),
        );
    }

    if SAFETY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        let severity = if expected_step.is_critical {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        alerts.push(
            Alert::new(
                session_id.clone(),
                AlertType::SafetyConcern,
                severity,
                "Safety concern detected during procedure",
            )
            .with_metadata("analysis", json!(analysis))
            .with_metadata("step", json!(expected_step.step_name)),
        );
    }

    if lower.contains("missing") || lower.contains("not visible") {
        alerts.push(
            Alert::new(
                session_id.clone(),
                AlertType::InstrumentCheck,
                AlertSeverity::Medium,
                "Expected instruments may not be visible",
            )
            .with_metadata("analysis", json!(analysis)),
        );
    }

    alerts
}

/// Build the alert for a step the tracker decided was skipped.
pub fn missed_step_alert(
    step: &ReferenceStep,
    step_index: usize,
    session_id: &SessionId,
) -> Alert {
    let severity = if step.is_critical {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    Alert::new(
        session_id.clone(),
        AlertType::StepSkipped,
        severity,
        format!("Step {} '{}' was skipped", step.step_number, step.step_name),
    )
    .with_metadata("step_index", json!(step_index))
    .with_metadata("step_name", json!(step.step_name))
    .with_metadata("is_critical", json!(step.is_critical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::from_string("s1")
    }

    fn step(critical: bool) -> ReferenceStep {
        let mut s = ReferenceStep::named(2, "Dissection");
        s.is_critical = critical;
        s
    }

    #[test]
    fn test_step_deviation_trigger() {
        let alerts = scan(
            "Matches Expected: no, this is not the expected step",
            &step(false),
            &session(),
        );
        assert!(alerts
            .iter()
            .any(|a| a.alert_type == AlertType::StepDeviation
                && a.severity == AlertSeverity::Warning));
    }

    #[test]
    fn test_safety_concern_severity_tracks_critical() {
        let alerts = scan("There is a risk of bleeding", &step(false), &session());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);

        let alerts = scan("There is a risk of bleeding", &step(true), &session());
        assert_eq!(alerts[0].severity, AlertSeverity::High);
    }

    #[test]
    fn test_instrument_check_trigger() {
        let alerts = scan("The clip applier is not visible", &step(false), &session());
        assert!(alerts
            .iter()
            .any(|a| a.alert_type == AlertType::InstrumentCheck));
    }

    #[test]
    fn test_multiple_triggers_in_one_chunk() {
        let alerts = scan(
            "No match with expected step; warning: grasper missing",
            &step(false),
            &session(),
        );
        assert_eq!(alerts.len(), 3);
    }

    #[test]
    fn test_clean_analysis_no_alerts() {
        let alerts = scan(
            "Matches Expected: yes\nStep Progress: in-progress",
            &step(true),
            &session(),
        );
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_missed_step_alert_severity() {
        let alert = missed_step_alert(&step(true), 1, &session());
        assert_eq!(alert.alert_type, AlertType::StepSkipped);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert!(alert.message.contains("'Dissection' was skipped"));

        let alert = missed_step_alert(&step(false), 1, &session());
        assert_eq!(alert.severity, AlertSeverity::Medium);
    }
}
