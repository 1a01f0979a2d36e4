//! Strictly sequential per-frame step tracking.
//!
//! The alternate model behind [`crate::frame_monitor::FrameMonitor`]: a
//! single cursor advances one step at a time, and completion requires the
//! triple guard of an expected-step match, a `completed` progress phase and
//! explicit completion evidence. Superseded by the cumulative model for
//! live chunked sessions.

use tracing::{debug, info, warn};

use opwatch_models::{AnalysisResult, ProgressPhase};

/// Per-step status in the sequential model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqStepStatus {
    /// Not reached yet
    Pending,
    /// The step the cursor is on
    Current,
    /// Completed with evidence
    Completed,
    /// Skipped over by a later detection
    Missed,
}

/// Result of feeding one analysis into the sequential tracker.
#[derive(Debug, Default)]
pub struct SequentialOutcome {
    /// Step completed by this analysis
    pub completed: Option<usize>,
    /// Steps newly marked missed, in ascending order
    pub missed: Vec<usize>,
    /// Completed step the cursor returned to (explicit repetition)
    pub repeated: Option<usize>,
}

/// Sequential cursor tracker over the step list of one session.
#[derive(Debug)]
pub struct SequentialTracker {
    current: usize,
    status: Vec<SeqStepStatus>,
}

impl SequentialTracker {
    /// Create a tracker with the cursor on step 0.
    pub fn new(step_count: usize) -> Self {
        let mut status = vec![SeqStepStatus::Pending; step_count];
        if let Some(first) = status.first_mut() {
            *first = SeqStepStatus::Current;
        }
        Self { current: 0, status }
    }

    /// Feed one parsed analysis into the tracker.
    pub fn record(&mut self, result: &AnalysisResult) -> SequentialOutcome {
        let mut outcome = SequentialOutcome::default();

        if self.is_complete() {
            return outcome;
        }
        let Some(mut detected) = result.detected_step else {
            return outcome;
        };
        if detected >= self.status.len() {
            warn!(
                "Detected step index {} out of range ({} steps); ignoring",
                detected,
                self.status.len()
            );
            return outcome;
        }

        // A completed step reported as current again is treated as noise
        // unless the response explicitly flags a repetition.
        if self.status[detected] == SeqStepStatus::Completed && !result.repeated_completed {
            debug!(
                "Ignoring re-detection of completed step index {}; treating as current",
                detected
            );
            detected = self.current;
        }

        if detected != self.current {
            if self.status[detected] == SeqStepStatus::Completed && result.repeated_completed {
                warn!("Operator repeating completed step index {}", detected);
                self.status[self.current] = SeqStepStatus::Pending;
                self.current = detected;
                self.status[detected] = SeqStepStatus::Current;
                outcome.repeated = Some(detected);
            } else if detected > self.current {
                for i in self.current..detected {
                    if self.status[i] != SeqStepStatus::Completed {
                        self.status[i] = SeqStepStatus::Missed;
                        outcome.missed.push(i);
                    }
                }
                self.current = detected;
                self.status[detected] = SeqStepStatus::Current;
            }
            return outcome;
        }

        // Triple guard against premature completion: match + completed
        // phase + non-empty evidence.
        if result.matches_expected
            && result.progress == Some(ProgressPhase::Completed)
            && result.completion_evidence.is_some()
        {
            info!("Step index {} completed with evidence", self.current);
            self.status[self.current] = SeqStepStatus::Completed;
            outcome.completed = Some(self.current);
            self.current += 1;
            if self.current < self.status.len() {
                self.status[self.current] = SeqStepStatus::Current;
            }
        }

        outcome
    }

    /// Manually advance the cursor, marking the current step completed.
    pub fn advance(&mut self) {
        if self.current + 1 < self.status.len() {
            self.status[self.current] = SeqStepStatus::Completed;
            self.current += 1;
            self.status[self.current] = SeqStepStatus::Current;
        }
    }

    /// Cursor position. Equal to the step count once all steps are done.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Whether the cursor has run past the last step.
    pub fn is_complete(&self) -> bool {
        self.current >= self.status.len()
    }

    pub fn statuses(&self) -> &[SeqStepStatus] {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(detected: usize) -> AnalysisResult {
        AnalysisResult {
            detected_step: Some(detected),
            matches_expected: true,
            progress: Some(ProgressPhase::InProgress),
            completion_evidence: None,
            repeated_completed: false,
            raw_text: String::new(),
        }
    }

    fn completion(detected: usize) -> AnalysisResult {
        AnalysisResult {
            progress: Some(ProgressPhase::Completed),
            completion_evidence: Some("suture tied".to_string()),
            ..analysis(detected)
        }
    }

    #[test]
    fn test_completion_requires_triple_guard() {
        let mut tracker = SequentialTracker::new(3);

        // Match without completed phase
        let outcome = tracker.record(&analysis(0));
        assert_eq!(outcome.completed, None);
        assert_eq!(tracker.current_index(), 0);

        // Completed phase without evidence
        let mut no_evidence = completion(0);
        no_evidence.completion_evidence = None;
        let outcome = tracker.record(&no_evidence);
        assert_eq!(outcome.completed, None);

        // Full guard satisfied
        let outcome = tracker.record(&completion(0));
        assert_eq!(outcome.completed, Some(0));
        assert_eq!(tracker.current_index(), 1);
        assert_eq!(tracker.statuses()[1], SeqStepStatus::Current);
    }

    #[test]
    fn test_jump_ahead_marks_missed() {
        let mut tracker = SequentialTracker::new(4);
        let outcome = tracker.record(&analysis(2));

        assert_eq!(outcome.missed, vec![0, 1]);
        assert_eq!(tracker.current_index(), 2);
        assert_eq!(tracker.statuses()[0], SeqStepStatus::Missed);
        assert_eq!(tracker.statuses()[2], SeqStepStatus::Current);
    }

    #[test]
    fn test_completed_redetection_ignored_without_flag() {
        let mut tracker = SequentialTracker::new(3);
        tracker.record(&completion(0));
        assert_eq!(tracker.current_index(), 1);

        // Step 0 reported again without the repetition flag: stay on step 1
        let outcome = tracker.record(&analysis(0));
        assert_eq!(outcome.repeated, None);
        assert_eq!(tracker.current_index(), 1);
        assert_eq!(tracker.statuses()[0], SeqStepStatus::Completed);
    }

    #[test]
    fn test_explicit_repetition_returns_cursor() {
        let mut tracker = SequentialTracker::new(3);
        tracker.record(&completion(0));

        let mut repeated = analysis(0);
        repeated.repeated_completed = true;
        let outcome = tracker.record(&repeated);

        assert_eq!(outcome.repeated, Some(0));
        assert_eq!(tracker.current_index(), 0);
        assert_eq!(tracker.statuses()[0], SeqStepStatus::Current);
        assert_eq!(tracker.statuses()[1], SeqStepStatus::Pending);
    }

    #[test]
    fn test_manual_advance() {
        let mut tracker = SequentialTracker::new(3);
        tracker.advance();
        assert_eq!(tracker.current_index(), 1);
        assert_eq!(tracker.statuses()[0], SeqStepStatus::Completed);

        tracker.advance();
        // Cursor stops at the last step
        tracker.advance();
        assert_eq!(tracker.current_index(), 2);
    }

    #[test]
    fn test_all_steps_complete() {
        let mut tracker = SequentialTracker::new(2);
        tracker.record(&completion(0));
        tracker.record(&completion(1));
        assert!(tracker.is_complete());

        // Further input is a no-op
        let outcome = tracker.record(&analysis(1));
        assert_eq!(outcome.completed, None);
    }
}
