//! Cumulative step tracking.
//!
//! The primary state machine for live sessions: once a step index enters the
//! detected set it never leaves. A `Missed` marking is advisory and can
//! still be upgraded to `Detected` by later evidence.

use std::collections::{BTreeSet, HashMap};

use tracing::{info, warn};

use opwatch_models::{AnalysisResult, StepStatus};

use crate::history::BoundedHistory;

/// Result of feeding one analysis into the tracker.
#[derive(Debug, Default)]
pub struct TrackerOutcome {
    /// Index added to the detected set by this analysis, if it was new
    pub newly_detected: Option<usize>,
    /// Indices newly marked missed, in ascending order
    pub missed: Vec<usize>,
}

/// Cumulative tracker over the step list of one session.
#[derive(Debug)]
pub struct CumulativeTracker {
    detected: BTreeSet<usize>,
    status: Vec<StepStatus>,
    history: HashMap<usize, BoundedHistory<String>>,
    missed_step_gap: usize,
    history_limit: usize,
}

impl CumulativeTracker {
    /// Create a tracker with all `step_count` indices pending.
    pub fn new(step_count: usize, missed_step_gap: usize, history_limit: usize) -> Self {
        Self {
            detected: BTreeSet::new(),
            status: vec![StepStatus::Pending; step_count],
            history: HashMap::new(),
            missed_step_gap,
            history_limit,
        }
    }

    /// Feed one parsed analysis into the tracker.
    ///
    /// A detection only counts when the response affirms a match. Adding an
    /// already-detected index is idempotent and never re-flags missed steps.
    pub fn record(&mut self, result: &AnalysisResult) -> TrackerOutcome {
        let mut outcome = TrackerOutcome::default();

        let Some(index) = result.detected_step else {
            return outcome;
        };
        if !result.matches_expected {
            return outcome;
        }
        if index >= self.status.len() {
            warn!(
                "Detected step index {} out of range ({} steps); ignoring",
                index,
                self.status.len()
            );
            return outcome;
        }

        let is_new = self.detected.insert(index);
        self.status[index] = StepStatus::Detected;
        self.history
            .entry(index)
            .or_insert_with(|| BoundedHistory::new(self.history_limit))
            .push(result.raw_text.clone());

        if is_new {
            info!(
                "Step index {} detected ({} of {} steps confirmed)",
                index,
                self.detected.len(),
                self.status.len()
            );
            outcome.newly_detected = Some(index);
        }

        // Skip detection: triggered when the detected index outruns the
        // lowest still-pending earlier index by more than the allowed gap.
        // Once triggered, every pending index more than one position behind
        // is flagged; the immediately preceding step may still be underway.
        if let Some(lowest_pending) = (0..index).find(|i| self.status[*i] == StepStatus::Pending) {
            if index - lowest_pending > self.missed_step_gap {
                for i in lowest_pending..index.saturating_sub(1) {
                    if self.status[i] == StepStatus::Pending {
                        self.status[i] = StepStatus::Missed;
                        warn!(
                            "Step index {} marked missed: step {} detected without it",
                            i, index
                        );
                        outcome.missed.push(i);
                    }
                }
            }
        }

        outcome
    }

    /// Cumulative detected set, ascending.
    pub fn detected(&self) -> &BTreeSet<usize> {
        &self.detected
    }

    /// Whether an index is in the detected set.
    pub fn is_detected(&self, index: usize) -> bool {
        self.detected.contains(&index)
    }

    /// Raw per-step statuses.
    pub fn statuses(&self) -> &[StepStatus] {
        &self.status
    }

    /// Most recent detection analysis for a step, if retained.
    pub fn last_detection(&self, index: usize) -> Option<&String> {
        self.history.get(&index).and_then(|h| h.last())
    }

    /// Derived current step: the lowest index not yet detected, or the last
    /// index when everything is detected.
    pub fn current_display_index(&self) -> usize {
        let len = self.status.len();
        (0..len)
            .find(|i| !self.detected.contains(i))
            .unwrap_or(len.saturating_sub(1))
    }

    pub fn step_count(&self) -> usize {
        self.status.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(index_zero_based: usize) -> AnalysisResult {
        AnalysisResult {
            detected_step: Some(index_zero_based),
            matches_expected: true,
            progress: None,
            completion_evidence: None,
            repeated_completed: false,
            raw_text: format!("Detected Step: {}", index_zero_based + 1),
        }
    }

    #[test]
    fn test_detection_requires_match() {
        let mut tracker = CumulativeTracker::new(5, 2, 3);
        let mut result = detection(1);
        result.matches_expected = false;

        let outcome = tracker.record(&result);
        assert_eq!(outcome.newly_detected, None);
        assert!(tracker.detected().is_empty());
    }

    #[test]
    fn test_monotonic_detection() {
        let mut tracker = CumulativeTracker::new(6, 2, 3);
        let mut seen = BTreeSet::new();

        for index in [0usize, 2, 1, 2, 4, 0, 5] {
            tracker.record(&detection(index));
            seen.insert(index);
            // The cumulative set never shrinks and contains everything seen
            assert!(tracker.detected().is_superset(&seen));
        }
    }

    #[test]
    fn test_skip_detection_beyond_gap() {
        let mut tracker = CumulativeTracker::new(5, 2, 3);
        let outcome = tracker.record(&detection(3));

        assert_eq!(outcome.newly_detected, Some(3));
        assert_eq!(outcome.missed, vec![0, 1]);
        assert_eq!(tracker.statuses()[0], StepStatus::Missed);
        assert_eq!(tracker.statuses()[1], StepStatus::Missed);
        // The step just behind the detection is left pending
        assert_eq!(tracker.statuses()[2], StepStatus::Pending);
    }

    #[test]
    fn test_no_skip_within_gap() {
        let mut tracker = CumulativeTracker::new(5, 2, 3);
        let outcome = tracker.record(&detection(2));

        assert_eq!(outcome.newly_detected, Some(2));
        assert!(outcome.missed.is_empty());
        assert_eq!(tracker.statuses()[0], StepStatus::Pending);
        assert_eq!(tracker.statuses()[1], StepStatus::Pending);
    }

    #[test]
    fn test_idempotent_redetection() {
        let mut tracker = CumulativeTracker::new(5, 2, 3);
        tracker.record(&detection(3));

        let outcome = tracker.record(&detection(3));
        assert_eq!(outcome.newly_detected, None);
        assert!(outcome.missed.is_empty());
        assert_eq!(tracker.detected().len(), 1);
    }

    #[test]
    fn test_missed_step_can_still_be_detected() {
        let mut tracker = CumulativeTracker::new(5, 2, 3);
        tracker.record(&detection(3));
        assert_eq!(tracker.statuses()[0], StepStatus::Missed);

        let outcome = tracker.record(&detection(0));
        assert_eq!(outcome.newly_detected, Some(0));
        assert_eq!(tracker.statuses()[0], StepStatus::Detected);
    }

    #[test]
    fn test_current_display_index() {
        let mut tracker = CumulativeTracker::new(3, 2, 3);
        assert_eq!(tracker.current_display_index(), 0);

        tracker.record(&detection(0));
        assert_eq!(tracker.current_display_index(), 1);

        tracker.record(&detection(1));
        tracker.record(&detection(2));
        // All detected: pinned to the last step
        assert_eq!(tracker.current_display_index(), 2);
    }

    #[test]
    fn test_detection_history_bounded() {
        let mut tracker = CumulativeTracker::new(2, 2, 3);
        for i in 0..5 {
            let mut result = detection(1);
            result.raw_text = format!("analysis {}", i);
            tracker.record(&result);
        }
        assert_eq!(tracker.last_detection(1).unwrap(), "analysis 4");
    }

    #[test]
    fn test_out_of_range_detection_ignored() {
        let mut tracker = CumulativeTracker::new(3, 2, 3);
        let outcome = tracker.record(&detection(7));
        assert_eq!(outcome.newly_detected, None);
        assert!(tracker.detected().is_empty());
    }
}
