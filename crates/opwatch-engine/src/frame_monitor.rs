//! Per-frame sequential monitoring (alternate mode).
//!
//! Analyzes single frames against a strictly sequential cursor instead of
//! chunked clips against the cumulative set. Kept as an explicit alternate
//! entry point; live sessions use [`crate::session::SessionMonitor`].

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use opwatch_models::{
    AnalysisResult, MonitorEvent, ProgressSnapshot, ReferenceProcedure, ReferenceStep, SessionId,
    StepDisplayStatus, StepSnapshot,
};
use opwatch_oracle::{build_frame_prompt, FramePromptContext, RemainingEntry};

use crate::broadcast::EventBus;
use crate::compliance;
use crate::error::EngineResult;
use crate::parser::parse_analysis;
use crate::sequential::{SeqStepStatus, SequentialTracker};
use crate::session::MonitorContext;

/// Sequential per-frame monitor.
pub struct FrameMonitor {
    session_id: SessionId,
    procedure_name: String,
    steps: Vec<ReferenceStep>,
    tracker: SequentialTracker,
    previous_analysis: Option<String>,
    frames_seen: u64,
    ctx: Arc<MonitorContext>,
    bus: EventBus,
}

impl FrameMonitor {
    /// Create a monitor over a procedure's step list.
    pub fn new(
        procedure: &ReferenceProcedure,
        session_id: SessionId,
        ctx: Arc<MonitorContext>,
        bus: EventBus,
    ) -> Self {
        Self {
            session_id,
            procedure_name: procedure.procedure_name.clone(),
            steps: procedure.steps.clone(),
            tracker: SequentialTracker::new(procedure.steps.len()),
            previous_analysis: None,
            frames_seen: 0,
            ctx,
            bus,
        }
    }

    /// Analyze one frame and advance the sequential state machine.
    ///
    /// Oracle failures surface to the caller; alert persistence and event
    /// delivery stay best-effort.
    pub async fn analyze_frame(&mut self, frame: &[u8]) -> EngineResult<AnalysisResult> {
        self.frames_seen += 1;

        if self.tracker.is_complete() || self.steps.is_empty() {
            info!(
                "Procedure complete for session {}; frame ignored",
                self.session_id
            );
            return Ok(AnalysisResult::empty(String::new()));
        }

        let expected_index = self.tracker.current_index();
        let expected_step = self.steps[expected_index].clone();

        let prompt = self.build_prompt(&expected_step);
        let raw = self.ctx.oracle.analyze_frame(frame, &prompt).await?;
        self.previous_analysis = Some(raw.clone());

        let result = parse_analysis(&raw);
        let outcome = self.tracker.record(&result);

        let mut alerts = Vec::new();
        for &missed in &outcome.missed {
            alerts.push(compliance::missed_step_alert(
                &self.steps[missed],
                missed,
                &self.session_id,
            ));
        }
        alerts.extend(compliance::scan(&raw, &expected_step, &self.session_id));

        if !alerts.is_empty() {
            if let Err(e) = self.ctx.alerts.insert_batch(&alerts).await {
                warn!("Failed to persist {} alerts: {}", alerts.len(), e);
            }
            for alert in alerts {
                self.bus.publish(MonitorEvent::Alert(alert));
            }
        }

        self.publish_snapshot(&result);
        Ok(result)
    }

    /// Manually advance to the next step.
    pub fn advance_step(&mut self) {
        self.tracker.advance();
        info!(
            "Session {} manually advanced to step index {}",
            self.session_id,
            self.tracker.current_index()
        );
    }

    pub fn current_step_index(&self) -> usize {
        self.tracker.current_index()
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    fn build_prompt(&self, expected_step: &ReferenceStep) -> String {
        let completed = self
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| self.tracker.statuses()[*i] == SeqStepStatus::Completed)
            .map(|(_, s)| format!("Step {}: {}", s.step_number, s.step_name))
            .collect();

        let cursor = self.tracker.current_index();
        let remaining = self
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                matches!(
                    self.tracker.statuses()[*i],
                    SeqStepStatus::Pending | SeqStepStatus::Current
                )
            })
            .map(|(i, s)| RemainingEntry {
                step_number: s.step_number,
                step_name: s.step_name.clone(),
                expected_next: i == cursor,
            })
            .collect();

        build_frame_prompt(&FramePromptContext {
            procedure_name: &self.procedure_name,
            expected_step,
            completed,
            remaining,
            previous_analysis: self.previous_analysis.as_deref(),
        })
    }

    fn publish_snapshot(&self, result: &AnalysisResult) {
        let current = self
            .tracker
            .current_index()
            .min(self.steps.len().saturating_sub(1));
        let all_steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let status = match self.tracker.statuses()[i] {
                    SeqStepStatus::Completed => StepDisplayStatus::Completed,
                    SeqStepStatus::Missed => StepDisplayStatus::Missed,
                    _ => StepDisplayStatus::Pending,
                };
                StepSnapshot {
                    step_number: s.step_number,
                    step_name: s.step_name.clone(),
                    description: s.description.clone(),
                    is_critical: s.is_critical,
                    status,
                    detected: status == StepDisplayStatus::Completed,
                }
            })
            .collect();

        let snapshot = ProgressSnapshot {
            frame_count: self.frames_seen,
            start_frame: self.frames_seen,
            end_frame: self.frames_seen,
            current_step_index: current,
            current_step_name: self.steps[current].step_name.clone(),
            detected_step_index: result.detected_step,
            matches_expected: result.matches_expected,
            expected_step: self.steps[current].clone(),
            all_steps,
            analysis_text: result.raw_text.clone(),
            timestamp: Utc::now(),
        };

        self.bus.publish(MonitorEvent::Snapshot(snapshot));
    }
}
