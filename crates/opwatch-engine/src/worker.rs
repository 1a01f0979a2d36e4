//! Chunk dispatch worker.
//!
//! Exactly one worker task drains the session's FIFO queue, so chunks are
//! processed in strict arrival order and no two oracle calls for the same
//! session are ever in flight together. The worker owns all tracker state
//! while the session runs; nothing else mutates it.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use opwatch_models::{
    AnalysisResult, FrameChunk, MonitorEvent, ProgressSnapshot, ReferenceStep, SessionId,
    StepDisplayStatus, StepSnapshot,
};
use opwatch_oracle::{build_chunk_prompt, ChunkPromptContext, DetectedEntry, RemainingEntry};

use crate::broadcast::EventBus;
use crate::compliance;
use crate::config::MonitorConfig;
use crate::error::EngineResult;
use crate::history::BoundedHistory;
use crate::parser::parse_analysis;
use crate::session::MonitorContext;
use crate::tracker::CumulativeTracker;

pub(crate) struct ChunkWorker {
    session_id: SessionId,
    procedure_name: String,
    steps: Vec<ReferenceStep>,
    tracker: CumulativeTracker,
    chunk_history: BoundedHistory<String>,
    persisted_step: usize,
    rx: mpsc::UnboundedReceiver<FrameChunk>,
    running: watch::Receiver<bool>,
    ctx: Arc<MonitorContext>,
    bus: EventBus,
    config: MonitorConfig,
}

impl ChunkWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: SessionId,
        procedure_name: String,
        steps: Vec<ReferenceStep>,
        config: MonitorConfig,
        rx: mpsc::UnboundedReceiver<FrameChunk>,
        running: watch::Receiver<bool>,
        ctx: Arc<MonitorContext>,
        bus: EventBus,
    ) -> Self {
        let tracker = CumulativeTracker::new(
            steps.len(),
            config.missed_step_gap,
            config.detection_history_limit,
        );
        let chunk_history = BoundedHistory::new(config.chunk_history_limit);
        Self {
            session_id,
            procedure_name,
            steps,
            tracker,
            chunk_history,
            persisted_step: 0,
            rx,
            running,
            ctx,
            bus,
            config,
        }
    }

    /// Drain the queue until it closes.
    ///
    /// The wait is bounded by the poll interval so a stop signal is observed
    /// promptly even with an empty queue. Once the running flag is false,
    /// received chunks are discarded without processing; per-chunk failures
    /// never terminate the loop.
    pub(crate) async fn run(mut self) {
        info!("Chunk worker started for session {}", self.session_id);

        loop {
            match tokio::time::timeout(self.config.queue_poll_interval, self.rx.recv()).await {
                Ok(Some(chunk)) => {
                    if !*self.running.borrow() {
                        debug!(
                            "Session {} stopped; discarding chunk {}-{}",
                            self.session_id, chunk.start_frame, chunk.end_frame
                        );
                        counter!("opwatch_chunks_discarded_total").increment(1);
                        continue;
                    }

                    info!(
                        "Processing chunk {}-{} for session {}",
                        chunk.start_frame, chunk.end_frame, self.session_id
                    );
                    if let Err(e) = self.process_chunk(chunk).await {
                        counter!("opwatch_chunk_failures_total").increment(1);
                        error!(
                            "Chunk processing failed for session {}: {}",
                            self.session_id, e
                        );
                    }
                }
                // Queue closed: all work is drained or discarded
                Ok(None) => break,
                // Poll timeout: loop to observe the running flag
                Err(_) => continue,
            }
        }

        info!("Chunk worker stopped for session {}", self.session_id);
    }

    async fn process_chunk(&mut self, chunk: FrameChunk) -> EngineResult<()> {
        if self.steps.is_empty() {
            return Ok(());
        }

        let expected_index = self.tracker.current_display_index();
        let expected_step = self.steps[expected_index].clone();

        let prompt = self.build_prompt(&chunk, &expected_step);
        let clip = self.ctx.encoder.encode(&chunk.frames).await?;
        let raw = self.ctx.oracle.analyze_clip(&clip, &prompt).await?;

        self.chunk_history.push(raw.clone());

        let result = parse_analysis(&raw);
        debug!(
            "Chunk {}-{} parsed: detected={:?} match={} progress={:?}",
            chunk.start_frame,
            chunk.end_frame,
            result.detected_step,
            result.matches_expected,
            result.progress
        );

        let outcome = self.tracker.record(&result);
        counter!("opwatch_chunks_processed_total").increment(1);

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
            counter!("opwatch_alerts_emitted_total").increment(alerts.len() as u64);
            // Best-effort persistence: monitoring continues even when
            // durability is temporarily degraded
            if let Err(e) = self.ctx.alerts.insert_batch(&alerts).await {
                warn!("Failed to persist {} alerts: {}", alerts.len(), e);
            }
            for alert in alerts {
                self.bus.publish(MonitorEvent::Alert(alert));
            }
        }

        self.publish_snapshot(&chunk, &result);

        let display = self.tracker.current_display_index();
        if display != self.persisted_step {
            match self
                .ctx
                .sessions
                .update_current_step(&self.session_id, display)
                .await
            {
                Ok(()) => self.persisted_step = display,
                Err(e) => warn!("Failed to persist current step: {}", e),
            }
        }

        Ok(())
    }

    /// Re-derive the full session picture for the oracle prompt.
    fn build_prompt(&self, chunk: &FrameChunk, expected_step: &ReferenceStep) -> String {
        let detected = self
            .tracker
            .detected()
            .iter()
            .map(|&i| DetectedEntry {
                step_number: self.steps[i].step_number,
                step_name: self.steps[i].step_name.clone(),
                last_seen: self.tracker.last_detection(i).cloned(),
            })
            .collect();

        let next_expected = self.tracker.current_display_index();
        let remaining = self
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.tracker.is_detected(*i))
            .map(|(i, s)| RemainingEntry {
                step_number: s.step_number,
                step_name: s.step_name.clone(),
                expected_next: i == next_expected,
            })
            .collect();

        let history: Vec<String> = self.chunk_history.iter().cloned().collect();

        build_chunk_prompt(&ChunkPromptContext {
            procedure_name: &self.procedure_name,
            expected_step,
            detected,
            remaining,
            history: &history,
            clip_frames: chunk.len(),
        })
    }

    fn publish_snapshot(&self, chunk: &FrameChunk, result: &AnalysisResult) {
        let current = self.tracker.current_display_index();
        let all_steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let detected = self.tracker.is_detected(i);
                StepSnapshot {
                    step_number: s.step_number,
                    step_name: s.step_name.clone(),
                    description: s.description.clone(),
                    is_critical: s.is_critical,
                    status: StepDisplayStatus::from_raw(self.tracker.statuses()[i], detected),
                    detected,
                }
            })
            .collect();

        let snapshot = ProgressSnapshot {
            frame_count: chunk.end_frame,
            start_frame: chunk.start_frame,
            end_frame: chunk.end_frame,
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
