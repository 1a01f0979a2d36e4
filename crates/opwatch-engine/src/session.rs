//! Session lifecycle management.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use opwatch_media::ClipEncoder;
use opwatch_models::{
    MonitorEvent, ProcedureId, ReferenceStep, Session, SessionId, SessionStatus,
};
use opwatch_oracle::VideoOracle;
use opwatch_store::{AlertRepository, ProcedureRepository, SessionRepository};

use crate::broadcast::EventBus;
use crate::chunker::FrameChunker;
use crate::config::MonitorConfig;
use crate::error::{EngineError, EngineResult};
use crate::worker::ChunkWorker;

/// Collaborator handles shared by the engine's services.
///
/// Constructed once and passed down; the engine never reaches for
/// process-wide connection state.
pub struct MonitorContext {
    pub oracle: Arc<dyn VideoOracle>,
    pub encoder: Arc<dyn ClipEncoder>,
    pub procedures: Arc<dyn ProcedureRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

/// One live monitoring session.
///
/// Owns the frame chunker, the dispatch queue sender and the worker task.
/// Frame ingestion is fire-and-forget: it never waits on the oracle.
pub struct SessionMonitor {
    session: Session,
    steps: Vec<ReferenceStep>,
    chunker: FrameChunker,
    tx: Option<mpsc::UnboundedSender<opwatch_models::FrameChunk>>,
    running: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    bus: EventBus,
    ctx: Arc<MonitorContext>,
    config: MonitorConfig,
}

impl SessionMonitor {
    /// Start monitoring against a stored reference procedure.
    ///
    /// Loads the procedure (missing definitions are fatal), snapshots its
    /// step list, persists an active session record and spawns the worker.
    pub async fn start(
        procedure_id: &ProcedureId,
        operator_id: &str,
        config: MonitorConfig,
        ctx: Arc<MonitorContext>,
    ) -> EngineResult<Self> {
        let procedure = ctx
            .procedures
            .get(procedure_id)
            .await?
            .ok_or_else(|| EngineError::ProcedureNotFound(procedure_id.to_string()))?;

        if procedure.steps.is_empty() {
            return Err(EngineError::EmptyProcedure(procedure_id.to_string()));
        }

        // Snapshot: the session is immune to later edits of the definition
        let steps = procedure.steps.clone();

        let mut session = Session::new(procedure_id.clone(), operator_id);
        session
            .metadata
            .insert("procedure_name".to_string(), json!(procedure.procedure_name));
        session
            .metadata
            .insert("total_steps".to_string(), json!(steps.len()));
        ctx.sessions.create(&session).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (running, running_rx) = watch::channel(true);
        let bus = EventBus::new(config.event_capacity);

        let worker = ChunkWorker::new(
            session.session_id.clone(),
            procedure.procedure_name.clone(),
            steps.clone(),
            config.clone(),
            rx,
            running_rx,
            Arc::clone(&ctx),
            bus.clone(),
        );
        let worker = tokio::spawn(worker.run());

        info!(
            "Live session {} started: procedure '{}', {} steps",
            session.session_id,
            procedure.procedure_name,
            steps.len()
        );

        Ok(Self {
            chunker: FrameChunker::new(config.chunk_size, config.chunk_overlap),
            session,
            steps,
            tx: Some(tx),
            running,
            worker: Some(worker),
            bus,
            ctx,
            config,
        })
    }

    /// Ingest one raw frame (JPEG bytes).
    ///
    /// Full windows are handed to the dispatch queue without waiting for
    /// the oracle. After stop, frames still accumulate in the buffer but
    /// chunks are no longer dispatched.
    pub fn ingest_frame(&mut self, frame: Vec<u8>) {
        if let Some(chunk) = self.chunker.push(frame) {
            match &self.tx {
                Some(tx) => {
                    if tx.send(chunk).is_err() {
                        warn!(
                            "Dispatch queue closed for session {}; dropping chunk",
                            self.session.session_id
                        );
                    }
                }
                None => debug!(
                    "Session {} stopped; chunk not dispatched",
                    self.session.session_id
                ),
            }
        }
    }

    /// Stop the session and finalize its record.
    ///
    /// Flips the running flag (the worker discards queued work), closes the
    /// queue, clears the frame buffer and awaits worker termination within
    /// the shutdown timeout. Safe to call more than once.
    pub async fn stop(&mut self) -> EngineResult<()> {
        if self.worker.is_none() {
            debug!("Session {} already stopped", self.session.session_id);
            return Ok(());
        }

        let _ = self.running.send(false);
        // Closing the queue lets the worker drain and discard whatever is
        // still buffered, then exit
        self.tx = None;
        self.chunker.clear();

        if let Some(worker) = self.worker.take() {
            let abort = worker.abort_handle();
            if tokio::time::timeout(self.config.shutdown_timeout, worker)
                .await
                .is_err()
            {
                warn!(
                    "Worker for session {} did not stop within {:?}; aborting",
                    self.session.session_id, self.config.shutdown_timeout
                );
                abort.abort();
            }
        }

        let frames = self.chunker.frame_count();
        self.session.end_time = Some(Utc::now());
        self.session.status = SessionStatus::Completed;
        self.session.frame_count = frames;

        // Best-effort: a failed write must not keep the session alive
        if let Err(e) = self
            .ctx
            .sessions
            .finalize(
                &self.session.session_id,
                self.session.end_time.unwrap_or_else(Utc::now),
                SessionStatus::Completed,
                frames,
            )
            .await
        {
            warn!(
                "Failed to finalize session {}: {}",
                self.session.session_id, e
            );
        }

        self.bus
            .publish(MonitorEvent::stopped(self.session.session_id.clone(), frames));

        info!(
            "Live session {} stopped after {} frames",
            self.session.session_id, frames
        );
        Ok(())
    }

    /// Subscribe to live progress snapshots and alerts.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.bus.subscribe()
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session.session_id
    }

    /// Snapshot of the session record as last known locally.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Step list the session was started with.
    pub fn steps(&self) -> &[ReferenceStep] {
        &self.steps
    }

    /// Whether the worker is still accepting chunks.
    pub fn is_running(&self) -> bool {
        *self.running.borrow() && self.worker.is_some()
    }

    /// Frames currently waiting in the chunk buffer.
    pub fn buffered_frames(&self) -> usize {
        self.chunker.buffered()
    }

    /// Total frames ingested so far.
    pub fn frame_count(&self) -> u64 {
        self.chunker.frame_count()
    }
}
