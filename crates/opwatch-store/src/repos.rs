//! Repository traits for the persistence collaborators.
//!
//! Handles are constructed explicitly and passed down; the engine never
//! reaches for process-wide connection state. A real database backend slots
//! in behind these traits without touching the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use opwatch_models::{Alert, ProcedureId, ReferenceProcedure, Session, SessionId, SessionStatus};

use crate::error::StoreResult;

/// Storage for reference procedure definitions.
#[async_trait]
pub trait ProcedureRepository: Send + Sync {
    /// Persist a new procedure definition.
    async fn create(&self, procedure: &ReferenceProcedure) -> StoreResult<()>;

    /// Fetch a procedure by ID.
    async fn get(&self, procedure_id: &ProcedureId) -> StoreResult<Option<ReferenceProcedure>>;

    /// List all stored procedures.
    async fn list(&self) -> StoreResult<Vec<ReferenceProcedure>>;
}

/// Storage for monitoring session records.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session record.
    async fn create(&self, session: &Session) -> StoreResult<()>;

    /// Fetch a session by ID.
    async fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Update the derived current step of an active session.
    async fn update_current_step(&self, session_id: &SessionId, step: usize) -> StoreResult<()>;

    /// Record end time, terminal status and final frame count.
    async fn finalize(
        &self,
        session_id: &SessionId,
        end_time: DateTime<Utc>,
        status: SessionStatus,
        frame_count: u64,
    ) -> StoreResult<()>;
}

/// Append-only storage for compliance alerts.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persist a batch of alerts from one processed chunk.
    async fn insert_batch(&self, alerts: &[Alert]) -> StoreResult<()>;

    /// List alerts for a session in insertion order.
    async fn list_for_session(&self, session_id: &SessionId) -> StoreResult<Vec<Alert>>;

    /// Mark an alert acknowledged.
    async fn acknowledge(&self, alert_id: &str) -> StoreResult<()>;
}
