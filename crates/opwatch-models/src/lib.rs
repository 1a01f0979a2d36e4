//! Shared data models for the OpWatch monitoring backend.
//!
//! This crate provides Serde-serializable types for:
//! - Reference procedures and their ordered steps
//! - Monitoring sessions and lifecycle status
//! - Frame chunks and parsed oracle analysis signals
//! - Compliance alerts
//! - Live progress snapshots and broadcast event schemas

pub mod alert;
pub mod analysis;
pub mod chunk;
pub mod event;
pub mod procedure;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod timestamp;

// Re-export common types
pub use alert::{Alert, AlertSeverity, AlertType};
pub use analysis::{AnalysisResult, ProgressPhase};
pub use chunk::FrameChunk;
pub use event::MonitorEvent;
pub use procedure::{DifficultyLevel, ProcedureId, ReferenceProcedure, ReferenceStep};
pub use session::{Session, SessionId, SessionStatus};
pub use snapshot::{ProgressSnapshot, StepDisplayStatus, StepSnapshot};
pub use status::StepStatus;
