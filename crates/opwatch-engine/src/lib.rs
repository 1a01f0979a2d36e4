//! Real-time compliance engine for procedural video monitoring.
//!
//! The pipeline: frames accumulate into overlapping chunks, a single worker
//! drains the dispatch queue in arrival order, each chunk is encoded into a
//! short clip and sent to the video oracle, the free-text reply is parsed
//! into structured signals, the cumulative step tracker and the compliance
//! scanner derive state changes and alerts, and live snapshots go out on the
//! event bus.
//!
//! Entry points:
//! - [`SessionMonitor`]: live chunked monitoring (the canonical path)
//! - [`FrameMonitor`]: per-frame sequential monitoring (alternate mode)
//! - [`ProcedureExtractor`]: one-shot video to reference-procedure pipeline

pub mod broadcast;
pub mod chunker;
pub mod compliance;
pub mod config;
pub mod error;
pub mod extract;
pub mod frame_monitor;
pub mod history;
pub mod parser;
pub mod sequential;
pub mod session;
pub mod tracker;

mod worker;

pub use broadcast::EventBus;
pub use chunker::FrameChunker;
pub use config::MonitorConfig;
pub use error::{EngineError, EngineResult};
pub use extract::{ExtractionOutcome, ProcedureExtractor};
pub use frame_monitor::FrameMonitor;
pub use history::BoundedHistory;
pub use parser::parse_analysis;
pub use sequential::{SeqStepStatus, SequentialOutcome, SequentialTracker};
pub use session::{MonitorContext, SessionMonitor};
pub use tracker::{CumulativeTracker, TrackerOutcome};
