//! Gemini video-oracle integration for the OpWatch monitoring backend.
//!
//! This crate provides:
//! - The [`VideoOracle`] contract the engine depends on
//! - A Gemini REST implementation with model fallback
//! - Prompt builders for chunked and per-frame monitoring
//! - The one-shot procedure-extraction pipeline (prompt, schema, parsing)

pub mod client;
pub mod error;
pub mod extract;
pub mod prompt;

pub use client::{GeminiClient, VideoOracle};
pub use error::{OracleError, OracleResult};
pub use extract::{
    extraction_prompt, extraction_schema, parse_extraction, ExtractedProcedure, ExtractedStep,
};
pub use prompt::{
    build_chunk_prompt, build_frame_prompt, ChunkPromptContext, DetectedEntry, FramePromptContext,
    RemainingEntry,
};
