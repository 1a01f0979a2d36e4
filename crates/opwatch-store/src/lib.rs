//! Persistence collaborators for the OpWatch monitoring backend.
//!
//! This crate provides:
//! - Repository traits for procedures, sessions and alerts
//! - An in-memory implementation for tests and single-process runs

pub mod error;
pub mod memory;
pub mod repos;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repos::{AlertRepository, ProcedureRepository, SessionRepository};
