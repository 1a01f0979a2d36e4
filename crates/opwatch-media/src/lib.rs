//! FFmpeg CLI wrapper for the OpWatch monitoring backend.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner
//! - The [`ClipEncoder`] collaborator trait and its FFmpeg implementation

pub mod command;
pub mod encoder;
pub mod error;

pub use command::FfmpegCommand;
pub use encoder::{ClipEncoder, FfmpegEncoder};
pub use error::{MediaError, MediaResult};
