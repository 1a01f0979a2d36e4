//! Encoding frame windows into short playable clips.

use async_trait::async_trait;
use tracing::debug;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Encoder collaborator: turns a window of still frames into a short clip.
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    /// Encode JPEG frames (1 fps sampling) into MP4 bytes.
    async fn encode(&self, frames: &[Vec<u8>]) -> MediaResult<Vec<u8>>;
}

/// FFmpeg-based [`ClipEncoder`].
///
/// Frames are written to a scratch directory as `frame_%04d.jpg` and encoded
/// at 1 fps with H.264 / yuv420p and `+faststart` so the result is playable
/// as soon as it is assembled.
pub struct FfmpegEncoder {
    /// Encode timeout in seconds
    timeout_secs: u64,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self { timeout_secs: 60 }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipEncoder for FfmpegEncoder {
    async fn encode(&self, frames: &[Vec<u8>]) -> MediaResult<Vec<u8>> {
        if frames.is_empty() {
            return Err(MediaError::EmptyInput);
        }

        let dir = tempfile::tempdir()?;

        for (i, frame) in frames.iter().enumerate() {
            let path = dir.path().join(format!("frame_{:04}.jpg", i));
            tokio::fs::write(&path, frame).await?;
        }

        let pattern = dir.path().join("frame_%04d.jpg");
        let output = dir.path().join("chunk.mp4");

        FfmpegCommand::new(&pattern, &output)
            .framerate(1)
            .video_codec("libx264")
            .pixel_format("yuv420p")
            .movflags("+faststart")
            .run(Some(self.timeout_secs))
            .await?;

        let bytes = tokio::fs::read(&output).await?;
        debug!(
            "Encoded {} frames into {} byte clip",
            frames.len(),
            bytes.len()
        );

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let encoder = FfmpegEncoder::new();
        let result = encoder.encode(&[]).await;
        assert!(matches!(result, Err(MediaError::EmptyInput)));
    }
}
