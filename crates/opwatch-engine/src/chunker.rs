//! Frame accumulation into overlapping analysis windows.

use opwatch_models::FrameChunk;

/// Accumulates raw frames and emits fixed-size overlapping chunks.
///
/// When the buffer reaches `chunk_size` frames, the oldest `chunk_size`
/// frames are emitted as one chunk and the last `overlap` frames are kept as
/// the seed for the next window, so consecutive chunks share `overlap`
/// frames. Frame indices are 1-based.
#[derive(Debug)]
pub struct FrameChunker {
    buffer: Vec<Vec<u8>>,
    frame_count: u64,
    chunk_size: usize,
    overlap: usize,
}

impl FrameChunker {
    /// Create a chunker. `overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            buffer: Vec::new(),
            frame_count: 0,
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Append a frame; returns a chunk when the window fills.
    pub fn push(&mut self, frame: Vec<u8>) -> Option<FrameChunk> {
        self.frame_count += 1;
        self.buffer.push(frame);

        if self.buffer.len() < self.chunk_size {
            return None;
        }

        let frames: Vec<Vec<u8>> = self.buffer[..self.chunk_size].to_vec();
        let end_frame = self.frame_count;
        let start_frame = end_frame - self.chunk_size as u64 + 1;

        // Keep the overlap tail as the seed for the next window
        self.buffer.drain(..self.chunk_size - self.overlap);

        Some(FrameChunk {
            frames,
            start_frame,
            end_frame,
        })
    }

    /// Total frames ingested.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop buffered frames; the frame counter is retained.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
