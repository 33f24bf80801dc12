//! Sound playback: decoded PCM payloads, a slab-based voice list, and a
//! fixed-rate mixer producing one video frame's worth of stereo audio.

pub mod mixer;
#[cfg(feature = "std")]
pub mod wav;

use alloc::sync::Arc;
use alloc::vec::Vec;

/// A decoded sound, ready to be played. Always interleaved stereo `i16` at
/// the mixer's configured sample rate (resampling/upmixing happens once at
/// ingest time, see `wav::decode`).
pub struct Sound {
    /// Interleaved stereo frames: `frames[2*i]` = left, `frames[2*i+1]` = right.
    pub frames: Arc<Vec<i16>>,
}

impl Sound {
    pub fn frame_count(&self) -> usize {
        self.frames.len() / 2
    }

    pub fn from_stereo_frames(frames: Vec<i16>) -> Self {
        Sound {
            frames: Arc::new(frames),
        }
    }
}

pub use mixer::{FinishedCallback, Mixer, VoiceHandle};
