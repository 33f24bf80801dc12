//! Engine-wide configuration, consumed once at construction time.

/// Values every module either reads once at construction or never re-reads.
///
/// `Default` matches the fixed constants used throughout this crate (44.1kHz
/// audio, 16 voices, sprite arrays starting at 64 and doubling).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub sample_rate: u32,
    pub max_voices: usize,
    pub sprite_growth_start: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            canvas_width: 320,
            canvas_height: 240,
            sample_rate: 44_100,
            max_voices: 16,
            sprite_growth_start: 64,
        }
    }
}

impl EngineConfig {
    /// Audio frames mixed per video frame, assuming a fixed 60Hz refresh.
    pub fn frames_per_video_frame(&self) -> usize {
        (self.sample_rate as usize) / 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sample_rate, 44_100);
        assert_eq!(cfg.frames_per_video_frame(), 735);
        assert_eq!(cfg.max_voices, 16);
        assert_eq!(cfg.sprite_growth_start, 64);
    }
}
