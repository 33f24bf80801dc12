//! Slab-based voice list and the per-video-frame mix step.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use super::Sound;

/// Called once when a voice finishes naturally (never on explicit `stop`).
pub type FinishedCallback = Box<dyn FnMut() + Send>;

/// A stable handle to a playing voice, valid until the voice finishes or is
/// stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHandle(usize);

struct VoiceSlot {
    sound: Sound,
    volume: u8,
    repeat: bool,
    finished_cb: Option<FinishedCallback>,
    position: u64,
}

/// Owned, caller-held mixer state: the voice slab plus per-frame scratch
/// and output buffers (see `DESIGN.md`'s note on why this is not global
/// state, unlike the allocator hook).
pub struct Mixer {
    frames_per_video_frame: usize,
    voices: Vec<Option<VoiceSlot>>,
    free_list: Vec<usize>,
    scratch: Vec<i32>,
    output: Vec<i16>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        let frames_per_video_frame = (sample_rate as usize) / 60;
        Mixer {
            frames_per_video_frame,
            voices: Vec::new(),
            free_list: Vec::new(),
            scratch: vec![0i32; frames_per_video_frame * 2],
            output: vec![0i16; frames_per_video_frame * 2],
        }
    }

    pub fn frames_per_video_frame(&self) -> usize {
        self.frames_per_video_frame
    }

    /// Starts a new voice playing `sound`. Reuses a free slab slot when one
    /// exists, matching the original's slot-reuse-on-play behavior.
    pub fn play(
        &mut self,
        sound: Sound,
        volume: u8,
        repeat: bool,
        finished_cb: Option<FinishedCallback>,
    ) -> VoiceHandle {
        let slot = VoiceSlot {
            sound,
            volume,
            repeat,
            finished_cb,
            position: 0,
        };
        if let Some(idx) = self.free_list.pop() {
            self.voices[idx] = Some(slot);
            VoiceHandle(idx)
        } else {
            self.voices.push(Some(slot));
            VoiceHandle(self.voices.len() - 1)
        }
    }

    pub fn set_volume(&mut self, handle: VoiceHandle, volume: u8) {
        if let Some(Some(slot)) = self.voices.get_mut(handle.0) {
            slot.volume = volume;
        }
    }

    /// Stops a voice immediately, invoking its `finished_cb` first (the
    /// callback fires on both natural end and explicit stop).
    pub fn stop(&mut self, handle: VoiceHandle) {
        if let Some(slot) = self.voices.get_mut(handle.0).and_then(|v| v.take()) {
            self.free_slot(handle.0, slot);
        }
    }

    pub fn stop_all(&mut self) {
        for idx in 0..self.voices.len() {
            if let Some(slot) = self.voices[idx].take() {
                self.free_slot(idx, slot);
            }
        }
    }

    fn free_slot(&mut self, idx: usize, mut slot: VoiceSlot) {
        if let Some(cb) = slot.finished_cb.as_mut() {
            cb();
        }
        self.free_list.push(idx);
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    /// Mixes one video frame's worth of audio (`frames_per_video_frame`
    /// stereo frames) and returns the interleaved `i16` output, valid until
    /// the next call to `mix`.
    pub fn mix(&mut self) -> &[i16] {
        self.scratch.fill(0);
        let f = self.frames_per_video_frame;

        let mut finished = Vec::new();
        for (idx, slot_opt) in self.voices.iter_mut().enumerate() {
            let Some(slot) = slot_opt else { continue };
            let mut frames_remaining = f;
            let mut scratch_pos = 0usize;

            loop {
                let total_frames = slot.sound.frame_count() as u64;
                let available = (total_frames - slot.position) as usize;
                let take = available.min(frames_remaining);

                // vol' = volume + (volume >= 128 ? 1 : 0), unity at 256.
                let vol_scaled = slot.volume as u32 + if slot.volume >= 128 { 1 } else { 0 };
                let src_start = (slot.position as usize) * 2;
                for i in 0..take * 2 {
                    let sample = slot.sound.frames[src_start + i] as i32;
                    self.scratch[scratch_pos + i] += (sample * vol_scaled as i32) / 256;
                }
                slot.position += take as u64;
                scratch_pos += take * 2;
                frames_remaining -= take;

                if frames_remaining == 0 {
                    break;
                }
                // Voice reached its end with frames still owed this block.
                // A zero-length sound makes no progress per lap (`take == 0`);
                // treat that as finished rather than spinning forever.
                if slot.repeat && take > 0 {
                    slot.position = 0;
                    continue;
                } else {
                    finished.push(idx);
                    break;
                }
            }
        }

        for idx in finished {
            if let Some(slot) = self.voices[idx].take() {
                self.free_slot(idx, slot);
            }
        }

        for (out, &s) in self.output.iter_mut().zip(self.scratch.iter()) {
            *out = s.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frames: usize, value: i16) -> Sound {
        Sound::from_stereo_frames(vec![value; frames * 2])
    }

    #[test]
    fn mix_output_has_exact_frame_count() {
        let mut mixer = Mixer::new(44_100);
        let out = mixer.mix();
        assert_eq!(out.len(), 735 * 2);
    }

    #[test]
    fn single_full_volume_voice_passes_through() {
        let mut mixer = Mixer::new(44_100);
        mixer.play(tone(1000, 1000), 255, false, None);
        let out = mixer.mix();
        // volume 255 -> vol_scaled 256 -> sample * 256 / 256 == sample.
        assert_eq!(out[0], 1000);
        assert_eq!(out[1], 1000);
    }

    #[test]
    fn two_voices_sum_and_saturate() {
        let mut mixer = Mixer::new(44_100);
        mixer.play(tone(1000, 20_000), 255, false, None);
        mixer.play(tone(1000, 20_000), 255, false, None);
        let out = mixer.mix();
        assert_eq!(out[0], i16::MAX);
    }

    #[test]
    fn short_voice_without_repeat_finishes_and_is_removed() {
        let mut mixer = Mixer::new(44_100);
        mixer.play(tone(10, 500), 255, false, None);
        assert_eq!(mixer.active_voice_count(), 1);
        mixer.mix();
        assert_eq!(mixer.active_voice_count(), 0);
    }

    #[test]
    fn repeating_voice_wraps_and_keeps_playing() {
        let mut mixer = Mixer::new(44_100);
        mixer.play(tone(10, 500), 255, true, None);
        mixer.mix();
        assert_eq!(mixer.active_voice_count(), 1);
    }

    #[test]
    fn repeating_empty_voice_finishes_instead_of_hanging() {
        let mut mixer = Mixer::new(44_100);
        mixer.play(Sound::from_stereo_frames(Vec::new()), 255, true, None);
        let out = mixer.mix();
        assert_eq!(out.len(), 735 * 2);
        assert_eq!(mixer.active_voice_count(), 0);
    }

    #[test]
    fn stop_invokes_finished_callback() {
        use core::sync::atomic::{AtomicBool, Ordering};
        static CALLED: AtomicBool = AtomicBool::new(false);
        let mut mixer = Mixer::new(44_100);
        let handle = mixer.play(
            tone(1000, 0),
            255,
            false,
            Some(Box::new(|| CALLED.store(true, Ordering::SeqCst))),
        );
        mixer.stop(handle);
        assert!(CALLED.load(Ordering::SeqCst));
    }
}
