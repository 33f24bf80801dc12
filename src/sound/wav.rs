//! WAV ingest: decode, upmix mono to stereo, and resample to the mixer's
//! fixed sample rate. Gated behind the `std` feature because `hound` and
//! `rubato` both want a `std::io`-shaped world.

use alloc::format;
use alloc::vec::Vec;
use std::io::Cursor;

use rubato::Resampler;

use crate::error::{EngineError, Result};

use super::Sound;

/// Decodes a WAV byte stream into a `Sound` at `target_rate`, upmixing mono
/// to stereo and resampling if the source rate differs.
pub fn decode(bytes: &[u8], target_rate: u32) -> Result<Sound> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| EngineError::DecodeError {
        format: "wav",
        detail: e.to_string(),
    })?;
    let spec = reader.spec();
    if spec.channels > 2 {
        return Err(EngineError::UnsupportedChannels {
            found: spec.channels,
        });
    }

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v >> (spec.bits_per_sample.saturating_sub(16))) as i16))
            .collect::<core::result::Result<_, _>>()
            .map_err(|e| EngineError::DecodeError {
                format: "wav",
                detail: e.to_string(),
            })?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v * i16::MAX as f32) as i16))
            .collect::<core::result::Result<_, _>>()
            .map_err(|e| EngineError::DecodeError {
                format: "wav",
                detail: e.to_string(),
            })?,
    };

    let stereo: Vec<i16> = if spec.channels == 1 {
        samples.iter().flat_map(|&s| [s, s]).collect()
    } else {
        samples
    };

    let resampled = if spec.sample_rate == target_rate {
        stereo
    } else {
        resample_stereo(&stereo, spec.sample_rate, target_rate)?
    };

    Ok(Sound::from_stereo_frames(resampled))
}

/// Speex-style resampling substitute: converts interleaved stereo `i16` at
/// `from_rate` to `to_rate` via `rubato`'s sinc interpolator (see
/// `DESIGN.md` for why `rubato` stands in for the original's resampler).
fn resample_stereo(interleaved: &[i16], from_rate: u32, to_rate: u32) -> Result<Vec<i16>> {
    let frame_count = interleaved.len() / 2;
    let left: Vec<f64> = (0..frame_count).map(|i| interleaved[2 * i] as f64 / 32768.0).collect();
    let right: Vec<f64> = (0..frame_count)
        .map(|i| interleaved[2 * i + 1] as f64 / 32768.0)
        .collect();

    let ratio = to_rate as f64 / from_rate as f64;
    let params = rubato::SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: rubato::SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: rubato::WindowFunction::BlackmanHarris2,
    };
    let mut resampler = rubato::SincFixedIn::<f64>::new(ratio, 2.0, params, frame_count, 2)
        .map_err(|e| EngineError::ResamplerError {
            detail: format!("{e}"),
        })?;

    let output = resampler
        .process(&[left, right], None)
        .map_err(|e| EngineError::ResamplerError {
            detail: format!("{e}"),
        })?;

    let out_frames = output[0].len();
    let mut interleaved_out = Vec::with_capacity(out_frames * 2);
    for i in 0..out_frames {
        let l = (output[0][i] * 32768.0).clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        let r = (output[1][i] * 32768.0).clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        interleaved_out.push(l);
        interleaved_out.push(r);
    }
    Ok(interleaved_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn mono_wav_upmixes_to_stereo() {
        let bytes = make_wav(44_100, 1, &[100, 200, 300]);
        let sound = decode(&bytes, 44_100).unwrap();
        assert_eq!(sound.frame_count(), 3);
        assert_eq!(sound.frames[0], 100);
        assert_eq!(sound.frames[1], 100);
    }

    #[test]
    fn stereo_wav_passes_through_at_matching_rate() {
        let bytes = make_wav(44_100, 2, &[1, -1, 2, -2]);
        let sound = decode(&bytes, 44_100).unwrap();
        assert_eq!(sound.frame_count(), 2);
        assert_eq!(&*sound.frames, &[1, -1, 2, -2]);
    }

    #[test]
    fn too_many_channels_is_rejected() {
        let bytes = make_wav(44_100, 3, &[1, 2, 3]);
        assert!(matches!(
            decode(&bytes, 44_100),
            Err(EngineError::UnsupportedChannels { found: 3 })
        ));
    }
}
