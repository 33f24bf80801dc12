//! Rectangular ARGB8888 pixel buffers, either owned or a sub-rectangle view
//! over a parent. PNG/JPEG decode is a thin std-gated convenience layer; the
//! decoders themselves are treated as black boxes (see `SPEC_FULL.md` §1/§6).

use alloc::vec;
use alloc::vec::Vec;

/// One 32-bit pixel, stored `0xAABBGGRR` on little-endian targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Argb8888(pub u32);

impl Argb8888 {
    pub fn from_channels(r: u8, g: u8, b: u8, a: u8) -> Self {
        Argb8888(u32::from_le_bytes([r, g, b, a]))
    }

    pub fn r(self) -> u8 {
        self.0.to_le_bytes()[0]
    }

    pub fn g(self) -> u8 {
        self.0.to_le_bytes()[1]
    }

    pub fn b(self) -> u8 {
        self.0.to_le_bytes()[2]
    }

    pub fn a(self) -> u8 {
        self.0.to_le_bytes()[3]
    }
}

/// A rectangular view over ARGB8888 pixels, either owned or a borrowed
/// sub-rectangle of another `PixelSource`. Sub-sources never outlive the
/// parent because they hold a lifetime-bound slice, not a raw pointer.
pub struct PixelSource<'a> {
    width: u32,
    height: u32,
    pitch: u32,
    /// Column offset of `(0, 0)` within each pitched row of `storage`. Zero
    /// for owned buffers; non-zero for a sub-rectangle view.
    x_offset: u32,
    storage: Storage<'a>,
}

enum Storage<'a> {
    Owned(Vec<Argb8888>),
    Borrowed(&'a [Argb8888]),
}

impl<'a> PixelSource<'a> {
    pub fn new(width: u32, height: u32) -> Self {
        PixelSource {
            width,
            height,
            pitch: width,
            x_offset: 0,
            storage: Storage::Owned(vec![Argb8888::default(); (width * height) as usize]),
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Argb8888>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        PixelSource {
            width,
            height,
            pitch: width,
            x_offset: 0,
            storage: Storage::Owned(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    fn pixels(&self) -> &[Argb8888] {
        match &self.storage {
            Storage::Owned(v) => v,
            Storage::Borrowed(s) => s,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Argb8888 {
        self.pixels()[(y * self.pitch + self.x_offset + x) as usize]
    }

    pub fn row(&self, y: u32) -> &[Argb8888] {
        let start = (y * self.pitch + self.x_offset) as usize;
        &self.pixels()[start..start + self.width as usize]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, px: Argb8888) {
        let pitch = self.pitch;
        let x_offset = self.x_offset;
        match &mut self.storage {
            Storage::Owned(v) => v[(y * pitch + x_offset + x) as usize] = px,
            Storage::Borrowed(_) => panic!("cannot write through a borrowed sub pixel source"),
        }
    }

    /// A non-owning view into `self` covering `[x0, x0+w) x [y0, y0+h)`.
    /// Lives no longer than `self` (enforced by the `'a` borrow, the safe
    /// equivalent of the original's non-owning parent back-reference).
    pub fn sub_rect(&'a self, x0: u32, y0: u32, w: u32, h: u32) -> PixelSource<'a> {
        assert!(x0 + w <= self.width && y0 + h <= self.height);
        // The view keeps a slice spanning full parent rows and carries its
        // own `x_offset`, so `pitch` stays the parent's pitch throughout.
        let start = (y0 * self.pitch) as usize;
        let end = ((y0 + h - 1) * self.pitch + self.pitch) as usize;
        PixelSource {
            width: w,
            height: h,
            pitch: self.pitch,
            x_offset: self.x_offset + x0,
            storage: Storage::Borrowed(&self.pixels()[start..end]),
        }
    }
}

#[cfg(feature = "std")]
mod decode {
    use super::{Argb8888, PixelSource};
    use crate::error::{EngineError, Result};
    use std::io::Cursor;

    pub fn decode_png(bytes: &[u8]) -> Result<PixelSource<'static>> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        // Palette -> RGB and tRNS -> alpha, so only Rgb/Rgba/Grayscale(Alpha)
        // ever reach the match below.
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::ALPHA);
        let mut reader = decoder.read_info().map_err(|e| EngineError::DecodeError {
            format: "png",
            detail: e.to_string(),
        })?;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(|e| EngineError::DecodeError {
            format: "png",
            detail: e.to_string(),
        })?;
        let bytes = &buf[..info.buffer_size()];

        let pixels: Vec<Argb8888> = match info.color_type {
            png::ColorType::Rgba => bytes
                .chunks_exact(4)
                .map(|p| Argb8888::from_channels(p[0], p[1], p[2], p[3]))
                .collect(),
            png::ColorType::Rgb => bytes
                .chunks_exact(3)
                .map(|p| Argb8888::from_channels(p[0], p[1], p[2], 0xFF))
                .collect(),
            png::ColorType::Grayscale => bytes
                .iter()
                .map(|&g| Argb8888::from_channels(g, g, g, 0xFF))
                .collect(),
            png::ColorType::GrayscaleAlpha => bytes
                .chunks_exact(2)
                .map(|p| Argb8888::from_channels(p[0], p[0], p[0], p[1]))
                .collect(),
            other => {
                return Err(EngineError::DecodeError {
                    format: "png",
                    detail: alloc::format!("unsupported color type {other:?}"),
                });
            }
        };

        Ok(PixelSource::from_pixels(info.width, info.height, pixels))
    }

    pub fn decode_jpeg(bytes: &[u8]) -> Result<PixelSource<'static>> {
        let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
        let pixels_raw = decoder.decode().map_err(|e| EngineError::DecodeError {
            format: "jpeg",
            detail: e.to_string(),
        })?;
        let info = decoder.info().ok_or_else(|| EngineError::DecodeError {
            format: "jpeg",
            detail: "missing frame info".into(),
        })?;

        let pixels: Vec<Argb8888> = match info.pixel_format {
            jpeg_decoder::PixelFormat::RGB24 => pixels_raw
                .chunks_exact(3)
                .map(|p| Argb8888::from_channels(p[0], p[1], p[2], 0xFF))
                .collect(),
            jpeg_decoder::PixelFormat::L8 => pixels_raw
                .iter()
                .map(|&g| Argb8888::from_channels(g, g, g, 0xFF))
                .collect(),
            other => {
                return Err(EngineError::DecodeError {
                    format: "jpeg",
                    detail: alloc::format!("unsupported pixel format {other:?}"),
                });
            }
        };

        Ok(PixelSource::from_pixels(
            info.width as u32,
            info.height as u32,
            pixels,
        ))
    }
}

#[cfg(feature = "std")]
pub use decode::{decode_jpeg, decode_png};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_accessors_roundtrip() {
        let px = Argb8888::from_channels(10, 20, 30, 40);
        assert_eq!((px.r(), px.g(), px.b(), px.a()), (10, 20, 30, 40));
    }

    #[test]
    fn sub_rect_reads_parent_pixels() {
        let mut src = PixelSource::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                src.set_pixel(x, y, Argb8888::from_channels(x as u8, y as u8, 0, 255));
            }
        }
        let sub = src.sub_rect(1, 1, 2, 2);
        assert_eq!(sub.pixel(0, 0), Argb8888::from_channels(1, 1, 0, 255));
        assert_eq!(sub.pixel(1, 1), Argb8888::from_channels(2, 2, 0, 255));
    }
}
