//! BDF (Glyph Bitmap Distribution Format) text measuring and rendering.
//!
//! The BDF text-format *scan* (`STARTFONT`/`FONTBOUNDINGBOX`/`STARTCHAR`...
//! `ENDCHAR`/`ENCODING`/`BBX`/`BITMAP`) is implemented here; turning a
//! glyph's hex `BITMAP` block into on/off pixels is the boundary this
//! module stops at — the same black-box boundary the reference engine
//! delegates to an external BDF rasterizer (see `DESIGN.md`).

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{EngineError, Result};
use crate::pixel_source::{Argb8888, PixelSource};

/// One parsed glyph: its encoding, advance width, bounding box, and a
/// row-major bitmap of `bbx_w * bbx_h` bits packed one-per-byte (0/1).
#[derive(Debug, Clone)]
pub struct Glyph {
    pub encoding: i32,
    pub device_width: i32,
    pub bbx_w: i32,
    pub bbx_h: i32,
    pub bbx_x_off: i32,
    pub bbx_y_off: i32,
    pub bitmap: Vec<u8>,
}

/// A parsed BDF font: global bounding box, ascent/descent, and the
/// glyphs that survived the filter callback.
pub struct Font {
    pub ascent: i32,
    pub descent: i32,
    pub bbx_w: i32,
    pub bbx_h: i32,
    glyphs: Vec<Glyph>,
}

impl Font {
    fn glyph_for(&self, codepoint: i32) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.encoding == codepoint)
    }

    /// Parses a BDF text stream, keeping every glyph the callback selects.
    /// `filter(encoding, non_standard) -> Option<codepoint>`; a glyph is
    /// kept with `Some(encoding)` taking priority over `Some(non_standard)`
    /// when both are present, matching the reference engine's default.
    pub fn parse(text: &str, mut filter: impl FnMut(i32, i32) -> Option<i32>) -> Result<Font> {
        let mut lines = text.lines();
        let mut ascent = 0;
        let mut descent = 0;
        let mut bbx_w = 0;
        let mut bbx_h = 0;
        let mut glyphs = Vec::new();

        while let Some(line) = lines.next() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("FONTBOUNDINGBOX") => {
                    bbx_w = parse_next_i32(&mut parts)?;
                    bbx_h = parse_next_i32(&mut parts)?;
                }
                Some("FONT_ASCENT") => ascent = parse_next_i32(&mut parts)?,
                Some("FONT_DESCENT") => descent = parse_next_i32(&mut parts)?,
                Some("STARTCHAR") => {
                    if let Some(glyph) = parse_char(&mut lines, &mut filter)? {
                        glyphs.push(glyph);
                    }
                }
                _ => {}
            }
        }

        Ok(Font {
            ascent,
            descent,
            bbx_w,
            bbx_h,
            glyphs,
        })
    }

    /// Returns `(x0, y0, width, height)` of the tightest box enclosing
    /// `text` rendered left-to-right starting at the origin.
    pub fn text_size(&self, text: &str) -> (i32, i32, u32, u32) {
        let mut advance = 0i32;
        for ch in text.chars() {
            if let Some(glyph) = self.glyph_for(ch as i32) {
                advance += glyph.device_width;
            }
        }
        (0, -self.ascent, advance.max(0) as u32, (self.ascent + self.descent).max(0) as u32)
    }

    /// Renders `text` into a fresh pixel source sized to `text_size`,
    /// filled with `bg`, glyph "on" pixels stamped as `fg`.
    pub fn render_text(&self, text: &str, bg: Argb8888, fg: Argb8888) -> PixelSource<'static> {
        let (_, _, width, height) = self.text_size(text);
        let width = width.max(1);
        let height = height.max(1);
        let mut out = PixelSource::new(width, height);
        for y in 0..height {
            for x in 0..width {
                out.set_pixel(x, y, bg);
            }
        }

        let baseline = self.ascent;
        let mut cursor_x = 0i32;
        for ch in text.chars() {
            let Some(glyph) = self.glyph_for(ch as i32) else {
                continue;
            };
            for row in 0..glyph.bbx_h {
                let dst_y = baseline - glyph.bbx_y_off - glyph.bbx_h + row;
                if dst_y < 0 || dst_y as u32 >= height {
                    continue;
                }
                for col in 0..glyph.bbx_w {
                    if glyph.bitmap[(row * glyph.bbx_w + col) as usize] == 0 {
                        continue;
                    }
                    let dst_x = cursor_x + glyph.bbx_x_off + col;
                    if dst_x < 0 || dst_x as u32 >= width {
                        continue;
                    }
                    out.set_pixel(dst_x as u32, dst_y as u32, fg);
                }
            }
            cursor_x += glyph.device_width;
        }

        out
    }
}

fn parse_next_i32<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<i32> {
    parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(EngineError::InvalidArchive {
            reason: String::from("malformed BDF numeric field"),
        })
}

fn parse_char<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    filter: &mut impl FnMut(i32, i32) -> Option<i32>,
) -> Result<Option<Glyph>> {
    let mut encoding = -1;
    let mut non_standard = -1;
    let mut device_width = 0;
    let mut bbx_w = 0;
    let mut bbx_h = 0;
    let mut bbx_x_off = 0;
    let mut bbx_y_off = 0;
    let mut bitmap = Vec::new();

    for line in lines.by_ref() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("ENCODING") => {
                encoding = parse_next_i32(&mut parts)?;
                non_standard = parts.next().and_then(|s| s.parse().ok()).unwrap_or(-1);
            }
            Some("DWIDTH") => device_width = parse_next_i32(&mut parts)?,
            Some("BBX") => {
                bbx_w = parse_next_i32(&mut parts)?;
                bbx_h = parse_next_i32(&mut parts)?;
                bbx_x_off = parse_next_i32(&mut parts)?;
                bbx_y_off = parse_next_i32(&mut parts)?;
            }
            Some("BITMAP") => {
                bitmap = vec![0u8; (bbx_w.max(0) * bbx_h.max(0)) as usize];
                for row in 0..bbx_h {
                    let Some(hex_line) = lines.next() else {
                        break;
                    };
                    decode_bitmap_row(hex_line, bbx_w, &mut bitmap, row);
                }
            }
            Some("ENDCHAR") => break,
            _ => {}
        }
    }

    let codepoint = filter(encoding, non_standard);

    Ok(codepoint.map(|encoding| Glyph {
        encoding,
        device_width,
        bbx_w,
        bbx_h,
        bbx_x_off,
        bbx_y_off,
        bitmap,
    }))
}

/// Turns one hex-encoded BDF bitmap row into `bbx_w` on/off bytes.
fn decode_bitmap_row(hex_line: &str, bbx_w: i32, bitmap: &mut [u8], row: i32) {
    let hex_line = hex_line.trim();
    let mut bit_index = 0i32;
    for ch in hex_line.chars() {
        let Some(nibble) = ch.to_digit(16) else {
            break;
        };
        for bit in (0..4).rev() {
            if bit_index >= bbx_w {
                break;
            }
            let on = (nibble >> bit) & 1;
            bitmap[(row * bbx_w + bit_index) as usize] = on as u8;
            bit_index += 1;
        }
    }
}

/// Default filter: keeps every glyph, preferring `encoding` over
/// `non_standard` when `encoding != -1`.
pub fn keep_all(encoding: i32, non_standard: i32) -> Option<i32> {
    if encoding != -1 {
        Some(encoding)
    } else if non_standard != -1 {
        Some(non_standard)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_BDF: &str = "STARTFONT 2.1\n\
FONT -misc-fixed-medium-r-normal--8-80-75-75-c-50-iso10646-1\n\
FONTBOUNDINGBOX 5 8 0 -1\n\
FONT_ASCENT 7\n\
FONT_DESCENT 1\n\
STARTCHAR A\n\
ENCODING 65\n\
DWIDTH 5 0\n\
BBX 5 8 0 -1\n\
BITMAP\n\
20\n\
50\n\
88\n\
88\n\
F8\n\
88\n\
88\n\
00\n\
ENDCHAR\n\
ENDFONT\n";

    #[test]
    fn parses_ascent_descent_and_one_glyph() {
        let font = Font::parse(SAMPLE_BDF, keep_all).unwrap();
        assert_eq!(font.ascent, 7);
        assert_eq!(font.descent, 1);
        assert_eq!(font.glyphs.len(), 1);
        assert_eq!(font.glyphs[0].encoding, 65);
        assert_eq!(font.glyphs[0].device_width, 5);
    }

    #[test]
    fn text_size_sums_advances() {
        let font = Font::parse(SAMPLE_BDF, keep_all).unwrap();
        let (_, _, w, h) = font.text_size("AA");
        assert_eq!(w, 10);
        assert_eq!(h, 8);
    }

    #[test]
    fn filter_can_drop_glyphs() {
        let font = Font::parse(SAMPLE_BDF, |_, _| None).unwrap();
        assert!(font.glyphs.is_empty());
    }

    #[test]
    fn render_text_produces_correctly_sized_buffer() {
        let font = Font::parse(SAMPLE_BDF, keep_all).unwrap();
        let bg = Argb8888::from_channels(0, 0, 0, 255);
        let fg = Argb8888::from_channels(255, 255, 255, 255);
        let image = font.render_text("A", bg, fg);
        assert_eq!(image.width(), 5);
        assert_eq!(image.height(), 8);
    }
}
