//! Compiled RLE images: per-row run streams over a single owned blob, plus
//! blit/unblit/stamp against a `Canvas`.

pub mod rle;

use alloc::vec;
use alloc::vec::Vec;

use crate::canvas::{rgb565, Canvas};
use crate::pixel_source::PixelSource;
use rle::{blend, coarsen_alpha, decode, encode, Op, Run, MAX_COMPOSE_RUN, MAX_WIDE_RUN};

/// `(offset, len)` into the image's shared `blob` — the safe substitute for
/// the original's row-pointer array into a single trailing allocation (see
/// `DESIGN.md`).
#[derive(Debug, Clone, Copy)]
struct Row {
    offset: u32,
    len: u32,
}

/// A compiled image: one `u16` run-word stream per row, sharing a single
/// owned blob.
pub struct Image {
    width: u32,
    height: u32,
    changed_pixels_count: u32,
    rows: Vec<Row>,
    blob: Vec<u16>,
}

struct RowPlan {
    runs: Vec<(u32, u32)>, // (coarse alpha class, run length)
}

fn plan_row(src: &PixelSource, y: u32) -> RowPlan {
    let row = src.row(y);
    let mut runs = Vec::new();
    let mut i = 0usize;
    while i < row.len() {
        let class = coarsen_alpha(row[i].a());
        let max_run = if class == 0 || class == 32 {
            MAX_WIDE_RUN
        } else {
            MAX_COMPOSE_RUN
        } as usize;
        let mut j = i + 1;
        while j < row.len() && coarsen_alpha(row[j].a()) == class && (j - i) < max_run {
            j += 1;
        }
        runs.push((class, (j - i) as u32));
        i = j;
    }
    RowPlan { runs }
}

fn words_for_run(class: u32, len: u32) -> u32 {
    // One opcode word, plus one RGB565 color word per pixel unless SKIP.
    if class == 0 {
        1
    } else {
        1 + len
    }
}

impl Image {
    /// Compiles `src` into per-row RLE runs. Two passes: a dry run sizes
    /// the single blob allocation, then a real pass writes it.
    pub fn compile(src: &PixelSource) -> Image {
        let width = src.width();
        let height = src.height();

        let plans: Vec<RowPlan> = (0..height).map(|y| plan_row(src, y)).collect();

        let mut total_words = 0u32;
        let mut row_word_counts = Vec::with_capacity(height as usize);
        let mut changed_pixels_count = 0u32;
        for plan in &plans {
            let mut row_words = 0u32;
            for &(class, len) in &plan.runs {
                row_words += words_for_run(class, len);
                if class != 0 {
                    changed_pixels_count += len;
                }
            }
            row_word_counts.push(row_words);
            total_words += row_words;
        }

        let mut blob = vec![0u16; total_words as usize];
        let mut rows = Vec::with_capacity(height as usize);
        let mut cursor = 0u32;

        for (y, plan) in plans.iter().enumerate() {
            let row_offset = cursor;
            let row_pixels = src.row(y as u32);
            let mut px = 0usize;
            for &(class, len) in &plan.runs {
                let op = if class == 0 {
                    Op::Skip
                } else if class == 32 {
                    Op::Blit
                } else {
                    Op::Compose
                };
                let inv_alpha = if op == Op::Compose { (32 - class) as u8 } else { 0 };
                blob[cursor as usize] = encode(Run { op, len, inv_alpha });
                cursor += 1;
                if op != Op::Skip {
                    for k in 0..len as usize {
                        let p = row_pixels[px + k];
                        let color = if op == Op::Compose {
                            // Premultiply by source alpha before packing.
                            let a = p.a() as u32;
                            let r = (p.r() as u32 * a / 255) as u8;
                            let g = (p.g() as u32 * a / 255) as u8;
                            let b = (p.b() as u32 * a / 255) as u8;
                            rgb565(r, g, b)
                        } else {
                            rgb565(p.r(), p.g(), p.b())
                        };
                        blob[cursor as usize] = color;
                        cursor += 1;
                    }
                }
                px += len as usize;
            }
            rows.push(Row {
                offset: row_offset,
                len: row_word_counts[y],
            });
        }

        Image {
            width,
            height,
            changed_pixels_count,
            rows,
            blob,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn changed_pixels_count(&self) -> u32 {
        self.changed_pixels_count
    }

    fn row_words(&self, row: u32) -> &[u16] {
        let r = self.rows[row as usize];
        &self.blob[r.offset as usize..(r.offset + r.len) as usize]
    }

    /// Computes the intersection of the image rect placed at `(x0, y0)`
    /// with the canvas, returning `None` if disjoint.
    fn clip(&self, canvas: &Canvas, x0: i32, y0: i32) -> Option<Clip> {
        let img_w = self.width as i32;
        let img_h = self.height as i32;
        let can_w = canvas.width() as i32;
        let can_h = canvas.height() as i32;

        let left = x0.max(0);
        let top = y0.max(0);
        let right = (x0 + img_w).min(can_w);
        let bottom = (y0 + img_h).min(can_h);

        if left >= right || top >= bottom {
            return None;
        }

        Some(Clip {
            canvas_x: left as u32,
            canvas_y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
            left_skip: (left - x0) as u32,
            top_skip: (top - y0) as u32,
        })
    }

    /// Draws the image at `(x0, y0)`, saving displaced canvas pixels into
    /// `bg` (which must have capacity `>= changed_pixels_count()`).
    pub fn blit(&self, canvas: &mut Canvas, x0: i32, y0: i32, bg: &mut [u16]) {
        let Some(clip) = self.clip(canvas, x0, y0) else {
            return;
        };
        let mut bg_cursor = 0usize;
        for row in 0..clip.height {
            let words = self.row_words(clip.top_skip + row);
            let dst_y = clip.canvas_y + row;
            walk_row(words, clip.left_skip, clip.width, |run, run_pos, take, col| {
                let dst_x = clip.canvas_x + col;
                match run.op {
                    Op::Skip => {}
                    Op::Blit => {
                        for k in 0..take {
                            bg[bg_cursor + k as usize] = canvas.get(dst_x + k, dst_y);
                            canvas.set(dst_x + k, dst_y, run.payload[(run_pos + k) as usize]);
                        }
                        bg_cursor += take as usize;
                    }
                    Op::Compose => {
                        for k in 0..take {
                            let dst = canvas.get(dst_x + k, dst_y);
                            bg[bg_cursor + k as usize] = dst;
                            let src = run.payload[(run_pos + k) as usize];
                            canvas.set(dst_x + k, dst_y, blend(src, dst, run.inv_alpha));
                        }
                        bg_cursor += take as usize;
                    }
                }
            });
        }
    }

    /// Restores canvas pixels from `bg`, retracing the same clip that the
    /// matching `blit` call computed.
    pub fn unblit(&self, canvas: &mut Canvas, x0: i32, y0: i32, bg: &[u16]) {
        let Some(clip) = self.clip(canvas, x0, y0) else {
            return;
        };
        let mut bg_cursor = 0usize;
        for row in 0..clip.height {
            let words = self.row_words(clip.top_skip + row);
            let dst_y = clip.canvas_y + row;
            walk_row(words, clip.left_skip, clip.width, |run, _run_pos, take, col| {
                if run.op == Op::Skip {
                    return;
                }
                let dst_x = clip.canvas_x + col;
                for k in 0..take {
                    canvas.set(dst_x + k, dst_y, bg[bg_cursor + k as usize]);
                }
                bg_cursor += take as usize;
            });
        }
    }

    /// Draws the image at `(x0, y0)` without saving the background.
    pub fn stamp(&self, canvas: &mut Canvas, x0: i32, y0: i32) {
        let Some(clip) = self.clip(canvas, x0, y0) else {
            return;
        };
        for row in 0..clip.height {
            let words = self.row_words(clip.top_skip + row);
            let dst_y = clip.canvas_y + row;
            walk_row(words, clip.left_skip, clip.width, |run, run_pos, take, col| {
                let dst_x = clip.canvas_x + col;
                match run.op {
                    Op::Skip => {}
                    Op::Blit => {
                        for k in 0..take {
                            canvas.set(dst_x + k, dst_y, run.payload[(run_pos + k) as usize]);
                        }
                    }
                    Op::Compose => {
                        for k in 0..take {
                            let dst = canvas.get(dst_x + k, dst_y);
                            let src = run.payload[(run_pos + k) as usize];
                            canvas.set(dst_x + k, dst_y, blend(src, dst, run.inv_alpha));
                        }
                    }
                }
            });
        }
    }
}

struct Clip {
    canvas_x: u32,
    canvas_y: u32,
    width: u32,
    height: u32,
    left_skip: u32,
    top_skip: u32,
}

/// One decoded run together with its color payload slice (empty for SKIP).
struct RunWithPayload<'w> {
    op: Op,
    inv_alpha: u8,
    payload: &'w [u16],
}

/// Walks a row's run stream once, skipping `left_skip` pixels of payload
/// before the visible window and invoking `f` for the portion of each run
/// that falls inside the next `width` pixels. `f` receives the run, the
/// offset into its payload where the visible portion starts, how many
/// pixels to take, and the destination column (0-based within the window).
///
/// Unifying the skip and emit phases into one walk (rather than two passes
/// over the row) avoids double-counting pixels whose run straddles the
/// skip/visible boundary.
fn walk_row(words: &[u16], left_skip: u32, width: u32, mut f: impl FnMut(&RunWithPayload, u32, u32, u32)) {
    let mut word_idx = 0usize;
    let mut row_pos = 0u32; // pixel position within the full row, pre-clip
    let mut col = 0u32; // pixel position within the visible window
    let window_end = left_skip + width;

    while col < width {
        let run = decode(words[word_idx]);
        word_idx += 1;
        let payload: &[u16] = if run.op == Op::Skip {
            &[]
        } else {
            let p = &words[word_idx..word_idx + run.len as usize];
            word_idx += run.len as usize;
            p
        };
        let run_with_payload = RunWithPayload {
            op: run.op,
            inv_alpha: run.inv_alpha,
            payload,
        };

        let run_start = row_pos;
        let run_end = row_pos + run.len;
        let visible_start = run_start.max(left_skip);
        let visible_end = run_end.min(window_end);
        if visible_start < visible_end {
            let take = visible_end - visible_start;
            let run_pos = visible_start - run_start;
            f(&run_with_payload, run_pos, take, col);
            col += take;
        }
        row_pos = run_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_source::Argb8888;

    fn solid_opaque(w: u32, h: u32, r: u8, g: u8, b: u8) -> PixelSource<'static> {
        let mut src = PixelSource::new(w, h);
        for y in 0..h {
            for x in 0..w {
                src.set_pixel(x, y, Argb8888::from_channels(r, g, b, 255));
            }
        }
        src
    }

    #[test]
    fn row_run_lengths_sum_to_width() {
        let src = solid_opaque(6, 2, 10, 20, 30);
        let image = Image::compile(&src);
        for row in 0..image.height {
            let words = image.row_words(row);
            let mut total = 0u32;
            let mut i = 0usize;
            while i < words.len() {
                let run = decode(words[i]);
                total += run.len;
                i += if run.op == Op::Skip { 1 } else { 1 + run.len as usize };
            }
            assert_eq!(total, image.width);
        }
    }

    #[test]
    fn changed_pixels_count_matches_non_skip_total() {
        let src = solid_opaque(4, 4, 1, 2, 3);
        let image = Image::compile(&src);
        assert_eq!(image.changed_pixels_count(), 16);
    }

    #[test]
    fn sprite_save_restore_roundtrip() {
        let src = solid_opaque(4, 1, 255, 0, 0);
        let image = Image::compile(&src);
        let mut canvas = Canvas::new(8, 1);
        canvas.clear(0x0000);

        let mut bg = vec![0u16; image.changed_pixels_count() as usize];
        image.blit(&mut canvas, 2, 0, &mut bg);
        let expected: Vec<u16> = (0..8)
            .map(|x| if (2..6).contains(&x) { 0xF800 } else { 0x0000 })
            .collect();
        assert_eq!(canvas.pixels(), expected.as_slice());

        image.unblit(&mut canvas, 2, 0, &bg);
        assert!(canvas.pixels().iter().all(|&p| p == 0x0000));
    }

    #[test]
    fn clipping_restores_exactly() {
        let src = solid_opaque(4, 4, 0, 255, 0);
        let image = Image::compile(&src);
        let mut canvas = Canvas::new(2, 2);
        canvas.clear(0x1234);
        let before: Vec<u16> = canvas.pixels().to_vec();

        let mut bg = vec![0u16; image.changed_pixels_count() as usize];
        image.blit(&mut canvas, -2, -2, &mut bg);
        assert!(canvas.pixels().iter().all(|&p| p == 0x07E0));

        image.unblit(&mut canvas, -2, -2, &bg);
        assert_eq!(canvas.pixels(), before.as_slice());
    }

    #[test]
    fn transparent_image_is_a_noop() {
        let mut src = PixelSource::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                src.set_pixel(x, y, Argb8888::from_channels(1, 2, 3, 0));
            }
        }
        let image = Image::compile(&src);
        assert_eq!(image.changed_pixels_count(), 0);
        let mut canvas = Canvas::new(2, 2);
        canvas.clear(0xABCD);
        let mut bg = vec![0u16; 0];
        image.blit(&mut canvas, 0, 0, &mut bg);
        assert!(canvas.pixels().iter().all(|&p| p == 0xABCD));
    }
}
