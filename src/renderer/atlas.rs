//! Text atlas for the label renderer.
//!
//! Every label is measured, packed row-by-row into a single-channel bitmap,
//! and rasterized once; the label billboards then reference UV rectangles
//! into the shared texture. The atlas height doubles on overflow up to a
//! hard ceiling, beyond which remaining labels are dropped with a warning.
//! Rebuild cost is linear in the label count, so the caller only rebuilds
//! when the label set actually changes.

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};

use crate::primitives::LabelPrimitive;

pub const ATLAS_WIDTH: u32 = 1024;
pub const INITIAL_ATLAS_HEIGHT: u32 = 1024;
pub const MAX_ATLAS_HEIGHT: u32 = 4096;

const PADDING: u32 = 2;
const GLYPH_SIZE: u32 = 8;

/// Placement of one label inside the atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasEntry {
    /// Pixel extent including padding.
    pub width: u32,
    pub height: u32,
    /// UV rectangle in the final texture.
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// Packed and rasterized label atlas. `entries` parallels the input label
/// slice; truncated labels have no entry.
pub struct LabelAtlas {
    pub width: u32,
    pub height: u32,
    /// R8 coverage, row-major, `width * height` bytes.
    pub pixels: Vec<u8>,
    pub entries: Vec<Option<AtlasEntry>>,
}

/// Side length of one glyph cell for a given label font size.
fn glyph_cell(font_size: f32, font_scale: f32) -> u32 {
    ((font_size * font_scale).round() as u32).max(GLYPH_SIZE)
}

/// Pixel extent of a label's text at the given scale, including padding.
pub fn measure(text: &str, font_size: f32, font_scale: f32) -> (u32, u32) {
    let cell = glyph_cell(font_size, font_scale);
    let chars = text.chars().count() as u32;
    (chars * cell + PADDING * 2, cell + PADDING * 2)
}

impl LabelAtlas {
    pub fn build(labels: &[LabelPrimitive], font_scale: f32) -> Self {
        Self::build_with_limits(
            labels,
            font_scale,
            ATLAS_WIDTH,
            INITIAL_ATLAS_HEIGHT,
            MAX_ATLAS_HEIGHT,
        )
    }

    pub fn build_with_limits(
        labels: &[LabelPrimitive],
        font_scale: f32,
        width: u32,
        initial_height: u32,
        max_height: u32,
    ) -> Self {
        // Pass 1: assign pixel rectangles row by row, growing as needed.
        // Pixel positions are stable under growth; only the UVs depend on the
        // final height, so those are filled in afterwards.
        let mut height = initial_height.max(1);
        let mut rects: Vec<Option<(u32, u32, u32, u32)>> = Vec::with_capacity(labels.len());
        let mut cursor_x = 0u32;
        let mut cursor_y = 0u32;
        let mut row_height = 0u32;
        let mut truncated = 0usize;

        for label in labels {
            let (w, h) = measure(label.text(), label.font_size(), font_scale);
            let w = w.min(width);

            if cursor_x + w > width {
                cursor_x = 0;
                cursor_y += row_height;
                row_height = 0;
            }
            while cursor_y + h > height && height < max_height {
                height *= 2;
            }
            if cursor_y + h > height {
                truncated += 1;
                rects.push(None);
                continue;
            }

            rects.push(Some((cursor_x, cursor_y, w, h)));
            cursor_x += w;
            row_height = row_height.max(h);
        }

        if truncated > 0 {
            log::warn!(
                "label atlas exceeds {max_height}px, truncating {truncated} label(s)"
            );
        }

        // Pass 2: rasterize into the final bitmap and derive UVs.
        let mut pixels = vec![0u8; (width * height) as usize];
        let mut entries = Vec::with_capacity(labels.len());

        for (label, rect) in labels.iter().zip(&rects) {
            let Some((x, y, w, h)) = *rect else {
                entries.push(None);
                continue;
            };

            let cell = glyph_cell(label.font_size(), font_scale);
            draw_text(
                &mut pixels,
                width,
                x + PADDING,
                y + PADDING,
                x + w - PADDING,
                label.text(),
                cell,
            );

            entries.push(Some(AtlasEntry {
                width: w,
                height: h,
                u0: x as f32 / width as f32,
                v0: y as f32 / height as f32,
                u1: (x + w) as f32 / width as f32,
                v1: (y + h) as f32 / height as f32,
            }));
        }

        Self {
            width,
            height,
            pixels,
            entries,
        }
    }
}

/// Rasterize `text` at (x, y) with nearest-neighbor scaling of the 8×8
/// glyphs to `cell` pixels. Pixels beyond `x_limit` are clipped.
fn draw_text(
    pixels: &mut [u8],
    atlas_width: u32,
    x: u32,
    y: u32,
    x_limit: u32,
    text: &str,
    cell: u32,
) {
    let mut pen_x = x;
    for ch in text.chars() {
        let glyph = glyph_for(ch);
        for py in 0..cell {
            let src_y = (py * GLYPH_SIZE / cell).min(GLYPH_SIZE - 1) as usize;
            let row = glyph[src_y];
            for px in 0..cell {
                let src_x = (px * GLYPH_SIZE / cell).min(GLYPH_SIZE - 1);
                if row & (1 << src_x) == 0 {
                    continue;
                }
                let tx = pen_x + px;
                let ty = y + py;
                if tx >= x_limit.min(atlas_width) {
                    continue;
                }
                pixels[(ty * atlas_width + tx) as usize] = 0xFF;
            }
        }
        pen_x += cell;
        if pen_x >= x_limit {
            break;
        }
    }
}

fn glyph_for(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .unwrap_or_else(|| BASIC_FONTS.get('?').unwrap_or([0u8; 8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;
    use crate::types::GeocentricCoords;

    fn label(text: &str, font_size: f32) -> LabelPrimitive {
        LabelPrimitive::with_style(
            GeocentricCoords::from_degrees(0.0, 0.0),
            text,
            0xFFFFFFFF,
            font_size,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn measure_scales_with_text_length_and_font_size() {
        let (w1, h1) = measure("ab", 16.0, 1.0);
        let (w2, _) = measure("abcd", 16.0, 1.0);
        assert_eq!(w1, 2 * 16 + 4);
        assert_eq!(h1, 16 + 4);
        assert_eq!(w2, 4 * 16 + 4);

        let (w_big, h_big) = measure("ab", 32.0, 1.0);
        assert_eq!(w_big, 2 * 32 + 4);
        assert_eq!(h_big, 32 + 4);

        // The font scale multiplies into the cell size
        let (w_scaled, _) = measure("ab", 16.0, 2.0);
        assert_eq!(w_scaled, w_big);
    }

    #[test]
    fn entries_pack_left_to_right_then_wrap() {
        let labels = vec![label("aaaa", 16.0), label("bbbb", 16.0), label("cccc", 16.0)];
        // Width fits exactly two 68px entries
        let atlas = LabelAtlas::build_with_limits(&labels, 1.0, 136, 64, 64);
        let a = atlas.entries[0].unwrap();
        let b = atlas.entries[1].unwrap();
        let c = atlas.entries[2].unwrap();

        assert!(approx(a.u0, 0.0, 1e-6));
        assert!(approx(b.u0, 0.5, 1e-6));
        assert!(approx(a.v0, c.v0 - 20.0 / 64.0, 1e-6)); // c wrapped to row 2
        assert!(approx(c.u0, 0.0, 1e-6));
    }

    #[test]
    fn height_doubles_on_overflow() {
        let labels: Vec<_> = (0..6).map(|_| label("aaaa", 16.0)).collect();
        // One 68px entry per 72px row; six rows of 20px need 120px > 32
        let atlas = LabelAtlas::build_with_limits(&labels, 1.0, 72, 32, 256);
        assert_eq!(atlas.height, 128);
        assert!(atlas.entries.iter().all(|e| e.is_some()));
        assert_eq!(atlas.pixels.len(), (72 * 128) as usize);
    }

    #[test]
    fn hard_ceiling_truncates_the_remainder() {
        let labels: Vec<_> = (0..10).map(|_| label("aaaa", 16.0)).collect();
        // Ten 20px rows need 200px, ceiling at 64 fits three rows
        let atlas = LabelAtlas::build_with_limits(&labels, 1.0, 72, 32, 64);
        assert_eq!(atlas.height, 64);
        let placed = atlas.entries.iter().filter(|e| e.is_some()).count();
        assert_eq!(placed, 3);
        // Truncation drops the tail, not the head
        assert!(atlas.entries[0].is_some());
        assert!(atlas.entries[9].is_none());
    }

    #[test]
    fn rasterization_marks_coverage_inside_the_entry() {
        let labels = vec![label("X", 16.0)];
        let atlas = LabelAtlas::build(&labels, 1.0);
        let entry = atlas.entries[0].unwrap();

        let x0 = (entry.u0 * atlas.width as f32) as u32;
        let y0 = (entry.v0 * atlas.height as f32) as u32;
        let mut covered = 0usize;
        for y in y0..y0 + entry.height {
            for x in x0..x0 + entry.width {
                if atlas.pixels[(y * atlas.width + x) as usize] != 0 {
                    covered += 1;
                }
            }
        }
        assert!(covered > 0, "glyph left no coverage");

        // Nothing outside the first entry's row was touched
        let below = ((y0 + entry.height + 1) * atlas.width) as usize;
        assert!(atlas.pixels[below..].iter().all(|&p| p == 0));
    }

    #[test]
    fn degree_sign_has_a_glyph() {
        let glyph = glyph_for('\u{00B0}');
        assert!(glyph.iter().any(|&row| row != 0));
    }

    #[test]
    fn uv_rectangles_are_normalized() {
        let labels = vec![label("abc", 14.0), label("de", 20.0)];
        let atlas = LabelAtlas::build(&labels, 1.0);
        for entry in atlas.entries.iter().flatten() {
            assert!(entry.u0 >= 0.0 && entry.u1 <= 1.0 && entry.u0 < entry.u1);
            assert!(entry.v0 >= 0.0 && entry.v1 <= 1.0 && entry.v0 < entry.v1);
        }
    }
}
