/*
 *  display/glyphs.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Progress bar glyph synthesis for 5x8 character cells
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::config::ProgressStyle;
use crate::constants::{GLYPH_COLUMNS, GLYPH_ROWS};
use crate::display::device::GlyphBitmap;

// simple bar slots
pub const SLOT_FULL: u8 = 0;
pub const SLOT_PARTIAL: u8 = 1;
pub const SLOT_EMPTY: u8 = 2;

// bordered bar slots
pub const SLOT_LEFT: u8 = 0;
pub const SLOT_CENTRE: u8 = 1;
pub const SLOT_RIGHT: u8 = 2;
pub const SLOT_CENTRE_FULL: u8 = 3;
pub const SLOT_CENTRE_EMPTY: u8 = 4;

/// Fill columns usable inside each end cap
const CAP_COLUMNS: u32 = 3;

/// Glyphs to program plus the cell sequence that shows them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarFrame {
    /// (slot, bitmap) pairs, program all before writing `cells`
    pub glyphs: Vec<(u8, GlyphBitmap)>,
    /// One glyph slot index per character cell
    pub cells: Vec<u8>,
    /// Filled pixel columns across the whole bar
    pub dot_position: u32,
}

/// Filled columns out of `dots` for elapsed/length, rounded down.
///
/// Elapsed is clamped to length; an unknown (zero) length reads as empty.
pub fn dot_position(elapsed: u32, length: u32, dots: u32) -> u32 {
    if length == 0 {
        return 0;
    }
    let elapsed = elapsed.min(length) as u64;
    (dots as u64 * elapsed / length as u64) as u32
}

/// Row mask with the leftmost `progress` of 5 columns lit
fn fill_mask(progress: u32) -> u8 {
    let progress = progress.min(GLYPH_COLUMNS);
    ((0b11111u16 << (GLYPH_COLUMNS - progress)) & 0b11111) as u8
}

/// Thin bar on rows 5 and 6
fn thin_bar(progress: u32) -> GlyphBitmap {
    let mut rows = [0u8; GLYPH_ROWS];
    rows[5] = fill_mask(progress);
    rows[6] = fill_mask(progress);
    rows
}

/// Progress bar of `width` cells using slots 0..=2
pub fn simple_bar(elapsed: u32, length: u32, width: usize) -> BarFrame {
    let dot = dot_position(elapsed, length, width as u32 * GLYPH_COLUMNS);
    let change = (dot / GLYPH_COLUMNS) as usize;
    let frac = dot % GLYPH_COLUMNS;

    let glyphs = vec![
        (SLOT_FULL, thin_bar(GLYPH_COLUMNS)),
        (SLOT_PARTIAL, thin_bar(frac)),
        (SLOT_EMPTY, thin_bar(0)),
    ];
    let cells = (0..width)
        .map(|i| match i.cmp(&change) {
            std::cmp::Ordering::Less => SLOT_FULL,
            // boundary exactly on a cell edge needs no partial cell
            std::cmp::Ordering::Equal if frac > 0 => SLOT_PARTIAL,
            _ => SLOT_EMPTY,
        })
        .collect();

    BarFrame { glyphs, cells, dot_position: dot }
}

fn solid(progress: u32) -> GlyphBitmap {
    [fill_mask(progress); GLYPH_ROWS]
}

fn left_cap(bar: GlyphBitmap) -> GlyphBitmap {
    let mut rows = [0u8; GLYPH_ROWS];
    for (y, line) in bar.iter().enumerate() {
        rows[y] = match y {
            2 | 6 => 0b11111,
            3 | 5 => 0b10000,
            4 => (0b10000 | line) & 0b10111,
            _ => 0,
        };
    }
    rows
}

fn centre_box(bar: GlyphBitmap) -> GlyphBitmap {
    let mut rows = [0u8; GLYPH_ROWS];
    for (y, line) in bar.iter().enumerate() {
        rows[y] = match y {
            2 | 6 => 0b11111,
            4 => *line,
            _ => 0,
        };
    }
    rows
}

fn right_cap(bar: GlyphBitmap) -> GlyphBitmap {
    let mut rows = [0u8; GLYPH_ROWS];
    for (y, line) in bar.iter().enumerate() {
        rows[y] = match y {
            2 | 6 => 0b11111,
            3 | 5 => 0b00001,
            4 => (0b00001 | line) & 0b11101,
            _ => 0,
        };
    }
    rows
}

/// Boxed bar with end caps; needs at least two cells, narrower falls back to simple
pub fn bordered_bar(elapsed: u32, length: u32, width: usize) -> BarFrame {
    if width < 2 {
        return simple_bar(elapsed, length, width);
    }
    let centre_cells = width - 2;
    let centre_dots = GLYPH_COLUMNS * centre_cells as u32;
    let dot_length = 2 * CAP_COLUMNS + centre_dots;
    let dot = dot_position(elapsed, length, dot_length);

    let full = GLYPH_COLUMNS;
    let mut cells = Vec::with_capacity(width);
    cells.push(SLOT_LEFT);

    let glyphs = if dot <= CAP_COLUMNS {
        cells.extend(std::iter::repeat_n(SLOT_CENTRE, centre_cells));
        vec![
            (SLOT_LEFT, left_cap(solid(full - CAP_COLUMNS + dot))),
            (SLOT_CENTRE, centre_box(solid(0))),
            (SLOT_RIGHT, right_cap(solid(0))),
        ]
    } else if dot <= centre_dots + CAP_COLUMNS {
        let centre_total = dot - CAP_COLUMNS;
        let change = (centre_total / GLYPH_COLUMNS) as usize;
        let frac = centre_total % GLYPH_COLUMNS;
        cells.extend((0..centre_cells).map(|i| match i.cmp(&change) {
            std::cmp::Ordering::Less => SLOT_CENTRE_FULL,
            std::cmp::Ordering::Equal if frac > 0 => SLOT_CENTRE,
            _ => SLOT_CENTRE_EMPTY,
        }));
        vec![
            (SLOT_LEFT, left_cap(solid(full))),
            (SLOT_CENTRE, centre_box(solid(frac))),
            (SLOT_RIGHT, right_cap(solid(0))),
            (SLOT_CENTRE_FULL, centre_box(solid(full))),
            (SLOT_CENTRE_EMPTY, centre_box(solid(0))),
        ]
    } else {
        cells.extend(std::iter::repeat_n(SLOT_CENTRE, centre_cells));
        vec![
            (SLOT_LEFT, left_cap(solid(full))),
            (SLOT_CENTRE, centre_box(solid(full))),
            (SLOT_RIGHT, right_cap(solid(CAP_COLUMNS + dot - dot_length))),
        ]
    };
    cells.push(SLOT_RIGHT);

    BarFrame { glyphs, cells, dot_position: dot }
}

pub fn progress_bar(style: ProgressStyle, elapsed: u32, length: u32, width: usize) -> BarFrame {
    match style {
        ProgressStyle::Simple => simple_bar(elapsed, length, width),
        ProgressStyle::Bordered => bordered_bar(elapsed, length, width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// lit columns shown by each cell of a simple bar
    fn cell_fill(frame: &BarFrame) -> Vec<u32> {
        frame
            .cells
            .iter()
            .map(|slot| {
                let (_, rows) = frame.glyphs.iter().find(|(s, _)| s == slot).unwrap();
                rows[5].count_ones()
            })
            .collect()
    }

    #[test]
    fn test_fill_mask() {
        assert_eq!(fill_mask(0), 0b00000);
        assert_eq!(fill_mask(1), 0b10000);
        assert_eq!(fill_mask(3), 0b11100);
        assert_eq!(fill_mask(5), 0b11111);
    }

    #[test]
    fn test_dot_position_formula() {
        assert_eq!(dot_position(0, 200, 50), 0);
        assert_eq!(dot_position(100, 200, 50), 25);
        assert_eq!(dot_position(199, 200, 50), 49);
        assert_eq!(dot_position(200, 200, 50), 50);
        assert_eq!(dot_position(500, 200, 50), 50);
        assert_eq!(dot_position(10, 0, 50), 0);
    }

    #[test]
    fn test_simple_bar_partial_cell() {
        // 10 cells x 5 = 50 dots; 27 dots = 5 full cells + 2 columns
        let frame = simple_bar(54, 100, 10);
        assert_eq!(frame.dot_position, 27);
        assert_eq!(
            frame.cells,
            vec![0, 0, 0, 0, 0, SLOT_PARTIAL, 2, 2, 2, 2]
        );
        let (_, partial) = frame.glyphs[SLOT_PARTIAL as usize];
        assert_eq!(partial[5], 0b11000);
        assert_eq!(partial[0], 0);
    }

    #[test]
    fn test_simple_bar_cell_edge_has_no_partial() {
        let frame = simple_bar(50, 100, 10);
        assert_eq!(frame.dot_position, 25);
        assert!(!frame.cells.contains(&SLOT_PARTIAL));
        assert_eq!(frame.cells, vec![0, 0, 0, 0, 0, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_simple_bar_extremes() {
        assert!(simple_bar(0, 100, 10).cells.iter().all(|&c| c == SLOT_EMPTY));
        assert!(simple_bar(100, 100, 10).cells.iter().all(|&c| c == SLOT_FULL));
        assert!(simple_bar(7, 0, 10).cells.iter().all(|&c| c == SLOT_EMPTY));
    }

    #[test]
    fn test_simple_bar_monotonic() {
        for width in [1usize, 3, 10, 16] {
            for length in [1u32, 7, 59, 247] {
                let mut last_total = 0;
                for elapsed in 0..=length {
                    let frame = simple_bar(elapsed, length, width);
                    assert_eq!(frame.cells.len(), width);
                    assert_eq!(
                        frame.dot_position,
                        (width as u32 * GLYPH_COLUMNS * elapsed) / length
                    );
                    let fill = cell_fill(&frame);
                    // left to right the fill never grows
                    assert!(fill.windows(2).all(|w| w[0] >= w[1]));
                    let total: u32 = fill.iter().sum();
                    assert_eq!(total, frame.dot_position);
                    assert!(total >= last_total);
                    last_total = total;
                }
            }
        }
    }

    #[test]
    fn test_bordered_bar_phases() {
        // width 4: 3 + 10 + 3 = 16 dots
        let start = bordered_bar(0, 16, 4);
        assert_eq!(start.cells, vec![SLOT_LEFT, SLOT_CENTRE, SLOT_CENTRE, SLOT_RIGHT]);
        assert_eq!(start.glyphs[0].1[4], 0b10000);

        let cap = bordered_bar(2, 16, 4);
        assert_eq!(cap.glyphs[0].1[4], 0b10110);

        let middle = bordered_bar(10, 16, 4);
        assert_eq!(middle.dot_position, 10);
        assert_eq!(
            middle.cells,
            vec![SLOT_LEFT, SLOT_CENTRE_FULL, SLOT_CENTRE, SLOT_RIGHT]
        );
        assert_eq!(middle.glyphs.len(), 5);
        assert_eq!(middle.glyphs[1].1[4], 0b11000);

        let end = bordered_bar(16, 16, 4);
        assert_eq!(end.cells, vec![SLOT_LEFT, SLOT_CENTRE, SLOT_CENTRE, SLOT_RIGHT]);
        assert_eq!(end.glyphs[2].1[4], 0b11101);
        assert_eq!(end.glyphs[1].1[4], 0b11111);
    }

    #[test]
    fn test_bordered_bar_width() {
        for width in 2..=16usize {
            for elapsed in [0u32, 1, 50, 99, 100] {
                assert_eq!(bordered_bar(elapsed, 100, width).cells.len(), width);
            }
        }
        assert_eq!(bordered_bar(5, 10, 1).cells.len(), 1);
    }

    #[test]
    fn test_style_dispatch() {
        assert_eq!(progress_bar(ProgressStyle::Simple, 3, 9, 6), simple_bar(3, 9, 6));
        assert_eq!(progress_bar(ProgressStyle::Bordered, 3, 9, 6), bordered_bar(3, 9, 6));
    }
}
