/*
 *  display/device.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Diff-aware character display: cached lines, scroll state, glyph cache
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

use log::debug;

use crate::constants::{
    BRIGHTNESS_PREFIX, BRIGHTNESS_SUFFIX, CMD_DISPLAY_OFF, CMD_DISPLAY_ON, CMD_SET_CGRAM,
    CMD_SET_DDRAM, GLYPH_ROWS, GLYPH_SLOTS, POWER_ON_BRIGHTNESS,
};
use crate::display::error::DisplayError;
use crate::display::traits::CharBus;

/// One glyph bitmap, top row first, low 5 bits used
pub type GlyphBitmap = [u8; GLYPH_ROWS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Addressable state of one display line
#[derive(Debug, Clone)]
pub struct DisplayLine {
    address: u8,
    /// last bytes written, un-truncated so long text can scroll
    cached: Vec<u8>,
    offset: usize,
    direction: ScrollDirection,
    dwell: u32,
}

impl DisplayLine {
    fn new(address: u8, width: usize) -> Self {
        Self {
            address,
            cached: vec![b' '; width],
            offset: 0,
            direction: ScrollDirection::Forward,
            dwell: 0,
        }
    }

    fn reset_scroll(&mut self) {
        self.offset = 0;
        self.direction = ScrollDirection::Forward;
        self.dwell = 0;
    }

    pub fn cached(&self) -> &[u8] {
        &self.cached
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn direction(&self) -> ScrollDirection {
        self.direction
    }
}

/// Character display with diffed writes.
///
/// Owns every piece of cached device state; callers must serialize access
/// (the render consumer is the only writer), so nothing in here locks.
/// Bus failures are returned untouched and never retried.
pub struct CharDisplay<B: CharBus> {
    bus: B,
    width: usize,
    lines: Vec<DisplayLine>,
    glyphs: [Option<GlyphBitmap>; GLYPH_SLOTS as usize],
    power: bool,
    brightness: u8,
}

impl<B: CharBus> CharDisplay<B> {
    pub fn new(bus: B, line_addresses: &[u8], width: usize) -> Self {
        Self {
            bus,
            width,
            lines: line_addresses.iter().map(|&a| DisplayLine::new(a, width)).collect(),
            glyphs: [None; GLYPH_SLOTS as usize],
            power: false,
            brightness: POWER_ON_BRIGHTNESS,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, line: usize) -> Option<&DisplayLine> {
        self.lines.get(line)
    }

    pub fn glyph(&self, slot: u8) -> Option<&GlyphBitmap> {
        self.glyphs.get(slot as usize).and_then(Option::as_ref)
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn is_on(&self) -> bool {
        self.power
    }

    /// Switch the panel on and restore the remembered brightness
    pub fn power_on(&mut self) -> Result<(), DisplayError> {
        debug!("display on");
        self.bus.write_command(CMD_DISPLAY_ON)?;
        self.set_brightness(self.brightness)?;
        self.power = true;
        Ok(())
    }

    pub fn power_off(&mut self) -> Result<(), DisplayError> {
        debug!("display off");
        self.bus.write_command(CMD_DISPLAY_OFF)?;
        self.power = false;
        Ok(())
    }

    /// Write already fitted text and rewind the line's scroll state.
    ///
    /// Rewriting the cached text of a scrolled line puts its window back at
    /// column 0.
    pub fn write_line(&mut self, text: &str, line: usize) -> Result<(), DisplayError> {
        let data = encode_text(text);
        let width = self.width;
        let state = self.line_mut(line)?;
        if state.cached == data && state.offset != 0 {
            let address = state.address;
            self.bus.write_command(CMD_SET_DDRAM | address)?;
            self.bus.write_block(&data[..data.len().min(width)])?;
        } else {
            self.write_raw(&data, line)?;
        }
        self.line_mut(line)?.reset_scroll();
        Ok(())
    }

    /// Write bytes at the line's start address unless they match the cache.
    ///
    /// Only the first `width` bytes reach the device; the full sequence is
    /// cached for `shift`.
    pub fn write_raw(&mut self, data: &[u8], line: usize) -> Result<(), DisplayError> {
        let width = self.width;
        let state = self.lines.get_mut(line).ok_or(DisplayError::InvalidLine(line))?;
        if state.cached == data {
            return Ok(());
        }
        self.bus.write_command(CMD_SET_DDRAM | state.address)?;
        self.bus.write_block(&data[..data.len().min(width)])?;
        state.cached = data.to_vec();
        Ok(())
    }

    /// Advance the scroll window of a line wider than the display.
    ///
    /// Waits `dwell` calls at each end, then moves one column per call and
    /// bounces between 0 and `len - width`.
    pub fn shift(&mut self, line: usize, dwell: u32) -> Result<(), DisplayError> {
        let width = self.width;
        let state = self.lines.get_mut(line).ok_or(DisplayError::InvalidLine(line))?;
        let len = state.cached.len();
        if len <= width {
            return Ok(());
        }
        if state.dwell < dwell {
            state.dwell += 1;
            return Ok(());
        }

        let max_pos = len - width;
        let before = state.offset;
        match state.direction {
            ScrollDirection::Forward if state.offset < max_pos => state.offset += 1,
            ScrollDirection::Forward => {
                state.direction = ScrollDirection::Backward;
                state.dwell = 0;
            }
            ScrollDirection::Backward if state.offset > 0 => state.offset -= 1,
            ScrollDirection::Backward => {
                state.direction = ScrollDirection::Forward;
                state.dwell = 0;
            }
        }
        if state.offset == before {
            return Ok(());
        }

        let window = &state.cached[state.offset..state.offset + width];
        self.bus.write_command(CMD_SET_DDRAM | state.address)?;
        self.bus.write_block(window)
    }

    /// Program a CGRAM glyph unless the slot already holds this bitmap
    pub fn set_glyph(&mut self, slot: u8, rows: &GlyphBitmap) -> Result<(), DisplayError> {
        if slot >= GLYPH_SLOTS {
            return Err(DisplayError::InvalidGlyphSlot(slot));
        }
        let cached = &mut self.glyphs[slot as usize];
        if cached.as_ref() == Some(rows) {
            return Ok(());
        }
        self.bus.write_command(CMD_SET_CGRAM | (slot * GLYPH_ROWS as u8))?;
        self.bus.write_block(rows)?;
        *cached = Some(*rows);
        Ok(())
    }

    /// Issue the contrast sequence and remember the level for power-on
    pub fn set_brightness(&mut self, level: u8) -> Result<(), DisplayError> {
        self.brightness = level;
        for cmd in BRIGHTNESS_PREFIX {
            self.bus.write_command(cmd)?;
        }
        self.bus.write_command(level)?;
        for cmd in BRIGHTNESS_SUFFIX {
            self.bus.write_command(cmd)?;
        }
        Ok(())
    }

    fn line_mut(&mut self, line: usize) -> Result<&mut DisplayLine, DisplayError> {
        self.lines.get_mut(line).ok_or(DisplayError::InvalidLine(line))
    }
}

/// One byte per char; anything outside the 8-bit range becomes '?'
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
