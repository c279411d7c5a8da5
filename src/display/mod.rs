/*
 *  display/mod.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - character display over a byte bus
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

// Core trait definitions
pub mod traits;
pub mod error;

// Bus drivers
pub mod drivers;

// Line cache, scrolling and glyph slots
pub mod device;

// Progress bar synthesis
pub mod glyphs;

pub use device::{CharDisplay, DisplayLine, GlyphBitmap, ScrollDirection, encode_text};
pub use error::DisplayError;
pub use traits::CharBus;
