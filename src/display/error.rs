/*
 *  display/error.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error type for the character display subsystem
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

use std::fmt;
use std::error::Error;

/// Unified error type for all display operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// Bus could not be opened
    InitializationFailed(String),

    /// I2C communication error
    I2cError(String),

    /// Line index beyond the configured line count
    InvalidLine(usize),

    /// Glyph slot beyond what the controller offers
    InvalidGlyphSlot(u8),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::I2cError(msg) =>
                write!(f, "I2C communication error: {}", msg),
            DisplayError::InvalidLine(line) =>
                write!(f, "Invalid display line: {}", line),
            DisplayError::InvalidGlyphSlot(slot) =>
                write!(f, "Invalid glyph slot: {} (must be 0-7)", slot),
            DisplayError::Other(msg) =>
                write!(f, "{}", msg),
        }
    }
}

impl Error for DisplayError {}

// Conversion from Linux I2C errors
impl From<linux_embedded_hal::I2CError> for DisplayError {
    fn from(err: linux_embedded_hal::I2CError) -> Self {
        DisplayError::I2cError(format!("{:?}", err))
    }
}
