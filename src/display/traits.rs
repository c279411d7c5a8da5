/*
 *  display/traits.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bus abstraction for character display controllers
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

use crate::display::error::DisplayError;

/// Minimal write-only transport to a character display controller.
///
/// The controller is addressed by a fixed bus and device address chosen when
/// the bus is opened; there is no read path.
pub trait CharBus: Send {
    /// Send a single instruction byte (cursor address, power, CGRAM select...)
    fn write_command(&mut self, command: u8) -> Result<(), DisplayError>;

    /// Send a run of data bytes to the current DDRAM/CGRAM address
    fn write_block(&mut self, data: &[u8]) -> Result<(), DisplayError>;
}

impl<B: CharBus + ?Sized> CharBus for Box<B> {
    fn write_command(&mut self, command: u8) -> Result<(), DisplayError> {
        (**self).write_command(command)
    }

    fn write_block(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        (**self).write_block(data)
    }
}
