/*
 *  display/drivers/i2c.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  I2C character display bus (US2066 / SSD1311 style controllers)
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

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use log::info;

use crate::constants::{CTRL_COMMAND, CTRL_DATA};
use crate::display::error::DisplayError;
use crate::display::traits::CharBus;

/// Character display reached through a Linux i2c-dev node
pub struct I2cCharBus {
    i2c: I2cdev,
    address: u8,
    frame: Vec<u8>,
}

impl I2cCharBus {
    /// Open the I2C device (e.g. "/dev/i2c-1") for the controller at `address`
    pub fn new(i2c_bus_path: &str, address: u8) -> Result<Self, DisplayError> {
        info!("Opening character display on {} at address 0x{:02X}", i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::InitializationFailed(format!("Failed to open {}: {}", i2c_bus_path, e)))?;

        Ok(Self { i2c, address, frame: Vec::with_capacity(41) })
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl CharBus for I2cCharBus {
    fn write_command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.i2c.write(self.address, &[CTRL_COMMAND, command])?;
        Ok(())
    }

    fn write_block(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        // control byte then payload, one transaction
        self.frame.clear();
        self.frame.push(CTRL_DATA);
        self.frame.extend_from_slice(data);
        self.i2c.write(self.address, &self.frame)?;
        Ok(())
    }
}
