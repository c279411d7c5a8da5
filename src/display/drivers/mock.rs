/*
 *  display/drivers/mock.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock character bus for testing without hardware
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::traits::CharBus;

/// One recorded bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Command(u8),
    Block(Vec<u8>),
}

/// Mock bus for testing
///
/// Records every transaction so tests can assert on exactly what reached the
/// wire. Clones share the same state, so a test can keep one handle while the
/// display owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockBusState>>,
}

/// Internal state for the mock bus (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Every transaction in order
    pub ops: Vec<BusOp>,

    /// Number of write_command calls
    pub command_count: usize,

    /// Number of write_block calls
    pub block_count: usize,

    /// Simulate failures (for error testing)
    pub simulate_failure: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockBusState>> {
        Arc::clone(&self.state)
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.lock().ops.clone()
    }

    /// Data blocks only, in order
    pub fn blocks(&self) -> Vec<Vec<u8>> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Block(b) => Some(b.clone()),
                BusOp::Command(_) => None,
            })
            .collect()
    }

    pub fn block_count(&self) -> usize {
        self.lock().block_count
    }

    pub fn set_failure(&self, fail: bool) {
        self.lock().simulate_failure = fail;
    }

    /// Reset state counters (useful between test phases)
    pub fn reset(&self) {
        let mut state = self.lock();
        state.ops.clear();
        state.command_count = 0;
        state.block_count = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockBusState> {
        // a poisoned mock only happens when a test already failed
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CharBus for MockBus {
    fn write_command(&mut self, command: u8) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if state.simulate_failure {
            return Err(DisplayError::I2cError("Simulated bus failure".to_string()));
        }
        state.command_count += 1;
        state.ops.push(BusOp::Command(command));
        Ok(())
    }

    fn write_block(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        let mut state = self.lock();
        if state.simulate_failure {
            return Err(DisplayError::I2cError("Simulated bus failure".to_string()));
        }
        state.block_count += 1;
        state.ops.push(BusOp::Block(data.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_bus_records_in_order() {
        let mut bus = MockBus::new();
        let probe = bus.clone();

        bus.write_command(0x80).unwrap();
        bus.write_block(b"HI").unwrap();

        assert_eq!(probe.ops(), vec![BusOp::Command(0x80), BusOp::Block(b"HI".to_vec())]);
        assert_eq!(probe.block_count(), 1);
        assert_eq!(probe.state().lock().unwrap().command_count, 1);
    }

    #[test]
    fn test_mock_bus_simulated_failure() {
        let mut bus = MockBus::new();
        bus.set_failure(true);
        assert!(bus.write_command(0x0c).is_err());
        assert!(bus.write_block(&[1, 2]).is_err());
        assert!(bus.ops().is_empty());

        bus.set_failure(false);
        assert!(bus.write_command(0x0c).is_ok());
    }
}
