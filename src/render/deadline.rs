/*
 *  render/deadline.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Lock-free deadlines shared between event callbacks and tick jobs
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

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Millisecond clock anchored at a fixed epoch
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    pub fn now_ms(&self) -> u64 {
        self.ms_at(Instant::now())
    }

    pub fn ms_at(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_millis()).unwrap_or(u64::MAX)
    }

    pub fn after(&self, delay: Duration) -> u64 {
        let delay = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.now_ms().saturating_add(delay)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// An optional point in time, armed and read from any thread.
///
/// Stored as `ms + 1` so that zero means disarmed.
#[derive(Debug, Default)]
pub struct Deadline {
    at: AtomicU64,
}

impl Deadline {
    pub const fn new() -> Self {
        Self { at: AtomicU64::new(0) }
    }

    pub fn arm(&self, at_ms: u64) {
        self.at.store(at_ms.saturating_add(1), Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.at.store(0, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.at.load(Ordering::SeqCst) != 0
    }

    pub fn get(&self) -> Option<u64> {
        match self.at.load(Ordering::SeqCst) {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Armed and reached
    pub fn has_passed(&self, now_ms: u64) -> bool {
        self.get().is_some_and(|at| now_ms >= at)
    }

    /// Armed and not yet reached
    pub fn is_pending(&self, now_ms: u64) -> bool {
        self.get().is_some_and(|at| now_ms < at)
    }

    /// Move the deadline to `at_ms` only if it is currently armed.
    ///
    /// Returns false when disarmed; a concurrent disarm wins.
    pub fn extend_if_armed(&self, at_ms: u64) -> bool {
        self.at
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur != 0).then(|| at_ms.saturating_add(1))
            })
            .is_ok()
    }
}
