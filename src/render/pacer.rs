/*
 *  render/pacer.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed period tick pacing
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
use std::thread;
use std::time::{Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    period: Duration,
}

// 5Hz is plenty for a 16x2 panel over I²C
impl Pacer {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self { next_deadline: Instant::now() + period, period }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next tick is due.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if let Some(left) = self.next_deadline.checked_duration_since(now) {
            thread::sleep(left);
        }
        self.schedule(Instant::now());
    }

    // keep the cadence, but never try to catch up on missed ticks
    fn schedule(&mut self, now: Instant) {
        self.next_deadline += self.period;
        if self.next_deadline <= now {
            self.next_deadline = now + self.period;
        }
    }
}
