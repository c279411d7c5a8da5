/*
 *  mpdinfo.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Player status synchronizer - polls mpd, keeps the snapshot, emits events
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

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::config::PlayerConfig;
use crate::constants::{FETCH_FIELDS, FIELD_SEPARATOR};
use crate::transport::{PlayerTransport, TransportError};

// [playing] #3/12   1:23/4:56 (28%)
static STATUS_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]\s+#(\d+)/(\d+)\s+([\d:]+)/([\d:]+)").ok()
});

/// Separator between `key: value` pairs on the option line
const SETTINGS_SEPARATOR: &str = "   ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayStatus {
    Playing,
    Paused,
    Stopped,
}

impl FromStr for PlayStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "playing" => Ok(PlayStatus::Playing),
            "paused" => Ok(PlayStatus::Paused),
            "stopped" => Ok(PlayStatus::Stopped),
            other => Err(ParseError::StatusLine(format!("unknown state [{}]", other))),
        }
    }
}

/// Song metadata as reported on the first status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    pub artist: String,
    pub title: String,
    pub track: String,
    pub album: String,
}

/// Point-in-time copy of the player state.
///
/// `status` stays `None` until the first successful sample so that the very
/// first observation always produces an event.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub song: Song,
    pub status: Option<PlayStatus>,
    /// Seconds, as sampled
    pub elapsed: u32,
    /// Seconds; zero for streams with no known length
    pub length: u32,
    pub sampled_at: Instant,
    pub playlist_pos: u32,
    pub playlist_size: u32,
    /// Player option flags (volume, repeat, random...)
    pub options: BTreeMap<String, String>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            song: Song::default(),
            status: None,
            elapsed: 0,
            length: 0,
            sampled_at: Instant::now(),
            playlist_pos: 0,
            playlist_size: 0,
            options: BTreeMap::new(),
        }
    }
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.status == Some(PlayStatus::Playing)
    }

    /// Copy with elapsed advanced to `now` while playing, clamped to length.
    pub fn extrapolated(&self, now: Instant) -> PlayerSnapshot {
        let mut snap = self.clone();
        if snap.is_playing() {
            let drift = now.saturating_duration_since(self.sampled_at).as_secs();
            let elapsed = u64::from(self.elapsed).saturating_add(drift);
            snap.elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
            if snap.length > 0 {
                snap.elapsed = snap.elapsed.min(snap.length);
            }
        }
        snap
    }
}

/// Discrete player state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    Stopped,
    Started,
    Paused,
    TrackChanged,
    ServerDown,
    ServerWakeUp,
    ServerHangUp,
}

impl StatusEvent {
    /// Human label, as shown on the panel
    pub fn label(&self) -> &'static str {
        match self {
            StatusEvent::Stopped => "stopped",
            StatusEvent::Started => "playing",
            StatusEvent::Paused => "paused",
            StatusEvent::TrackChanged => "changed",
            StatusEvent::ServerDown => "server down",
            StatusEvent::ServerWakeUp => "server wakeup",
            StatusEvent::ServerHangUp => "server hang-up",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected response shape ({0} lines)")]
    Shape(usize),
    #[error("bad status line: {0}")]
    StatusLine(String),
}

/// One parsed status response
#[derive(Debug, Clone, PartialEq)]
pub enum StatusResponse {
    Active {
        song: Song,
        status: PlayStatus,
        playlist_pos: u32,
        playlist_size: u32,
        elapsed: u32,
        length: u32,
        options: BTreeMap<String, String>,
    },
    Stopped {
        options: BTreeMap<String, String>,
    },
}

/// `-f` argument selecting the song fields, separated by `FIELD_SEPARATOR`
pub fn format_spec() -> String {
    let separator = FIELD_SEPARATOR.to_string();
    FETCH_FIELDS
        .iter()
        .map(|f| format!("%{}%", f))
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

/// Classify and parse the raw lines of one status query.
///
/// A single line is the option line of a stopped player. Three lines (or four
/// when mpc adds an error line) are song, status, [error,] options.
pub fn parse_status(lines: &[String]) -> Result<StatusResponse, ParseError> {
    match lines.len() {
        1 => Ok(StatusResponse::Stopped {
            options: parse_settings(&lines[0]),
        }),
        3 | 4 => {
            let song = parse_song(&lines[0]);
            let (status, playlist_pos, playlist_size, elapsed, length) = parse_status_line(&lines[1])?;
            let options = parse_settings(&lines[lines.len() - 1]);
            Ok(StatusResponse::Active {
                song,
                status,
                playlist_pos,
                playlist_size,
                elapsed,
                length,
                options,
            })
        }
        n => Err(ParseError::Shape(n)),
    }
}

fn parse_song(line: &str) -> Song {
    let mut fields = line.split(FIELD_SEPARATOR).map(|s| s.trim().to_string());
    Song {
        artist: fields.next().unwrap_or_default(),
        title: fields.next().unwrap_or_default(),
        track: fields.next().unwrap_or_default(),
        album: fields.next().unwrap_or_default(),
    }
}

fn parse_status_line(line: &str) -> Result<(PlayStatus, u32, u32, u32, u32), ParseError> {
    let re = STATUS_LINE
        .as_ref()
        .ok_or_else(|| ParseError::StatusLine("status pattern unavailable".into()))?;
    let caps = re
        .captures(line.trim())
        .ok_or_else(|| ParseError::StatusLine(line.to_string()))?;
    let bad = || ParseError::StatusLine(line.to_string());

    let status: PlayStatus = caps[1].parse()?;
    let pos = caps[2].parse().map_err(|_| bad())?;
    let size = caps[3].parse().map_err(|_| bad())?;
    let elapsed = parse_clock(&caps[4]).ok_or_else(bad)?;
    let length = parse_clock(&caps[5]).ok_or_else(bad)?;
    Ok((status, pos, size, elapsed, length))
}

/// `m:ss` or `h:mm:ss` to seconds
pub fn parse_clock(text: &str) -> Option<u32> {
    text.split(':').try_fold(0u32, |acc, part| {
        let n: u32 = part.parse().ok()?;
        acc.checked_mul(60)?.checked_add(n)
    })
}

/// `volume: 80%   repeat: off   random: on` into a key/value map
pub fn parse_settings(line: &str) -> BTreeMap<String, String> {
    line.split(SETTINGS_SEPARATOR)
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

pub type Callback = Arc<dyn Fn(StatusEvent) + Send + Sync>;

/// Owns the authoritative snapshot and the polling loop.
///
/// Callbacks run on the polling thread, after the snapshot for the cycle has
/// been updated. They must not block.
pub struct StatusSynchronizer<T: PlayerTransport> {
    transport: T,
    format_spec: String,
    backoff: Duration,
    state: Mutex<PlayerSnapshot>,
    callbacks: RwLock<HashMap<StatusEvent, Vec<Callback>>>,
    server_down: AtomicBool,
    // last cycle failed; the snapshot is stale until the next good sample
    faulted: AtomicBool,
    running: AtomicBool,
}

impl<T: PlayerTransport + 'static> StatusSynchronizer<T> {
    pub fn new(transport: T, cfg: &PlayerConfig) -> Self {
        Self::with_backoff(transport, cfg.backoff())
    }

    pub fn with_backoff(transport: T, backoff: Duration) -> Self {
        Self {
            transport,
            format_spec: format_spec(),
            backoff,
            state: Mutex::new(PlayerSnapshot::default()),
            callbacks: RwLock::new(HashMap::new()),
            server_down: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
            running: AtomicBool::new(true),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register `callback` for `event`; callbacks fire in registration order.
    pub fn bind<F>(&self, event: StatusEvent, callback: F)
    where
        F: Fn(StatusEvent) + Send + Sync + 'static,
    {
        let mut map = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        map.entry(event).or_default().push(Arc::new(callback));
    }

    /// Copy of the current state, elapsed extrapolated to now
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Elapsed is frozen at the last good sample while the player is
    /// unreachable.
    pub fn snapshot_at(&self, now: Instant) -> PlayerSnapshot {
        let snap = self.lock_state();
        if self.is_faulted() {
            snap.clone()
        } else {
            snap.extrapolated(now)
        }
    }

    pub fn is_server_down(&self) -> bool {
        self.server_down.load(Ordering::SeqCst)
    }

    /// True from a failed cycle until the next response is applied
    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    /// One poll cycle: query, classify, dispatch, then wait for a change.
    ///
    /// Returns the events dispatched, in order.
    pub fn step(&self) -> Vec<StatusEvent> {
        let lines = match self.transport.query(&self.format_spec) {
            Ok(lines) => lines,
            Err(e) => return self.fail(e),
        };

        let events = self.apply(&lines, Instant::now());
        self.dispatch(&events);

        match self.transport.wait_for_change() {
            Ok(()) => events,
            Err(e) => {
                let mut all = events;
                all.extend(self.fail(e));
                all
            }
        }
    }

    /// Poll until `stop` is called. A panicking callback costs one cycle.
    pub fn run(&self) {
        info!("Status synchronizer started");
        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                error!("Status cycle panicked: {:?}", e);
                thread::sleep(self.backoff);
            }
        }
        info!("Status synchronizer stopped");
    }

    /// Ask the loop to exit after the current cycle.
    ///
    /// The loop may stay parked in the idle wait until the player next changes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run the loop on a named background thread
    pub fn spawn(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let me = Arc::clone(self);
        thread::Builder::new()
            .name("mpd-status".into())
            .spawn(move || me.run())
    }

    /// Fold one response into the snapshot and classify what changed.
    fn apply(&self, lines: &[String], now: Instant) -> Vec<StatusEvent> {
        let response = parse_status(lines).unwrap_or_else(|e| {
            debug!("Status treated as stopped: {}", e);
            StatusResponse::Stopped { options: BTreeMap::new() }
        });

        let mut events = Vec::with_capacity(3);
        self.faulted.store(false, Ordering::SeqCst);
        if self.server_down.swap(false, Ordering::SeqCst) {
            info!("mpd is back");
            events.push(StatusEvent::ServerWakeUp);
        }

        let mut snap = self.lock_state();
        match response {
            StatusResponse::Active {
                song,
                status,
                playlist_pos,
                playlist_size,
                elapsed,
                length,
                options,
            } => {
                if snap.status != Some(status) {
                    snap.status = Some(status);
                    events.push(match status {
                        PlayStatus::Playing => StatusEvent::Started,
                        PlayStatus::Paused => StatusEvent::Paused,
                        PlayStatus::Stopped => StatusEvent::Stopped,
                    });
                }
                if snap.playlist_pos != playlist_pos {
                    snap.playlist_pos = playlist_pos;
                    events.push(StatusEvent::TrackChanged);
                }
                snap.song = song;
                snap.playlist_size = playlist_size;
                snap.elapsed = elapsed;
                snap.length = length;
                snap.options = options;
            }
            StatusResponse::Stopped { options } => {
                if snap.status != Some(PlayStatus::Stopped) {
                    snap.status = Some(PlayStatus::Stopped);
                    events.push(StatusEvent::Stopped);
                }
                if !options.is_empty() {
                    snap.options = options;
                }
            }
        }
        snap.sampled_at = now;
        drop(snap);

        if !events.is_empty() {
            debug!("Status events {:?}", events);
        }
        events
    }

    /// Classify a transport failure, report it and back off.
    fn fail(&self, err: TransportError) -> Vec<StatusEvent> {
        self.faulted.store(true, Ordering::SeqCst);
        let events = if self.transport.probe_alive() {
            warn!("mpd is running but not answering: {}", err);
            vec![StatusEvent::ServerHangUp]
        } else if !self.server_down.swap(true, Ordering::SeqCst) {
            warn!("mpd is down: {}", err);
            vec![StatusEvent::ServerDown]
        } else {
            debug!("mpd still down: {}", err);
            Vec::new()
        };
        self.dispatch(&events);
        thread::sleep(self.backoff);
        events
    }

    fn dispatch(&self, events: &[StatusEvent]) {
        for event in events {
            // clone the handlers out so a callback may bind without deadlock
            let handlers = {
                let map = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
                map.get(event).cloned().unwrap_or_default()
            };
            for handler in handlers {
                handler(*event);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PlayerSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
