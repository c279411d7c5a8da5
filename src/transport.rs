/*
 *  transport.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Synchronous player transport via the mpc command-line client
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

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;
use thiserror::Error;

use crate::config::PlayerConfig;

/// Failure talking to the player daemon.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The client binary could not be started at all.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The client ran but reported failure (daemon unreachable, bad command...).
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("{command} produced non UTF-8 output")]
    Utf8 { command: String },
}

/// Minimal contract the status synchronizer needs from the player.
///
/// Every call blocks the calling thread; `wait_for_change` may block for as
/// long as the player stays idle.
pub trait PlayerTransport: Send + Sync {
    /// Run a status query; `format_spec` selects the song fields returned
    /// on the first line. Returns the raw output lines.
    fn query(&self, format_spec: &str) -> Result<Vec<String>, TransportError>;

    /// Block until the player reports a change of any kind.
    fn wait_for_change(&self) -> Result<(), TransportError>;

    /// True when the daemon process is still running.
    fn probe_alive(&self) -> bool;
}

/// `mpc` backed transport
#[derive(Debug, Clone)]
pub struct MpcTransport {
    mpc_path: String,
    host: Option<String>,
    port: Option<u16>,
    daemon: String,
}

impl MpcTransport {
    pub fn new(cfg: &PlayerConfig) -> Self {
        Self {
            mpc_path: cfg.mpc_path(),
            host: cfg.host.clone(),
            port: cfg.port,
            daemon: cfg.daemon(),
        }
    }

    /// Run an arbitrary client command, e.g. `invoke("next", &[])`.
    pub fn invoke(&self, command: &str, args: &[&str]) -> Result<String, TransportError> {
        let mut cmd = Command::new(&self.mpc_path);
        if let Some(host) = &self.host {
            cmd.arg("--host").arg(host);
        }
        if let Some(port) = self.port {
            cmd.arg("--port").arg(port.to_string());
        }
        if !command.is_empty() {
            cmd.arg(command);
        }
        cmd.args(args);

        let label = format!("{} {}", self.mpc_path, command).trim_end().to_string();
        debug!("invoke {} {:?}", label, args);

        let output = cmd.output().map_err(|source| TransportError::Spawn {
            command: label.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                command: label,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| TransportError::Utf8 { command: label })
    }
}

impl PlayerTransport for MpcTransport {
    fn query(&self, format_spec: &str) -> Result<Vec<String>, TransportError> {
        let out = self.invoke("", &["-f", format_spec])?;
        Ok(out.lines().map(str::to_string).collect())
    }

    fn wait_for_change(&self) -> Result<(), TransportError> {
        self.invoke("idle", &[]).map(|_| ())
    }

    fn probe_alive(&self) -> bool {
        process_running(&self.daemon)
    }
}

/// Scan the process table, skipping ourselves, for a process started as
/// `daemon`.
fn process_running(daemon: &str) -> bool {
    let Ok(entries) = fs::read_dir("/proc") else {
        return false;
    };
    let own = std::process::id().to_string();
    entries
        .filter_map(Result::ok)
        .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
        .filter(|(pid, _)| *pid != own && pid.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|(_, path)| fs::read(path.join("cmdline")).ok())
        .any(|raw| cmdline_matches(&raw, daemon))
}

/// argv[0] names `daemon`, by full path or by file name
fn cmdline_matches(raw: &[u8], daemon: &str) -> bool {
    // arguments are NUL separated
    let Some(argv0) = raw.split(|b| *b == 0).next().filter(|a| !a.is_empty()) else {
        return false;
    };
    let argv0 = String::from_utf8_lossy(argv0);
    if argv0 == daemon {
        return true;
    }
    let name = |p: &str| Path::new(p).file_name().map(|n| n.to_os_string());
    let argv0_name = name(argv0.as_ref());
    argv0_name.is_some() && argv0_name == name(daemon)
}

/// One scripted answer of a [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Query succeeds with these lines
    Reply(Vec<String>),
    /// Query fails; `alive` is what the liveness probe reports afterwards
    Fail { alive: bool },
}

/// Transport that replays a fixed script, for tests and dry runs.
///
/// `wait_for_change` returns at once; once the script runs dry every query
/// fails with the daemon reported down.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<ScriptStep>>,
    alive: AtomicBool,
    queries: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            alive: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl PlayerTransport for ScriptedTransport {
    fn query(&self, _format_spec: &str) -> Result<Vec<String>, TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match step {
            Some(ScriptStep::Reply(lines)) => {
                self.alive.store(true, Ordering::SeqCst);
                Ok(lines)
            }
            Some(ScriptStep::Fail { alive }) => {
                self.alive.store(alive, Ordering::SeqCst);
                Err(TransportError::CommandFailed {
                    command: "scripted".into(),
                    status: 1,
                    stderr: "error: Connection refused".into(),
                })
            }
            None => {
                self.alive.store(false, Ordering::SeqCst);
                Err(TransportError::CommandFailed {
                    command: "scripted".into(),
                    status: 1,
                    stderr: "script exhausted".into(),
                })
            }
        }
    }

    fn wait_for_change(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn probe_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
