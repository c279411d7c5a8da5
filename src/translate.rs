/*
 *  translate.rs
 *
 *  mpd-panel - front panel for the music player daemon
 *  (c) 2020-26 Stuart Hunter
 *
 *  Transliteration of kana/kanji to ASCII via kakasi, cached
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

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::{debug, warn};
use mini_moka::sync::Cache;

use crate::config::TranslitConfig;
use crate::constants::TRANSLIT_CACHE;

/// Text transform applied to titles before they reach the panel
pub trait Transliterate: Send + Sync {
    fn transliterate(&self, text: &str) -> String;
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Transliterate for Passthrough {
    fn transliterate(&self, text: &str) -> String {
        text.to_string()
    }
}

#[derive(Clone)]
pub struct Transliteration {
    kakasi_path: String,
    enabled: bool,
    cache: Arc<Cache<String, String>>,
}

impl Transliteration {
    pub fn new(cfg: &TranslitConfig) -> Self {
        let kakasi_path = cfg.kakasi_path();
        let enabled = cfg.enabled() && Path::new(&kakasi_path).exists();
        if cfg.enabled() && !enabled {
            warn!("kakasi not found at {}, transliteration disabled", kakasi_path);
        }
        Self {
            kakasi_path,
            enabled,
            cache: Arc::new(Cache::new(TRANSLIT_CACHE)), // a handful of titles in rotation
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn run_kakasi(&self, text: &str) -> std::io::Result<String> {
        let mut child = Command::new(&self.kakasi_path)
            .args(["-i", "utf8", "-o", "utf8", "-Ja", "-Ha", "-Ka", "-Ea", "-s"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(std::io::Error::other(format!("kakasi exited with {}", output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end_matches('\n').to_string())
    }
}

impl Transliterate for Transliteration {
    /// ASCII passes through without a lookup; anything else goes to kakasi
    /// once and is cached. Failures fall back to the input.
    fn transliterate(&self, text: &str) -> String {
        if !self.enabled || text.is_ascii() {
            return text.to_string();
        }
        if let Some(hit) = self.cache.get(&text.to_string()) {
            return hit;
        }
        match self.run_kakasi(text) {
            Ok(value) => {
                debug!("transliterated {:?} -> {:?}", text, value);
                self.cache.insert(text.to_string(), value.clone());
                value
            }
            Err(e) => {
                warn!("transliteration failed: {}", e);
                text.to_string()
            }
        }
    }
}
