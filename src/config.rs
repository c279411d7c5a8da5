use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub player: Option<PlayerConfig>,
    /// display bus & geometry
    pub display: Option<DisplayConfig>,
    /// timers, scrolling and progress bar
    pub panel: Option<PanelConfig>,
    pub transliterate: Option<TranslitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerConfig {
    pub mpc_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub daemon: Option<String>,     // process-table needle for the liveness probe
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub bus: Option<String>,        // e.g. "/dev/i2c-1"
    pub address: Option<u8>,        // e.g. 0x3C
    pub line_addresses: Option<Vec<u8>>,
    pub width: Option<usize>,
    pub brightness: Option<u8>,     // 0-255
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStyle {
    #[default]
    Simple,
    Bordered,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelConfig {
    pub tick_ms: Option<u64>,
    pub suspend_secs: Option<u64>,
    pub hold_secs: Option<u64>,
    pub scroll_dwell: Option<u32>,
    pub progress_width: Option<usize>,
    pub progress_style: Option<ProgressStyle>,
    pub splash: Option<String>,
    pub splash_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranslitConfig {
    pub kakasi_path: Option<String>,
    pub enabled: Option<bool>,
}

impl PlayerConfig {
    pub fn mpc_path(&self) -> String { self.mpc_path.clone().unwrap_or_else(|| MPC_PATH.into()) }
    pub fn daemon(&self) -> String { self.daemon.clone().unwrap_or_else(|| MPD_DAEMON.into()) }
    pub fn backoff(&self) -> Duration { Duration::from_millis(self.backoff_ms.unwrap_or(BACKOFF_MS)) }
}

impl DisplayConfig {
    pub fn bus(&self) -> String { self.bus.clone().unwrap_or_else(|| I2C_BUS.into()) }
    pub fn address(&self) -> u8 { self.address.unwrap_or(I2C_ADDRESS) }
    pub fn line_addresses(&self) -> Vec<u8> {
        self.line_addresses.clone().unwrap_or_else(|| LINE_ADDRESSES.to_vec())
    }
    pub fn width(&self) -> usize { self.width.unwrap_or(DISPLAY_WIDTH) }
    pub fn brightness(&self) -> u8 { self.brightness.unwrap_or(DEFAULT_BRIGHTNESS) }
}

impl PanelConfig {
    pub fn tick(&self) -> Duration { Duration::from_millis(self.tick_ms.unwrap_or(TICK_MS)) }
    pub fn suspend(&self) -> Duration { Duration::from_secs(self.suspend_secs.unwrap_or(SUSPEND_SECS)) }
    pub fn hold(&self) -> Duration { Duration::from_secs(self.hold_secs.unwrap_or(HOLD_SECS)) }
    pub fn scroll_dwell(&self) -> u32 { self.scroll_dwell.unwrap_or(SCROLL_DWELL) }
    pub fn progress_width(&self) -> usize { self.progress_width.unwrap_or(PROGRESS_WIDTH) }
    pub fn progress_style(&self) -> ProgressStyle { self.progress_style.unwrap_or_default() }
    pub fn splash(&self) -> String { self.splash.clone().unwrap_or_else(|| SPLASH_TEXT.into()) }
    pub fn splash_time(&self) -> Duration { Duration::from_secs(self.splash_secs.unwrap_or(SPLASH_SECS)) }
}

impl TranslitConfig {
    pub fn kakasi_path(&self) -> String { self.kakasi_path.clone().unwrap_or_else(|| KAKASI_PATH.into()) }
    pub fn enabled(&self) -> bool { self.enabled.unwrap_or(true) }
}

impl Config {
    pub fn player(&self) -> PlayerConfig { self.player.clone().unwrap_or_default() }
    pub fn display(&self) -> DisplayConfig { self.display.clone().unwrap_or_default() }
    pub fn panel(&self) -> PanelConfig { self.panel.clone().unwrap_or_default() }
    pub fn transliterate(&self) -> TranslitConfig { self.transliterate.clone().unwrap_or_default() }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "mpd-panel", version, about = "MPD front-panel monitor", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// MPD host handed to mpc
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    /// I2C bus device path (e.g., /dev/i2c-1)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub i2c_bus: Option<String>,
    #[arg(long, value_parser = parse_address)]
    pub i2c_address: Option<u8>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long)]
    pub suspend_secs: Option<u64>,
    #[arg(long)]
    pub progress_style: Option<ProgressStyle>,
    /// Skip the startup splash
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_splash: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Accepts `0x3c` or `60`.
fn parse_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid I2C address '{}': {}", s, e))
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok((cfg, cli))
}

/// Layer defaults, YAML and CLI for an already parsed command line.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/mpd-panel/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/mpd-panel/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/mpd-panel.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["mpd-panel.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.player.is_some()         { dst.player = src.player; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.panel, src.panel) {
        (None, Some(c)) => dst.panel = Some(c),
        (Some(d), Some(s)) => merge_panel(d, s),
        _ => {}
    }
    if src.transliterate.is_some()  { dst.transliterate = src.transliterate; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.bus.is_some()            { dst.bus = src.bus; }
    if src.address.is_some()        { dst.address = src.address; }
    if src.line_addresses.is_some() { dst.line_addresses = src.line_addresses; }
    if src.width.is_some()          { dst.width = src.width; }
    if src.brightness.is_some()     { dst.brightness = src.brightness; }
}

fn merge_panel(dst: &mut PanelConfig, src: PanelConfig) {
    if src.tick_ms.is_some()        { dst.tick_ms = src.tick_ms; }
    if src.suspend_secs.is_some()   { dst.suspend_secs = src.suspend_secs; }
    if src.hold_secs.is_some()      { dst.hold_secs = src.hold_secs; }
    if src.scroll_dwell.is_some()   { dst.scroll_dwell = src.scroll_dwell; }
    if src.progress_width.is_some() { dst.progress_width = src.progress_width; }
    if src.progress_style.is_some() { dst.progress_style = src.progress_style; }
    if src.splash.is_some()         { dst.splash = src.splash; }
    if src.splash_secs.is_some()    { dst.splash_secs = src.splash_secs; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug                     { cfg.log_level = Some("debug".into()); }
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }

    if cli.host.is_some() || cli.port.is_some() {
        let player = cfg.player.get_or_insert_with(PlayerConfig::default);
        if cli.host.is_some()        { player.host = cli.host.clone(); }
        if cli.port.is_some()        { player.port = cli.port; }
    }

    if cli.i2c_bus.is_some() || cli.i2c_address.is_some() || cli.brightness.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.i2c_bus.is_some()     { display.bus = cli.i2c_bus.clone(); }
        if cli.i2c_address.is_some() { display.address = cli.i2c_address; }
        if cli.brightness.is_some()  { display.brightness = cli.brightness; }
    }

    if cli.suspend_secs.is_some() || cli.progress_style.is_some() || cli.no_splash {
        let panel = cfg.panel.get_or_insert_with(PanelConfig::default);
        if cli.suspend_secs.is_some()   { panel.suspend_secs = cli.suspend_secs; }
        if cli.progress_style.is_some() { panel.progress_style = cli.progress_style; }
        if cli.no_splash                { panel.splash_secs = Some(0); }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let display = cfg.display();
    let panel = cfg.panel();
    if display.width() == 0 {
        return Err(ConfigError::Validation("display width must be > 0".into()));
    }
    if display.line_addresses().is_empty() {
        return Err(ConfigError::Validation("display needs at least one line address".into()));
    }
    if panel.tick().is_zero() {
        return Err(ConfigError::Validation("panel tick_ms must be > 0".into()));
    }
    let pw = panel.progress_width();
    if pw == 0 || pw > display.width() {
        return Err(ConfigError::Validation(format!(
            "progress_width must be 1..={}", display.width()
        )));
    }
    if panel.progress_style() == ProgressStyle::Bordered && pw < 2 {
        return Err(ConfigError::Validation("bordered progress bar needs progress_width >= 2".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::default();
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.display().width(), DISPLAY_WIDTH);
        assert_eq!(cfg.display().line_addresses(), vec![0x00, 0x20]);
        assert_eq!(cfg.panel().progress_style(), ProgressStyle::Simple);
    }

    #[test]
    fn test_yaml_groups() {
        let cfg = parse_yaml(
            "log_level: debug\n\
             display:\n  width: 20\n  address: 0x3d\n\
             panel:\n  progress_style: bordered\n  suspend_secs: 30\n",
        ).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.display().width(), 20);
        assert_eq!(cfg.display().address(), 0x3d);
        assert_eq!(cfg.panel().progress_style(), ProgressStyle::Bordered);
        assert_eq!(cfg.panel().suspend(), Duration::from_secs(30));
        assert_eq!(cfg.panel().hold(), Duration::from_secs(HOLD_SECS));
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml("display:\n  brightness: 10\n").unwrap();
        let cli = Cli {
            brightness: Some(200),
            i2c_address: Some(0x27),
            no_splash: true,
            debug: true,
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.display().brightness(), 200);
        assert_eq!(cfg.display().address(), 0x27);
        assert_eq!(cfg.panel().splash_time(), Duration::ZERO);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_validation_rejects_wide_bar() {
        let cfg = parse_yaml("panel:\n  progress_width: 17\n").unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x3c"), Ok(0x3c));
        assert_eq!(parse_address("60"), Ok(60));
        assert!(parse_address("0xzz").is_err());
    }
}
