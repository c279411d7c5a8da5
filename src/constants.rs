//! This module contains global constants used across the panel, display and player modules.

// player / transport
/// Default path of the command-line client used to talk to the daemon.
pub const MPC_PATH: &str = "/usr/bin/mpc";
/// Process-table needle used to decide whether the daemon is still running.
pub const MPD_DAEMON: &str = "/usr/bin/mpd";
/// Pause between retries after a transport failure.
pub const BACKOFF_MS: u64 = 1000;
/// Song fields requested from the daemon, in the order they come back.
pub const FETCH_FIELDS: [&str; 4] = ["artist", "title", "track", "album"];
/// Separator placed between the requested song fields.
pub const FIELD_SEPARATOR: char = '\u{1}';

// display bus
/// I2C character device of the front panel.
pub const I2C_BUS: &str = "/dev/i2c-1";
/// 7-bit bus address of the display controller.
pub const I2C_ADDRESS: u8 = 0x3c;
/// DDRAM start address of each line.
pub const LINE_ADDRESSES: [u8; 2] = [0x00, 0x20];
/// Number of visible characters per line.
pub const DISPLAY_WIDTH: usize = 16;
/// Brightness applied at startup and restored on every power-on.
pub const DEFAULT_BRIGHTNESS: u8 = 0xff;
/// Brightness the controller comes up with before anyone asks otherwise.
pub const POWER_ON_BRIGHTNESS: u8 = 0x7f;

// controller command bytes
pub const CMD_DISPLAY_ON: u8 = 0x0c;
pub const CMD_DISPLAY_OFF: u8 = 0x08;
pub const CMD_SET_DDRAM: u8 = 0x80;
pub const CMD_SET_CGRAM: u8 = 0x40;
/// Control byte prefix for a command write.
pub const CTRL_COMMAND: u8 = 0x00;
/// Control byte prefix for a data write.
pub const CTRL_DATA: u8 = 0x40;
/// Extended-instruction dance that wraps the contrast command.
pub const BRIGHTNESS_PREFIX: [u8; 3] = [0x2a, 0x79, 0x81];
pub const BRIGHTNESS_SUFFIX: [u8; 2] = [0x78, 0x28];

// custom glyphs
/// Programmable glyph slots offered by the controller.
pub const GLYPH_SLOTS: u8 = 8;
/// Rows in one glyph bitmap.
pub const GLYPH_ROWS: usize = 8;
/// Pixel columns in one character cell.
pub const GLYPH_COLUMNS: u32 = 5;

// panel behaviour
/// Timer tick interval (~5Hz).
pub const TICK_MS: u64 = 200;
/// Seconds of inactivity after pause/stop before the display is switched off.
pub const SUSPEND_SECS: u64 = 10;
/// Seconds the title/artist text is protected from the progress redraw.
pub const HOLD_SECS: u64 = 4;
/// Ticks a scroll step waits before moving.
pub const SCROLL_DWELL: u32 = 30;
/// Progress bar width in character cells.
pub const PROGRESS_WIDTH: usize = 10;
pub const SPLASH_TEXT: &str = "RuneAudio";
pub const SPLASH_SECS: u64 = 2;

// transliteration
pub const KAKASI_PATH: &str = "/usr/bin/kakasi";
/// Phrases kept by the transliteration cache.
pub const TRANSLIT_CACHE: u64 = 64;
