//! TOML configuration for the watcher.
//!
//! Example (this is also the file written on first run):
//!
//! ```toml
//! [device]
//! vid = 0x1234
//! pid = 0x5678
//! usage_page = 0xFF60
//! usage = 0x61
//!
//! [sounds]
//! volume = 0.5
//! layer_up = "sounds/layer_up.wav"
//!
//! [enabled_sounds]
//! layer_up = true
//!
//! [logging]
//! level = "info"
//! file = "a11y-hid-watcher.log"
//! ```
//!
//! Every field has a default, so a partial file (or an empty one) is valid.
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::cue::Cue;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "a11y-hid-watcher.toml";

/// Contents written to disk when no config file exists yet.
pub const DEFAULT_CONFIG: &str = r#"# a11y-hid-watcher configuration

[device]
# USB ids of the keyboard.  Replace with your board's values.
vid = 0x1234
pid = 0x5678
# Raw HID interface usage (QMK default: 0xFF60 / 0x61).
usage_page = 0xFF60
usage = 0x61

[sounds]
volume = 0.5
# Program used to play a cue; the WAV path is appended after the arguments.
# {pa_volume} expands to 0..65536, {volume} to 0.0..1.0.
player = "paplay"
player_args = ["--volume={pa_volume}"]
layer_up = "sounds/layer_up.wav"
layer_down = "sounds/layer_down.wav"
caps_word_on = "sounds/caps_word_on.wav"
caps_word_off = "sounds/caps_word_off.wav"
program_start = "sounds/program_start.wav"
program_exit = "sounds/program_exit.wav"
error = "sounds/error.wav"
keyboard_connect = "sounds/keyboard_connect.wav"
keyboard_disconnect = "sounds/keyboard_disconnect.wav"

[enabled_sounds]
layer_up = true
layer_down = true
caps_word_on = true
caps_word_off = true
program_start = true
program_exit = true
error = true
keyboard_connect = true
keyboard_disconnect = true

[logging]
level = "info"
file = "a11y-hid-watcher.log"
"#;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The volume is outside 0.0..=1.0.
    #[error("sound volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level watcher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WatcherConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sounds: SoundsConfig,
    #[serde(default)]
    pub enabled_sounds: EnabledSounds,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which HID interface to open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    #[serde(default = "default_vid")]
    pub vid: u16,
    #[serde(default = "default_pid")]
    pub pid: u16,
    #[serde(default = "default_usage_page")]
    pub usage_page: u16,
    #[serde(default = "default_usage")]
    pub usage: u16,
}

/// Sound file per cue plus playback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoundsConfig {
    /// Global volume, 0.0 to 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
    #[serde(default = "default_layer_up")]
    pub layer_up: PathBuf,
    #[serde(default = "default_layer_down")]
    pub layer_down: PathBuf,
    #[serde(default = "default_caps_word_on")]
    pub caps_word_on: PathBuf,
    #[serde(default = "default_caps_word_off")]
    pub caps_word_off: PathBuf,
    #[serde(default = "default_program_start")]
    pub program_start: PathBuf,
    #[serde(default = "default_program_exit")]
    pub program_exit: PathBuf,
    #[serde(default = "default_error")]
    pub error: PathBuf,
    #[serde(default = "default_keyboard_connect")]
    pub keyboard_connect: PathBuf,
    #[serde(default = "default_keyboard_disconnect")]
    pub keyboard_disconnect: PathBuf,
}

/// Per-cue on/off switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnabledSounds {
    #[serde(default = "default_true")]
    pub layer_up: bool,
    #[serde(default = "default_true")]
    pub layer_down: bool,
    #[serde(default = "default_true")]
    pub caps_word_on: bool,
    #[serde(default = "default_true")]
    pub caps_word_off: bool,
    #[serde(default = "default_true")]
    pub program_start: bool,
    #[serde(default = "default_true")]
    pub program_exit: bool,
    #[serde(default = "default_true")]
    pub error: bool,
    #[serde(default = "default_true")]
    pub keyboard_connect: bool,
    #[serde(default = "default_true")]
    pub keyboard_disconnect: bool,
}

/// Log level and log file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_vid() -> u16 {
    0x1234
}
fn default_pid() -> u16 {
    0x5678
}
fn default_usage_page() -> u16 {
    0xFF60
}
fn default_usage() -> u16 {
    0x61
}
fn default_volume() -> f32 {
    0.5
}
fn default_player() -> String {
    "paplay".to_string()
}
fn default_player_args() -> Vec<String> {
    vec!["--volume={pa_volume}".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> PathBuf {
    PathBuf::from("a11y-hid-watcher.log")
}

fn sound_path(cue: Cue) -> PathBuf {
    PathBuf::from(format!("sounds/{}.wav", cue.key()))
}
fn default_layer_up() -> PathBuf {
    sound_path(Cue::LayerUp)
}
fn default_layer_down() -> PathBuf {
    sound_path(Cue::LayerDown)
}
fn default_caps_word_on() -> PathBuf {
    sound_path(Cue::CapsWordOn)
}
fn default_caps_word_off() -> PathBuf {
    sound_path(Cue::CapsWordOff)
}
fn default_program_start() -> PathBuf {
    sound_path(Cue::ProgramStart)
}
fn default_program_exit() -> PathBuf {
    sound_path(Cue::ProgramExit)
}
fn default_error() -> PathBuf {
    sound_path(Cue::Error)
}
fn default_keyboard_connect() -> PathBuf {
    sound_path(Cue::KeyboardConnect)
}
fn default_keyboard_disconnect() -> PathBuf {
    sound_path(Cue::KeyboardDisconnect)
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vid: default_vid(),
            pid: default_pid(),
            usage_page: default_usage_page(),
            usage: default_usage(),
        }
    }
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            player: default_player(),
            player_args: default_player_args(),
            layer_up: default_layer_up(),
            layer_down: default_layer_down(),
            caps_word_on: default_caps_word_on(),
            caps_word_off: default_caps_word_off(),
            program_start: default_program_start(),
            program_exit: default_program_exit(),
            error: default_error(),
            keyboard_connect: default_keyboard_connect(),
            keyboard_disconnect: default_keyboard_disconnect(),
        }
    }
}

impl Default for EnabledSounds {
    fn default() -> Self {
        Self {
            layer_up: true,
            layer_down: true,
            caps_word_on: true,
            caps_word_off: true,
            program_start: true,
            program_exit: true,
            error: true,
            keyboard_connect: true,
            keyboard_disconnect: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

// ── Lookups ───────────────────────────────────────────────────────────────────

impl SoundsConfig {
    /// Sound file configured for `cue`.
    pub fn path_for(&self, cue: Cue) -> &Path {
        match cue {
            Cue::LayerUp => &self.layer_up,
            Cue::LayerDown => &self.layer_down,
            Cue::CapsWordOn => &self.caps_word_on,
            Cue::CapsWordOff => &self.caps_word_off,
            Cue::ProgramStart => &self.program_start,
            Cue::ProgramExit => &self.program_exit,
            Cue::Error => &self.error,
            Cue::KeyboardConnect => &self.keyboard_connect,
            Cue::KeyboardDisconnect => &self.keyboard_disconnect,
        }
    }
}

impl EnabledSounds {
    pub fn is_enabled(&self, cue: Cue) -> bool {
        match cue {
            Cue::LayerUp => self.layer_up,
            Cue::LayerDown => self.layer_down,
            Cue::CapsWordOn => self.caps_word_on,
            Cue::CapsWordOff => self.caps_word_off,
            Cue::ProgramStart => self.program_start,
            Cue::ProgramExit => self.program_exit,
            Cue::Error => self.error,
            Cue::KeyboardConnect => self.keyboard_connect,
            Cue::KeyboardDisconnect => self.keyboard_disconnect,
        }
    }
}

impl WatcherConfig {
    /// Checks values serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVolume`] when the volume is outside
    /// 0.0..=1.0 (or NaN).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.sounds.volume) {
            return Err(ConfigError::InvalidVolume(self.sounds.volume));
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Reads, parses, and validates the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist), [`ConfigError::Parse`] for malformed TOML, and
/// [`ConfigError::InvalidVolume`] for an out-of-range volume.
pub fn load_config(path: &Path) -> Result<WatcherConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: WatcherConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Writes [`DEFAULT_CONFIG`] to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
