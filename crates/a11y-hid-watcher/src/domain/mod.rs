//! Domain types for the watcher: the cue vocabulary and the configuration
//! schema.  Nothing here touches the OS beyond reading the config file.

pub mod config;
pub mod cue;

pub use config::{
    load_config, write_default_config, ConfigError, DeviceConfig, EnabledSounds, LoggingConfig,
    SoundsConfig, WatcherConfig, DEFAULT_CONFIG, DEFAULT_CONFIG_PATH,
};
pub use cue::Cue;
