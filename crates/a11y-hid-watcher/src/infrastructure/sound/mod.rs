//! Cue playback adapters.

pub mod command;
pub mod mock;

pub use command::CommandCuePlayer;
pub use mock::RecordingCuePlayer;
