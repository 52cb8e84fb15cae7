//! Recording cue player for tests.
//!
//! Each call to `play` is pushed into a `Mutex<Vec<...>>` so assertions can
//! check exactly which cues were played and in what order.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::application::play_cues::{CuePlayer, SoundError};
use crate::domain::Cue;

/// A player that records calls instead of producing sound.
#[derive(Default)]
pub struct RecordingCuePlayer {
    /// Records each (cue, path, volume) passed to `play`.
    pub played: Mutex<Vec<(Cue, PathBuf, f32)>>,
}

impl RecordingCuePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Just the cues, in play order.
    pub fn cues(&self) -> Vec<Cue> {
        self.played.lock().unwrap().iter().map(|(c, _, _)| *c).collect()
    }
}

impl CuePlayer for RecordingCuePlayer {
    fn play(&self, cue: Cue, path: &Path, volume: f32) -> Result<(), SoundError> {
        self.played
            .lock()
            .unwrap()
            .push((cue, path.to_path_buf(), volume));
        Ok(())
    }
}
