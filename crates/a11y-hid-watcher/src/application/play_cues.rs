//! CueDispatcher: decides whether and what to play for a [`Cue`].
//!
//! The dispatcher applies the `[enabled_sounds]` switches and resolves the
//! sound file from `[sounds]`, then hands off to a [`CuePlayer`] trait
//! object.  Playback is fire-and-forget: the watcher never waits for a
//! sound to finish.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::{Cue, EnabledSounds, SoundsConfig};

/// Error type for cue playback.
#[derive(Debug, Error)]
pub enum SoundError {
    /// The configured sound file is not on disk.
    #[error("sound file does not exist: {0}")]
    MissingFile(PathBuf),

    /// The player program could not be started.
    #[error("failed to start player {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Plays a sound file.  Implementations must not block until playback ends.
#[cfg_attr(test, mockall::automock)]
pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: Cue, path: &Path, volume: f32) -> Result<(), SoundError>;
}

/// What happened to a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOutcome {
    Played,
    Disabled,
}

/// Routes cues to the player according to the sound configuration.
pub struct CueDispatcher {
    sounds: SoundsConfig,
    enabled: EnabledSounds,
    player: Arc<dyn CuePlayer>,
}

impl CueDispatcher {
    pub fn new(sounds: SoundsConfig, enabled: EnabledSounds, player: Arc<dyn CuePlayer>) -> Self {
        Self {
            sounds,
            enabled,
            player,
        }
    }

    /// Plays `cue` unless it is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`SoundError`] if the player fails to start.
    pub fn dispatch(&self, cue: Cue) -> Result<CueOutcome, SoundError> {
        let path = self.sounds.path_for(cue);
        if !self.enabled.is_enabled(cue) {
            debug!("sound playback disabled for {cue}: {}", path.display());
            return Ok(CueOutcome::Disabled);
        }

        info!("playing {cue}: {}", path.display());
        self.player.play(cue, path, self.sounds.volume)?;
        Ok(CueOutcome::Played)
    }

    /// Like [`dispatch`](Self::dispatch) but logs failures instead of
    /// returning them.  A sound that fails to play never stops the watcher.
    pub fn play(&self, cue: Cue) {
        if let Err(e) = self.dispatch(cue) {
            error!("error playing {cue}: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_cue_is_played_with_configured_path_and_volume() {
        // Arrange
        let mut sounds = SoundsConfig::default();
        sounds.volume = 0.25;
        sounds.layer_up = PathBuf::from("/tmp/up.wav");

        let mut player = MockCuePlayer::new();
        player
            .expect_play()
            .withf(|cue, path, volume| {
                *cue == Cue::LayerUp && path == Path::new("/tmp/up.wav") && *volume == 0.25
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let dispatcher = CueDispatcher::new(sounds, EnabledSounds::default(), Arc::new(player));

        // Act
        let outcome = dispatcher.dispatch(Cue::LayerUp);

        // Assert
        assert_eq!(outcome.expect("dispatch"), CueOutcome::Played);
    }

    #[test]
    fn test_disabled_cue_never_reaches_player() {
        let mut enabled = EnabledSounds::default();
        enabled.caps_word_off = false;

        let mut player = MockCuePlayer::new();
        player.expect_play().never();

        let dispatcher = CueDispatcher::new(SoundsConfig::default(), enabled, Arc::new(player));

        assert_eq!(
            dispatcher.dispatch(Cue::CapsWordOff).expect("dispatch"),
            CueOutcome::Disabled
        );
    }

    #[test]
    fn test_player_error_is_returned_by_dispatch_and_swallowed_by_play() {
        let mut player = MockCuePlayer::new();
        player
            .expect_play()
            .times(2)
            .returning(|_, path, _| Err(SoundError::MissingFile(path.to_path_buf())));

        let dispatcher = CueDispatcher::new(
            SoundsConfig::default(),
            EnabledSounds::default(),
            Arc::new(player),
        );

        assert!(matches!(
            dispatcher.dispatch(Cue::Error),
            Err(SoundError::MissingFile(_))
        ));
        dispatcher.play(Cue::Error);
    }
}
