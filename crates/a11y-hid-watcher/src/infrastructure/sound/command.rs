//! Plays cues by starting an external audio player.
//!
//! The player program (default `paplay`) is started with the configured
//! arguments followed by the WAV path.  Two placeholders are expanded in
//! each argument:
//!
//! | Placeholder   | Value                                  |
//! |---------------|----------------------------------------|
//! | `{volume}`    | configured volume, `0.00` to `1.00`    |
//! | `{pa_volume}` | PulseAudio scale, `0` to `65536`       |
//!
//! The child is not awaited; Tokio reaps it in the background once it
//! exits.  Must be called from within a Tokio runtime.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::application::play_cues::{CuePlayer, SoundError};
use crate::domain::{Cue, SoundsConfig};

/// PulseAudio's "100 %" volume.
const PA_VOLUME_NORM: f32 = 65536.0;

#[derive(Debug, Clone)]
pub struct CommandCuePlayer {
    program: String,
    args: Vec<String>,
}

impl CommandCuePlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(sounds: &SoundsConfig) -> Self {
        Self::new(sounds.player.clone(), sounds.player_args.clone())
    }

    /// Arguments for one invocation, before the file path.
    pub fn expand_args(&self, volume: f32) -> Vec<String> {
        let pa_volume = (volume * PA_VOLUME_NORM).round() as u32;
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{pa_volume}", &pa_volume.to_string())
                    .replace("{volume}", &format!("{volume:.2}"))
            })
            .collect()
    }
}

impl CuePlayer for CommandCuePlayer {
    fn play(&self, _cue: Cue, path: &Path, volume: f32) -> Result<(), SoundError> {
        if !path.exists() {
            return Err(SoundError::MissingFile(path.to_path_buf()));
        }

        Command::new(&self.program)
            .args(self.expand_args(volume))
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SoundError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_args_substitutes_both_scales() {
        let player = CommandCuePlayer::new(
            "paplay",
            vec!["--volume={pa_volume}".into(), "-v{volume}".into(), "--raw".into()],
        );

        assert_eq!(
            player.expand_args(0.5),
            vec!["--volume=32768", "-v0.50", "--raw"]
        );
    }

    #[test]
    fn test_missing_file_is_reported_before_spawning() {
        let player = CommandCuePlayer::new("definitely-not-a-player", Vec::new());

        let result = player.play(Cue::Error, Path::new("/nonexistent/error.wav"), 1.0);

        assert!(matches!(result, Err(SoundError::MissingFile(_))));
    }

    #[tokio::test]
    async fn test_unknown_program_is_spawn_error() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let player = CommandCuePlayer::new("definitely-not-a-player-a11y", Vec::new());

        let result = player.play(Cue::LayerUp, file.path(), 0.5);

        assert!(matches!(result, Err(SoundError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_program_is_started() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        let player = CommandCuePlayer::new("true", Vec::new());

        assert!(player.play(Cue::LayerUp, file.path(), 0.5).is_ok());
    }
}
