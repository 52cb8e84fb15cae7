//! Audible cues the watcher can play.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Something worth telling the user about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    LayerUp,
    LayerDown,
    CapsWordOn,
    CapsWordOff,
    ProgramStart,
    ProgramExit,
    Error,
    KeyboardConnect,
    KeyboardDisconnect,
}

impl Cue {
    /// Every cue, in config file order.
    pub const ALL: [Cue; 9] = [
        Cue::LayerUp,
        Cue::LayerDown,
        Cue::CapsWordOn,
        Cue::CapsWordOff,
        Cue::ProgramStart,
        Cue::ProgramExit,
        Cue::Error,
        Cue::KeyboardConnect,
        Cue::KeyboardDisconnect,
    ];

    /// Key used for this cue in the `[sounds]` and `[enabled_sounds]` tables.
    pub fn key(self) -> &'static str {
        match self {
            Cue::LayerUp => "layer_up",
            Cue::LayerDown => "layer_down",
            Cue::CapsWordOn => "caps_word_on",
            Cue::CapsWordOff => "caps_word_off",
            Cue::ProgramStart => "program_start",
            Cue::ProgramExit => "program_exit",
            Cue::Error => "error",
            Cue::KeyboardConnect => "keyboard_connect",
            Cue::KeyboardDisconnect => "keyboard_disconnect",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cue_keys_are_unique() {
        let keys: HashSet<_> = Cue::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(keys.len(), Cue::ALL.len());
    }

    #[test]
    fn test_display_matches_key() {
        assert_eq!(Cue::CapsWordOn.to_string(), "caps_word_on");
    }
}
