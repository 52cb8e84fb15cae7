//! Turns raw reports from the keyboard into cues.
//!
//! The first layer value seen after connecting is only a baseline: the user
//! did not change anything, so no cue plays.  After that a higher layer
//! cues [`Cue::LayerUp`] and a lower one [`Cue::LayerDown`].

use a11y_hid_core::{decode_report, ProtocolError, Report};
use tracing::{debug, info, warn};

use crate::domain::Cue;

/// Layer bookkeeping for one watcher session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatcherState {
    previous_layer: Option<u8>,
    current_layer: Option<u8>,
    initial_layer_retrieved: bool,
}

impl WatcherState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one packet read from the device and returns the cue it
    /// deserves, if any.  Malformed packets are logged and dropped.
    pub fn handle_packet(&mut self, data: &[u8]) -> Option<Cue> {
        debug!(?data, "received HID event");
        match decode_report(data) {
            Ok(report) => self.apply(report),
            Err(ProtocolError::InvalidLength(len)) => {
                warn!("unexpected HID event data length: {len}");
                None
            }
            Err(e) => {
                warn!("invalid HID event data: {e}");
                None
            }
        }
    }

    /// Applies an already decoded report.
    pub fn apply(&mut self, report: Report) -> Option<Cue> {
        match report {
            Report::LayerChange(layer) => self.layer_changed(layer),
            Report::CurrentLayer(layer) => {
                info!("current layer: {layer}");
                self.layer_changed(layer)
            }
            Report::CapsWord(true) => {
                info!("caps word on");
                Some(Cue::CapsWordOn)
            }
            Report::CapsWord(false) => {
                info!("caps word off");
                Some(Cue::CapsWordOff)
            }
        }
    }

    fn layer_changed(&mut self, layer: u8) -> Option<Cue> {
        self.previous_layer = self.current_layer;
        self.current_layer = Some(layer);
        info!(from = ?self.previous_layer, to = layer, "layer changed");

        if !self.initial_layer_retrieved {
            self.initial_layer_retrieved = true;
            return None;
        }

        match self.previous_layer {
            Some(previous) if layer > previous => Some(Cue::LayerUp),
            Some(previous) if layer < previous => Some(Cue::LayerDown),
            _ => None,
        }
    }

    /// Forgets the baseline so the layer reported after a reconnect does not
    /// cue against a value from the previous session.
    pub fn on_reconnect(&mut self) {
        self.initial_layer_retrieved = false;
    }

    pub fn current_layer(&self) -> Option<u8> {
        self.current_layer
    }

    pub fn previous_layer(&self) -> Option<u8> {
        self.previous_layer
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
