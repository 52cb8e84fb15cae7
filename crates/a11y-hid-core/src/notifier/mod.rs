//! Keyboard-side event notifier.
//!
//! The firmware calls into an [`EventNotifier`] from its own hooks:
//!
//! - the layer-state hook calls [`EventNotifier::send_layer_change`],
//! - the Caps Word hook calls [`EventNotifier::send_caps_word_on`] /
//!   [`EventNotifier::send_caps_word_off`],
//! - the raw HID receive callback calls [`EventNotifier::handle_command`].
//!
//! The notifier never starts I/O on its own.  Every operation runs to
//! completion on the caller's thread and writes at most one report.
//!
//! # Edge detection
//!
//! The notifier remembers the last layer and Caps Word state it actually
//! transmitted and only reports changes against those values.  A suppressed
//! call never updates them, so the next hook invocation carrying the current
//! value will be reported.
//!
//! # Debounce
//!
//! Layer changes are rate limited: a call arriving less than
//! [`NotifierConfig::debounce_ms`] after the previous non-suppressed call is
//! dropped outright, even when the layer really changed.  Suppressed calls do
//! not move the window.  Caps Word reports are not rate limited.
//!
//! # Threading
//!
//! All methods take `&mut self`; the notifier holds no locks.  Firmware that
//! calls it from an interrupt context must wrap it in its own critical
//! section.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::report::{encode_report, parse_command, Command, Report, REPORT_SIZE};

/// Layer value meaning "nothing reported yet".  Real layer indices never
/// reach it in practice, so the first layer change is always transmitted.
pub const UNSET_LAYER: u8 = 255;

/// Default debounce window for layer change reports, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u32 = 200;

// ── Capability traits ─────────────────────────────────────────────────────────

/// Outbound raw HID channel.
///
/// Writes are fire-and-forget: the firmware's raw HID send primitive gives
/// no delivery confirmation, so neither does this trait.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Queues one 32-byte report for the host.
    fn send(&mut self, report: &[u8; REPORT_SIZE]);
}

/// Monotonic millisecond timer.  The counter may wrap.
pub trait Clock {
    /// Returns the current timer value in milliseconds.
    fn now_ms(&self) -> u32;
}

/// Live view of the firmware's layer stack.
#[cfg_attr(test, mockall::automock)]
pub trait LayerState {
    /// Returns the index of the topmost active layer.
    fn highest_layer(&self) -> u8;
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Construction-time options for an [`EventNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Whether the keyboard has Caps Word.  When `false` the Caps Word
    /// operations report [`SendOutcome::Unsupported`] and never transmit.
    #[serde(default = "default_true")]
    pub caps_word: bool,
    /// Emit a diagnostic line for every transmitted report.  Has no effect
    /// on what is sent or when.
    #[serde(default)]
    pub console: bool,
    /// Minimum gap between two effective layer change calls.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_true() -> bool {
    true
}
fn default_debounce_ms() -> u32 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            caps_word: default_true(),
            console: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What a notifier call did.  None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Exactly one report was written to the transport.
    Sent,
    /// The layer change arrived inside the debounce window and was dropped.
    Debounced,
    /// The value equals the last reported one; nothing to send.
    Unchanged,
    /// The inbound packet is not a known command.
    Ignored,
    /// Caps Word is disabled for this notifier.
    Unsupported,
}

// ── Notifier ──────────────────────────────────────────────────────────────────

/// Forwards layer and Caps Word changes to the host and answers layer queries.
pub struct EventNotifier<T, C, L> {
    transport: T,
    clock: C,
    layers: L,
    config: NotifierConfig,
    /// Last layer actually transmitted.
    previous_layer: u8,
    /// Last Caps Word state actually transmitted; `None` when unsupported.
    caps_word: Option<bool>,
    /// Timer value of the last layer change call that passed the debounce
    /// check; `None` until the first one.
    last_send_ms: Option<u32>,
}

impl<T: Transport, C: Clock, L: LayerState> EventNotifier<T, C, L> {
    /// Creates a notifier in its startup state: no layer reported yet and
    /// Caps Word off.
    pub fn new(transport: T, clock: C, layers: L, config: NotifierConfig) -> Self {
        let caps_word = config.caps_word.then_some(false);
        Self {
            transport,
            clock,
            layers,
            config,
            previous_layer: UNSET_LAYER,
            caps_word,
            last_send_ms: None,
        }
    }

    /// Reports a layer change to the host, subject to debounce and edge
    /// detection.
    pub fn send_layer_change(&mut self, layer: u8) -> SendOutcome {
        let now = self.clock.now_ms();

        if let Some(last) = self.last_send_ms {
            if now.wrapping_sub(last) < self.config.debounce_ms {
                if self.config.console {
                    debug!(layer, elapsed_ms = now.wrapping_sub(last), "layer change debounced");
                }
                return SendOutcome::Debounced;
            }
        }

        let outcome = if layer != self.previous_layer {
            self.transmit(Report::LayerChange(layer));
            self.previous_layer = layer;
            if self.config.console {
                debug!(layer, "sent layer change event");
            }
            SendOutcome::Sent
        } else {
            SendOutcome::Unchanged
        };

        self.last_send_ms = Some(now);
        outcome
    }

    /// Reports that Caps Word switched on, unless that was already reported.
    pub fn send_caps_word_on(&mut self) -> SendOutcome {
        self.send_caps_word(true)
    }

    /// Reports that Caps Word switched off, unless that was already reported.
    pub fn send_caps_word_off(&mut self) -> SendOutcome {
        self.send_caps_word(false)
    }

    fn send_caps_word(&mut self, on: bool) -> SendOutcome {
        match self.caps_word {
            None => SendOutcome::Unsupported,
            Some(current) if current == on => SendOutcome::Unchanged,
            Some(_) => {
                self.transmit(Report::CapsWord(on));
                self.caps_word = Some(on);
                if self.config.console {
                    debug!(on, "sent Caps Word event");
                }
                SendOutcome::Sent
            }
        }
    }

    /// Handles one packet received on the raw HID channel.
    ///
    /// A layer query is answered immediately with the live highest layer
    /// from [`LayerState`], not with the last reported layer.  Anything else
    /// is ignored without a reply.
    pub fn handle_command(&mut self, packet: &[u8]) -> SendOutcome {
        match parse_command(packet) {
            Some(Command::QueryLayer) => {
                let layer = self.layers.highest_layer();
                self.transmit(Report::CurrentLayer(layer));
                if self.config.console {
                    debug!(layer, "sent current layer");
                }
                SendOutcome::Sent
            }
            None => SendOutcome::Ignored,
        }
    }

    fn transmit(&mut self, report: Report) {
        self.transport.send(&encode_report(&report));
    }

    /// Last layer transmitted, or [`UNSET_LAYER`] before the first one.
    pub fn previous_layer(&self) -> u8 {
        self.previous_layer
    }

    /// Last Caps Word state transmitted; `None` when Caps Word is disabled.
    pub fn caps_word(&self) -> Option<bool> {
        self.caps_word
    }

    /// Timer value recorded by the last layer change call that passed the
    /// debounce check.
    pub fn last_send_ms(&self) -> Option<u32> {
        self.last_send_ms
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn layers_mut(&mut self) -> &mut L {
        &mut self.layers
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    // ── Fakes ─────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<[u8; REPORT_SIZE]>,
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, report: &[u8; REPORT_SIZE]) {
            self.sent.push(*report);
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u32>>);

    impl ManualClock {
        fn set(&self, ms: u32) {
            self.0.set(ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    struct FixedLayer(u8);

    impl LayerState for FixedLayer {
        fn highest_layer(&self) -> u8 {
            self.0
        }
    }

    fn make_notifier(
        config: NotifierConfig,
    ) -> (EventNotifier<RecordingTransport, ManualClock, FixedLayer>, ManualClock) {
        let clock = ManualClock::default();
        let notifier = EventNotifier::new(
            RecordingTransport::default(),
            clock.clone(),
            FixedLayer(0),
            config,
        );
        (notifier, clock)
    }

    fn heads(notifier: &EventNotifier<RecordingTransport, ManualClock, FixedLayer>) -> Vec<[u8; 2]> {
        notifier
            .transport()
            .sent
            .iter()
            .map(|r| [r[0], r[1]])
            .collect()
    }

    // ── Startup state ─────────────────────────────────────────────────────────

    #[test]
    fn test_new_notifier_starts_unset() {
        let (notifier, _) = make_notifier(NotifierConfig::default());

        assert_eq!(notifier.previous_layer(), UNSET_LAYER);
        assert_eq!(notifier.caps_word(), Some(false));
        assert_eq!(notifier.last_send_ms(), None);
    }

    #[test]
    fn test_caps_word_disabled_has_no_state() {
        let config = NotifierConfig {
            caps_word: false,
            ..Default::default()
        };
        let (notifier, _) = make_notifier(config);

        assert_eq!(notifier.caps_word(), None);
    }

    // ── Layer change ──────────────────────────────────────────────────────────

    #[test]
    fn test_first_layer_change_is_sent() {
        // Arrange
        let (mut notifier, _) = make_notifier(NotifierConfig::default());

        // Act
        let outcome = notifier.send_layer_change(0);

        // Assert
        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(heads(&notifier), vec![[1, 0]]);
        assert_eq!(notifier.previous_layer(), 0);
    }

    #[test]
    fn test_layer_change_inside_window_is_dropped() {
        // Arrange
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(1);

        // Act
        clock.set(150);
        let outcome = notifier.send_layer_change(2);

        // Assert
        assert_eq!(outcome, SendOutcome::Debounced);
        assert_eq!(heads(&notifier), vec![[1, 1]]);
        assert_eq!(notifier.previous_layer(), 1, "suppressed value must not be recorded");
    }

    #[test]
    fn test_layer_change_after_window_is_sent() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(1);
        clock.set(150);
        notifier.send_layer_change(2);

        clock.set(210);
        let outcome = notifier.send_layer_change(3);

        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(heads(&notifier), vec![[1, 1], [1, 3]]);
    }

    #[test]
    fn test_debounced_call_does_not_move_window() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(1);

        clock.set(150);
        notifier.send_layer_change(2);

        assert_eq!(notifier.last_send_ms(), Some(0));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(1);

        clock.set(199);
        assert_eq!(notifier.send_layer_change(2), SendOutcome::Debounced);
        clock.set(200);
        assert_eq!(notifier.send_layer_change(2), SendOutcome::Sent);
    }

    #[test]
    fn test_unchanged_layer_still_moves_window() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(4);

        clock.set(300);
        let outcome = notifier.send_layer_change(4);

        assert_eq!(outcome, SendOutcome::Unchanged);
        assert_eq!(notifier.last_send_ms(), Some(300));
        assert_eq!(notifier.transport().sent.len(), 1);
    }

    #[test]
    fn test_clock_wraparound_does_not_panic() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        clock.set(u32::MAX - 50);
        notifier.send_layer_change(1);

        // 100 ms later across the wrap: still inside the window.
        clock.set(49);
        assert_eq!(notifier.send_layer_change(2), SendOutcome::Debounced);

        clock.set(250);
        assert_eq!(notifier.send_layer_change(2), SendOutcome::Sent);
    }

    #[test]
    fn test_custom_debounce_window() {
        let config = NotifierConfig {
            debounce_ms: 0,
            ..Default::default()
        };
        let (mut notifier, _) = make_notifier(config);

        notifier.send_layer_change(1);
        notifier.send_layer_change(2);

        assert_eq!(heads(&notifier), vec![[1, 1], [1, 2]]);
    }

    // ── Caps Word ─────────────────────────────────────────────────────────────

    #[test]
    fn test_caps_word_on_is_idempotent() {
        let (mut notifier, _) = make_notifier(NotifierConfig::default());

        assert_eq!(notifier.send_caps_word_on(), SendOutcome::Sent);
        assert_eq!(notifier.send_caps_word_on(), SendOutcome::Unchanged);

        assert_eq!(heads(&notifier), vec![[2, 1]]);
    }

    #[test]
    fn test_caps_word_off_at_startup_is_noop() {
        let (mut notifier, _) = make_notifier(NotifierConfig::default());

        assert_eq!(notifier.send_caps_word_off(), SendOutcome::Unchanged);
        assert!(notifier.transport().sent.is_empty());
    }

    #[test]
    fn test_caps_word_reports_only_edges() {
        let (mut notifier, _) = make_notifier(NotifierConfig::default());

        notifier.send_caps_word_on();
        notifier.send_caps_word_on();
        notifier.send_caps_word_off();
        notifier.send_caps_word_off();
        notifier.send_caps_word_on();

        assert_eq!(heads(&notifier), vec![[2, 1], [2, 0], [2, 1]]);
    }

    #[test]
    fn test_caps_word_ignores_layer_debounce() {
        let (mut notifier, clock) = make_notifier(NotifierConfig::default());
        notifier.send_layer_change(1);

        clock.set(10);
        let outcome = notifier.send_caps_word_on();

        assert_eq!(outcome, SendOutcome::Sent);
    }

    #[test]
    fn test_caps_word_unsupported_sends_nothing() {
        let config = NotifierConfig {
            caps_word: false,
            ..Default::default()
        };
        let (mut notifier, _) = make_notifier(config);

        assert_eq!(notifier.send_caps_word_on(), SendOutcome::Unsupported);
        assert_eq!(notifier.send_caps_word_off(), SendOutcome::Unsupported);
        assert!(notifier.transport().sent.is_empty());
    }

    // ── Inbound commands (mockall) ────────────────────────────────────────────

    #[test]
    fn test_query_answers_with_live_layer() {
        // Arrange
        let mut transport = MockTransport::new();
        let mut expected = [0u8; REPORT_SIZE];
        expected[0] = 99;
        expected[1] = 3;
        transport
            .expect_send()
            .withf(move |report| *report == expected)
            .times(1)
            .return_const(());

        let mut layers = MockLayerState::new();
        layers.expect_highest_layer().times(1).return_const(3u8);

        let mut notifier = EventNotifier::new(
            transport,
            ManualClock::default(),
            layers,
            NotifierConfig::default(),
        );

        // Act
        let mut packet = [0u8; REPORT_SIZE];
        packet[0] = 99;
        let outcome = notifier.handle_command(&packet);

        // Assert
        assert_eq!(outcome, SendOutcome::Sent);
        assert_eq!(notifier.previous_layer(), UNSET_LAYER, "query must not touch reported layer");
    }

    #[test]
    fn test_unknown_command_sends_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let mut layers = MockLayerState::new();
        layers.expect_highest_layer().never();

        let mut notifier = EventNotifier::new(
            transport,
            ManualClock::default(),
            layers,
            NotifierConfig::default(),
        );

        assert_eq!(notifier.handle_command(&[7, 0]), SendOutcome::Ignored);
        assert_eq!(notifier.handle_command(&[]), SendOutcome::Ignored);
    }

    #[test]
    fn test_notifier_config_defaults_from_empty_toml() {
        let config: NotifierConfig = toml::from_str("").expect("deserialize");

        assert_eq!(config, NotifierConfig::default());
        assert_eq!(config.debounce_ms, 200);
        assert!(config.caps_word);
        assert!(!config.console);
    }
}
