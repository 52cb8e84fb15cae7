//! Raw HID report codec shared by the keyboard and the host watcher.
//!
//! Wire format (both directions):
//! ```text
//! [event_type:1][payload:1][zero padding:30]
//! ```
//! Every report is exactly [`REPORT_SIZE`] bytes.  Only bytes 0 and 1 carry
//! information; the padding is written as zeros and ignored on decode.
//!
//! | Type | Direction        | Payload            |
//! |------|------------------|--------------------|
//! | 1    | keyboard → host  | new layer number   |
//! | 2    | keyboard → host  | Caps Word 1 / 0    |
//! | 99   | host → keyboard  | ignored (query)    |
//! | 99   | keyboard → host  | current layer      |

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Size of every raw HID report, in bytes.
pub const REPORT_SIZE: usize = 32;

/// Errors that can occur while decoding a report received from the keyboard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer is not exactly one report long.
    #[error("invalid report length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    /// Byte 0 is not a known event type.
    #[error("unknown event type: {0}")]
    UnknownEventType(u8),

    /// A Caps Word report carried something other than 0 or 1.
    #[error("invalid Caps Word state byte: {0}")]
    InvalidCapsWordState(u8),
}

// ── Event type codes ──────────────────────────────────────────────────────────

/// Discriminant stored in byte 0 of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    LayerChange = 1,
    CapsWord = 2,
    CurrentLayer = 99,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            1 => Ok(EventType::LayerChange),
            2 => Ok(EventType::CapsWord),
            99 => Ok(EventType::CurrentLayer),
            _ => Err(()),
        }
    }
}

// ── Typed reports ─────────────────────────────────────────────────────────────

/// A decoded keyboard → host report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Report {
    /// The highest active layer changed to the given index.
    LayerChange(u8),
    /// Caps Word was switched on (`true`) or off (`false`).
    CapsWord(bool),
    /// Reply to [`Command::QueryLayer`] carrying the live highest layer.
    CurrentLayer(u8),
}

impl Report {
    /// Returns the event type discriminant written to byte 0.
    pub fn event_type(&self) -> EventType {
        match self {
            Report::LayerChange(_) => EventType::LayerChange,
            Report::CapsWord(_) => EventType::CapsWord,
            Report::CurrentLayer(_) => EventType::CurrentLayer,
        }
    }

    fn payload(&self) -> u8 {
        match *self {
            Report::LayerChange(layer) | Report::CurrentLayer(layer) => layer,
            Report::CapsWord(on) => u8::from(on),
        }
    }
}

/// A host → keyboard command.
///
/// The command set is closed: anything else on byte 0 is ignored by the
/// keyboard without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Ask the keyboard for its current highest layer.
    QueryLayer,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `report` into a zero-filled 32-byte buffer.
///
/// # Examples
///
/// ```rust
/// use a11y_hid_core::{encode_report, Report};
///
/// let bytes = encode_report(&Report::LayerChange(3));
/// assert_eq!(&bytes[..2], &[1, 3]);
/// assert!(bytes[2..].iter().all(|&b| b == 0));
/// ```
pub fn encode_report(report: &Report) -> [u8; REPORT_SIZE] {
    let mut buf = [0u8; REPORT_SIZE];
    buf[0] = report.event_type() as u8;
    buf[1] = report.payload();
    buf
}

/// Decodes one keyboard → host report.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the buffer is not exactly [`REPORT_SIZE`]
/// bytes, byte 0 is not a known event type, or a Caps Word state is not 0/1.
pub fn decode_report(bytes: &[u8]) -> Result<Report, ProtocolError> {
    if bytes.len() != REPORT_SIZE {
        return Err(ProtocolError::InvalidLength(bytes.len()));
    }

    let event_type =
        EventType::try_from(bytes[0]).map_err(|_| ProtocolError::UnknownEventType(bytes[0]))?;
    let payload = bytes[1];

    match event_type {
        EventType::LayerChange => Ok(Report::LayerChange(payload)),
        EventType::CurrentLayer => Ok(Report::CurrentLayer(payload)),
        EventType::CapsWord => match payload {
            0 => Ok(Report::CapsWord(false)),
            1 => Ok(Report::CapsWord(true)),
            other => Err(ProtocolError::InvalidCapsWordState(other)),
        },
    }
}

/// Encodes a host → keyboard command into a zero-filled 32-byte buffer.
pub fn encode_command(command: Command) -> [u8; REPORT_SIZE] {
    let mut buf = [0u8; REPORT_SIZE];
    match command {
        Command::QueryLayer => buf[0] = EventType::CurrentLayer as u8,
    }
    buf
}

/// Interprets an inbound packet on the keyboard side.
///
/// Only byte 0 is inspected; the declared length is not validated because
/// the firmware hands over whatever the transport delivered.  Returns `None`
/// for an empty buffer or an unrecognised command byte.
pub fn parse_command(bytes: &[u8]) -> Option<Command> {
    match bytes.first() {
        Some(&b) if b == EventType::CurrentLayer as u8 => Some(Command::QueryLayer),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_change_report_layout() {
        let bytes = encode_report(&Report::LayerChange(5));

        assert_eq!(bytes.len(), REPORT_SIZE);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 5);
        assert!(bytes[2..].iter().all(|&b| b == 0), "padding must be zero");
    }

    #[test]
    fn test_caps_word_report_layout() {
        assert_eq!(&encode_report(&Report::CapsWord(true))[..2], &[2, 1]);
        assert_eq!(&encode_report(&Report::CapsWord(false))[..2], &[2, 0]);
    }

    #[test]
    fn test_current_layer_report_layout() {
        let bytes = encode_report(&Report::CurrentLayer(3));

        let mut expected = [0u8; REPORT_SIZE];
        expected[0] = 99;
        expected[1] = 3;
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let result = decode_report(&[1, 2, 3]);

        assert_eq!(result, Err(ProtocolError::InvalidLength(3)));
    }

    #[test]
    fn test_decode_rejects_long_buffer() {
        let result = decode_report(&[0u8; REPORT_SIZE + 1]);

        assert_eq!(result, Err(ProtocolError::InvalidLength(REPORT_SIZE + 1)));
    }

    #[test]
    fn test_decode_rejects_unknown_event_type() {
        let mut bytes = [0u8; REPORT_SIZE];
        bytes[0] = 7;

        assert_eq!(decode_report(&bytes), Err(ProtocolError::UnknownEventType(7)));
    }

    #[test]
    fn test_decode_rejects_invalid_caps_word_state() {
        let mut bytes = [0u8; REPORT_SIZE];
        bytes[0] = 2;
        bytes[1] = 9;

        assert_eq!(
            decode_report(&bytes),
            Err(ProtocolError::InvalidCapsWordState(9))
        );
    }

    #[test]
    fn test_decode_ignores_padding_contents() {
        let mut bytes = [0xFFu8; REPORT_SIZE];
        bytes[0] = 1;
        bytes[1] = 4;

        assert_eq!(decode_report(&bytes), Ok(Report::LayerChange(4)));
    }

    #[test]
    fn test_encode_query_command() {
        let bytes = encode_command(Command::QueryLayer);

        assert_eq!(bytes[0], 99);
        assert!(bytes[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_parse_command_inspects_only_first_byte() {
        assert_eq!(parse_command(&[99]), Some(Command::QueryLayer));
        assert_eq!(parse_command(&[99, 7, 7, 7]), Some(Command::QueryLayer));
        assert_eq!(parse_command(&[7, 0]), None);
        assert_eq!(parse_command(&[]), None);
    }

    #[test]
    fn test_event_type_try_from_unknown_returns_err() {
        assert!(EventType::try_from(0).is_err());
        assert!(EventType::try_from(100).is_err());
        assert_eq!(EventType::try_from(2), Ok(EventType::CapsWord));
    }
}
