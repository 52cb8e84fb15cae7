//! # a11y-hid-core
//!
//! Shared library for the accessibility raw HID channel: the 32-byte report
//! codec spoken by keyboard and host, and the keyboard-side notifier that
//! turns layer and Caps Word hooks into reports.
//!
//! It has zero dependencies on OS APIs, USB stacks, or timers.  The firmware
//! supplies those through the small capability traits in [`notifier`].
//!
//! # Architecture overview
//!
//! The keyboard firmware owns the USB transport, the layer stack, and the
//! millisecond timer.  This crate sits between those pieces and the host:
//!
//! - **`protocol`** – How bytes travel over the raw HID channel.  Every
//!   report is exactly 32 bytes, byte 0 is the event type and byte 1 the
//!   payload; the rest is zero padding.
//!
//! - **`notifier`** – The [`EventNotifier`]: edge detection over the last
//!   reported layer and Caps Word state, a debounce window on the layer path,
//!   and the handler for the single inbound "query current layer" command.
//!
//! The host side (`a11y-hid-watcher`) decodes the same reports with
//! [`decode_report`].

pub mod notifier;
pub mod protocol;

pub use notifier::{Clock, EventNotifier, LayerState, NotifierConfig, SendOutcome, Transport};
pub use protocol::report::{
    decode_report, encode_command, encode_report, parse_command, Command, ProtocolError, Report,
    REPORT_SIZE,
};
