//! Protocol module containing the raw HID report types and codec.

pub mod report;

pub use report::*;
