//! Raw HID device access.
//!
//! The OS backend is selected at compile time via `#[cfg(target_os = ...)]`.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod hidraw;
