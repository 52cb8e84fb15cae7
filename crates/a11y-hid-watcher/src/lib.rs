//! a11y-hid-watcher library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the watcher do?
//!
//! The keyboard reports layer changes and Caps Word toggles on its raw HID
//! interface.  The watcher runs on the computer the keyboard is plugged into
//! and makes those changes audible:
//!
//! 1. Finds the keyboard's raw HID interface by vendor/product id and usage.
//! 2. Asks the keyboard for its current layer so it has a baseline.
//! 3. Reads 32-byte reports and decides which cue each one deserves
//!    (layer up, layer down, Caps Word on/off).
//! 4. Plays the configured sound for that cue.
//! 5. Reconnects when the keyboard is unplugged and plugged back in.

/// Domain layer: cues and the configuration schema.
pub mod domain;

/// Application layer: report interpretation, cue dispatch, and the run loop.
pub mod application;

/// Infrastructure layer: hidraw access and sound playback.
pub mod infrastructure;
