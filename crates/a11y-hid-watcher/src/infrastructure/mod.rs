//! Infrastructure layer for the watcher.
//!
//! Contains OS-facing adapters for the application-layer traits.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain`,
//! and `a11y_hid_core`, but MUST NOT be imported by the `application` or
//! domain layers.
//!
//! # Sub-modules
//!
//! - **`device`** – `DeviceOpener` implementations.  On Linux the hidraw
//!   backend is selected at compile time using `#[cfg(target_os)]`.  A
//!   `MockDevice` is also provided for tests.
//!
//! - **`sound`** – `CuePlayer` implementations: an external player program
//!   for production and a recorder for tests.

pub mod device;
pub mod sound;
