//! Application layer for the watcher.
//!
//! Use cases orchestrate the domain types and talk to the outside world only
//! through the traits declared here ([`watch::DeviceOpener`],
//! [`watch::ReportWriter`], [`play_cues::CuePlayer`]).  Concrete adapters
//! live in `infrastructure`.

pub mod interpret_events;
pub mod play_cues;
pub mod watch;
