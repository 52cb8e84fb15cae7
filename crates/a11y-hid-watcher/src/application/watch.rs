//! The watcher run loop: connect, query, listen, reconnect.
//!
//! # Loop shape
//!
//! ```text
//! run()
//!  └─ ProgramStart cue
//!  └─ loop until shutdown
//!       ├─ no device  -> open()  ── ok  -> KeyboardConnect cue, query layer
//!       │                        └─ err -> log, wait reconnect_interval
//!       └─ device     -> next DeviceEvent
//!            ├─ Report(bytes) -> WatcherState -> cue
//!            └─ Lost / channel closed -> KeyboardDisconnect cue, back off
//!  └─ KeyboardDisconnect cue (if connected), ProgramExit cue
//! ```
//!
//! Device reads happen on whatever thread the [`DeviceOpener`] chooses; they
//! arrive here through an `mpsc` channel so the loop can also watch the
//! shutdown signal.

use std::time::Duration;

use a11y_hid_core::{encode_command, Command, REPORT_SIZE};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::application::interpret_events::WatcherState;
use crate::application::play_cues::CueDispatcher;
use crate::domain::{Cue, DeviceConfig};

/// Errors from opening or talking to the keyboard.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No HID interface matched the configured ids and usage.
    #[error(
        "no device matching vid={vid:#06x} pid={pid:#06x} usage_page={usage_page:#06x} usage={usage:#04x}"
    )]
    NotFound {
        vid: u16,
        pid: u16,
        usage_page: u16,
        usage: u16,
    },

    /// An I/O error occurred while opening, reading, or writing.
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped delivering data (end of file).
    #[error("device closed")]
    Closed,
}

impl DeviceError {
    pub fn not_found(config: &DeviceConfig) -> Self {
        DeviceError::NotFound {
            vid: config.vid,
            pid: config.pid,
            usage_page: config.usage_page,
            usage: config.usage,
        }
    }
}

/// Events delivered by an open device.
#[derive(Debug)]
pub enum DeviceEvent {
    /// One packet as read from the device (not yet validated).
    Report(Vec<u8>),
    /// Reading failed; the connection is unusable.
    Lost(DeviceError),
}

/// Outbound half of an open device.
pub trait ReportWriter: Send {
    fn write_report(&mut self, report: &[u8; REPORT_SIZE]) -> Result<(), DeviceError>;
}

/// An open device: a writer plus the stream of inbound events.
pub struct DeviceConnection {
    pub writer: Box<dyn ReportWriter>,
    pub events: mpsc::Receiver<DeviceEvent>,
}

/// Finds and opens the keyboard's raw HID interface.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, config: &DeviceConfig) -> Result<DeviceConnection, DeviceError>;
}

/// Delays used by the run loop.
#[derive(Debug, Clone)]
pub struct WatchTiming {
    /// Wait between failed connection attempts.
    pub reconnect_interval: Duration,
    /// Wait after losing the device before trying to reconnect.
    pub error_backoff: Duration,
    /// How many times to try sending the layer query.
    pub query_attempts: u32,
    /// Delay before each layer query attempt.
    pub query_delay: Duration,
    /// Extra delay after a failed layer query attempt.
    pub query_retry_delay: Duration,
}

impl Default for WatchTiming {
    fn default() -> Self {
        Self {
            reconnect_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(1),
            query_attempts: 5,
            query_delay: Duration::from_millis(100),
            query_retry_delay: Duration::from_millis(200),
        }
    }
}

/// The watcher use case.
pub struct Watcher<O> {
    opener: O,
    device: DeviceConfig,
    cues: CueDispatcher,
    state: WatcherState,
    timing: WatchTiming,
}

impl<O: DeviceOpener> Watcher<O> {
    pub fn new(opener: O, device: DeviceConfig, cues: CueDispatcher, timing: WatchTiming) -> Self {
        Self {
            opener,
            device,
            cues,
            state: WatcherState::new(),
            timing,
        }
    }

    /// Runs until `shutdown` becomes `true` or its sender is dropped, then
    /// returns the final layer state.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WatcherState {
        info!("accessibility watcher started");
        self.cues.play(Cue::ProgramStart);

        let mut connection: Option<DeviceConnection> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            if connection.is_none() {
                match self.opener.open(&self.device) {
                    Ok(mut conn) => {
                        info!("connected to device");
                        self.cues.play(Cue::KeyboardConnect);
                        self.state.on_reconnect();
                        self.request_current_layer(conn.writer.as_mut()).await;
                        connection = Some(conn);
                    }
                    Err(e @ DeviceError::NotFound { .. }) => {
                        error!("failed to find matching device: {e}");
                        if wait_or_shutdown(&mut shutdown, self.timing.reconnect_interval).await {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("failed to connect to device: {e}");
                        self.cues.play(Cue::Error);
                        if wait_or_shutdown(&mut shutdown, self.timing.reconnect_interval).await {
                            break;
                        }
                    }
                }
                continue;
            }

            let Some(conn) = connection.as_mut() else {
                continue;
            };

            let event = tokio::select! {
                event = conn.events.recv() => event,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match event {
                Some(DeviceEvent::Report(bytes)) => {
                    if let Some(cue) = self.state.handle_packet(&bytes) {
                        self.cues.play(cue);
                    }
                }
                Some(DeviceEvent::Lost(e)) => {
                    error!("lost device: {e}");
                    connection = None;
                    self.disconnected();
                    if wait_or_shutdown(&mut shutdown, self.timing.error_backoff).await {
                        break;
                    }
                }
                None => {
                    warn!("device reader stopped");
                    connection = None;
                    self.disconnected();
                    if wait_or_shutdown(&mut shutdown, self.timing.error_backoff).await {
                        break;
                    }
                }
            }
        }

        if connection.take().is_some() {
            self.disconnected();
        }
        self.cues.play(Cue::ProgramExit);
        info!("accessibility watcher exited");
        self.state
    }

    fn disconnected(&self) {
        info!("disconnected from device");
        self.cues.play(Cue::KeyboardDisconnect);
    }

    /// Sends the layer query, retrying a few times because a freshly
    /// enumerated interface may reject the first write.  Returns whether a
    /// write succeeded.
    async fn request_current_layer(&self, writer: &mut dyn ReportWriter) -> bool {
        let query = encode_command(Command::QueryLayer);
        let attempts = self.timing.query_attempts;

        for attempt in 1..=attempts {
            tokio::time::sleep(self.timing.query_delay).await;
            match writer.write_report(&query) {
                Ok(()) => {
                    info!("requested current layer from device");
                    return true;
                }
                Err(e) => {
                    error!("failed to request current layer (attempt {attempt}/{attempts}): {e}");
                    tokio::time::sleep(self.timing.query_retry_delay).await;
                }
            }
        }

        error!("failed to request current layer after {attempts} attempts");
        false
    }
}

/// Sleeps for `delay` unless shutdown is requested first.  Returns `true`
/// when the caller should stop.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
