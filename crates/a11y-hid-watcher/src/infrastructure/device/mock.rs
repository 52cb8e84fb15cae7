//! Mock raw HID device for tests.
//!
//! `MockDevice` is a [`DeviceOpener`] whose connections are backed by
//! in-memory channels.  Tests push packets with [`MockDevice::inject`],
//! simulate unplugging with [`MockDevice::unplug`], and inspect writes with
//! [`MockDevice::written`].  Clones share the same state, so a test can keep
//! one handle while the watcher owns another.
//!
//! # Failure injection
//!
//! - [`MockDevice::fail_next_open`] queues errors returned by `open`.
//! - [`MockDevice::fail_next_writes`] makes the next N writes fail.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use a11y_hid_core::REPORT_SIZE;
use tokio::sync::mpsc;

use crate::application::watch::{
    DeviceConnection, DeviceError, DeviceEvent, DeviceOpener, ReportWriter,
};
use crate::domain::DeviceConfig;

#[derive(Default)]
struct Inner {
    written: Mutex<Vec<[u8; REPORT_SIZE]>>,
    sender: Mutex<Option<mpsc::Sender<DeviceEvent>>>,
    open_failures: Mutex<VecDeque<DeviceError>>,
    write_failures: AtomicUsize,
    opens: AtomicUsize,
}

/// In-memory stand-in for a keyboard's raw HID interface.
#[derive(Clone, Default)]
pub struct MockDevice {
    inner: Arc<Inner>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `open` call fail with `error`.  Calls queue up.
    pub fn fail_next_open(&self, error: DeviceError) {
        self.inner.open_failures.lock().unwrap().push_back(error);
    }

    /// Makes the next `count` writes fail with an I/O error.
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.write_failures.store(count, Ordering::SeqCst);
    }

    /// Delivers a packet to the watcher.  Returns `false` if no connection is
    /// open.
    pub async fn inject(&self, bytes: &[u8]) -> bool {
        self.send(DeviceEvent::Report(bytes.to_vec())).await
    }

    /// Simulates the keyboard disappearing.
    pub async fn unplug(&self) -> bool {
        self.send(DeviceEvent::Lost(DeviceError::Closed)).await
    }

    async fn send(&self, event: DeviceEvent) -> bool {
        let sender = self.inner.sender.lock().unwrap().clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Every report written so far, in order.
    pub fn written(&self) -> Vec<[u8; REPORT_SIZE]> {
        self.inner.written.lock().unwrap().clone()
    }

    /// Number of successful `open` calls.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }
}

impl DeviceOpener for MockDevice {
    fn open(&self, _config: &DeviceConfig) -> Result<DeviceConnection, DeviceError> {
        if let Some(error) = self.inner.open_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(32);
        *self.inner.sender.lock().unwrap() = Some(tx);
        self.inner.opens.fetch_add(1, Ordering::SeqCst);

        Ok(DeviceConnection {
            writer: Box::new(MockWriter {
                inner: Arc::clone(&self.inner),
            }),
            events: rx,
        })
    }
}

struct MockWriter {
    inner: Arc<Inner>,
}

impl ReportWriter for MockWriter {
    fn write_report(&mut self, report: &[u8; REPORT_SIZE]) -> Result<(), DeviceError> {
        let remaining = self.inner.write_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner.write_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        self.inner.written.lock().unwrap().push(*report);
        Ok(())
    }
}
