//! Linux hidraw backend.
//!
//! Each `/sys/class/hidraw/hidrawN` entry exposes the USB ids in
//! `device/uevent` (`HID_ID=<bus>:<vid>:<pid>`, hex) and the raw report
//! descriptor in `device/report_descriptor`.  A keyboard usually has several
//! HID interfaces with the same ids; the raw HID one is picked by the usage
//! page and usage of its first top-level collection.
//!
//! The matching `/dev/hidrawN` node is opened read-write.  Reads block, so
//! they run on a dedicated thread that forwards packets over an `mpsc`
//! channel.  The thread exits when the device errors out or the receiver is
//! dropped (checked after the next packet arrives).
//!
//! Keyboards using QMK's raw HID interface have no report IDs, so every
//! write is prefixed with report id 0 as hidraw expects.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use a11y_hid_core::REPORT_SIZE;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::watch::{
    DeviceConnection, DeviceError, DeviceEvent, DeviceOpener, ReportWriter,
};
use crate::domain::DeviceConfig;

/// Opens raw HID interfaces through `/dev/hidraw*`.
#[derive(Debug, Clone)]
pub struct HidrawOpener {
    sys_class: PathBuf,
    dev_dir: PathBuf,
}

impl Default for HidrawOpener {
    fn default() -> Self {
        Self {
            sys_class: PathBuf::from("/sys/class/hidraw"),
            dev_dir: PathBuf::from("/dev"),
        }
    }
}

impl HidrawOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses alternative sysfs and device directories.
    pub fn with_roots(sys_class: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            sys_class: sys_class.into(),
            dev_dir: dev_dir.into(),
        }
    }

    /// Returns the device node of the first interface matching `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Io`] if the sysfs class directory cannot be
    /// listed and [`DeviceError::NotFound`] if nothing matches.
    pub fn find(&self, config: &DeviceConfig) -> Result<PathBuf, DeviceError> {
        let entries = match std::fs::read_dir(&self.sys_class) {
            Ok(entries) => entries,
            // No hidraw devices at all: the class directory does not exist.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DeviceError::not_found(config))
            }
            Err(e) => return Err(e.into()),
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("hidraw"))
            .collect();
        names.sort();

        for name in names {
            let device_dir = self.sys_class.join(&name).join("device");
            if interface_matches(&device_dir, config) {
                debug!("matched {name}");
                return Ok(self.dev_dir.join(name));
            }
        }

        Err(DeviceError::not_found(config))
    }
}

fn interface_matches(device_dir: &Path, config: &DeviceConfig) -> bool {
    let Ok(uevent) = std::fs::read_to_string(device_dir.join("uevent")) else {
        return false;
    };
    if parse_hid_id(&uevent) != Some((config.vid, config.pid)) {
        return false;
    }

    match std::fs::read(device_dir.join("report_descriptor")) {
        Ok(descriptor) => {
            top_level_usage(&descriptor) == Some((config.usage_page, config.usage))
        }
        Err(e) => {
            warn!("cannot read report descriptor in {}: {e}", device_dir.display());
            false
        }
    }
}

/// Extracts `(vid, pid)` from the `HID_ID=bbbb:vvvvvvvv:pppppppp` line of a
/// sysfs `uevent` file.
pub fn parse_hid_id(uevent: &str) -> Option<(u16, u16)> {
    let value = uevent
        .lines()
        .find_map(|line| line.strip_prefix("HID_ID="))?;
    let mut parts = value.trim().split(':');
    let _bus = parts.next()?;
    let vid = u32::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u32::from_str_radix(parts.next()?, 16).ok()?;
    Some((u16::try_from(vid).ok()?, u16::try_from(pid).ok()?))
}

/// Returns the usage page and usage in effect when the report descriptor
/// opens its first collection.
pub fn top_level_usage(descriptor: &[u8]) -> Option<(u16, u16)> {
    const LONG_ITEM: u8 = 0xFE;
    const TAG_USAGE_PAGE: u8 = 0x04;
    const TAG_USAGE: u8 = 0x08;
    const TAG_COLLECTION: u8 = 0xA0;

    let mut usage_page: Option<u16> = None;
    let mut usage: Option<(Option<u16>, u16)> = None;
    let mut i = 0;

    while i < descriptor.len() {
        let prefix = descriptor[i];
        if prefix == LONG_ITEM {
            let data_len = *descriptor.get(i + 1)? as usize;
            i += 3 + data_len;
            continue;
        }

        let size = match prefix & 0x03 {
            3 => 4,
            n => n as usize,
        };
        let data = descriptor.get(i + 1..i + 1 + size)?;
        let value = data
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

        match prefix & 0xFC {
            TAG_USAGE_PAGE => usage_page = Some(value as u16),
            // A 4-byte usage carries its own page in the high half.
            TAG_USAGE if size == 4 => usage = Some((Some((value >> 16) as u16), value as u16)),
            TAG_USAGE => usage = Some((None, value as u16)),
            TAG_COLLECTION => {
                let (own_page, usage) = usage?;
                return Some((own_page.or(usage_page)?, usage));
            }
            _ => {}
        }

        i += 1 + size;
    }

    None
}

impl DeviceOpener for HidrawOpener {
    fn open(&self, config: &DeviceConfig) -> Result<DeviceConnection, DeviceError> {
        let node = self.find(config)?;
        let file = OpenOptions::new().read(true).write(true).open(&node)?;
        let reader = file.try_clone()?;

        let (tx, rx) = mpsc::channel(64);
        std::thread::Builder::new()
            .name("hidraw-reader".to_string())
            .spawn(move || read_loop(reader, tx))?;

        Ok(DeviceConnection {
            writer: Box::new(HidrawWriter { file }),
            events: rx,
        })
    }
}

fn read_loop(mut file: File, tx: mpsc::Sender<DeviceEvent>) {
    // Larger than a report so an oversized packet is seen as such.
    let mut buf = [0u8; 64];
    loop {
        let event = match file.read(&mut buf) {
            Ok(0) => DeviceEvent::Lost(DeviceError::Closed),
            Ok(n) => DeviceEvent::Report(buf[..n].to_vec()),
            Err(e) => DeviceEvent::Lost(DeviceError::Io(e)),
        };
        let lost = matches!(event, DeviceEvent::Lost(_));
        if tx.blocking_send(event).is_err() || lost {
            break;
        }
    }
}

struct HidrawWriter {
    file: File,
}

impl ReportWriter for HidrawWriter {
    fn write_report(&mut self, report: &[u8; REPORT_SIZE]) -> Result<(), DeviceError> {
        let mut out = [0u8; REPORT_SIZE + 1];
        out[1..].copy_from_slice(report);
        self.file.write_all(&out)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
