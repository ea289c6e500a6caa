//! Sysfs GPIO control-file helpers
//!
//! Shared between the digital backend and the interrupt subsystem, which
//! also arms pins through the kernel interface regardless of which backend
//! owns their digital I/O.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use piduino_hal::{Edge, Error, Result};

/// Default location of the kernel GPIO interface.
pub const DEFAULT_ROOT: &str = "/sys/class/gpio";

/// Attempts to wait for the kernel to create a pin's control files after
/// export. udev can take a moment to create and chown them.
const EXPORT_RETRIES: u32 = 20;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Directory holding a pin's control files, e.g. `<root>/gpio17`.
pub fn pin_dir(root: &Path, pin: u8) -> PathBuf {
    root.join(format!("gpio{pin}"))
}

/// Path of a pin's value file.
pub fn value_path(root: &Path, pin: u8) -> PathBuf {
    pin_dir(root, pin).join("value")
}

/// Export a pin to the kernel GPIO interface.
///
/// Idempotent: if the pin's directory already exists the export write is
/// skipped. After a fresh export, waits briefly for the kernel to create
/// the `direction` file.
pub fn export(root: &Path, pin: u8) -> Result<()> {
    let dir = pin_dir(root, pin);
    if dir.exists() {
        return Ok(());
    }

    fs::write(root.join("export"), pin.to_string())
        .map_err(|e| Error::io("export", pin, e))?;

    let direction = dir.join("direction");
    for attempt in 0..EXPORT_RETRIES {
        if direction.exists() {
            if attempt > 0 {
                log::debug!("pin {pin}: control files appeared after {attempt} retries");
            }
            return Ok(());
        }
        thread::sleep(EXPORT_RETRY_DELAY);
    }

    Err(Error::io(
        "export",
        pin,
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} never appeared", direction.display()),
        ),
    ))
}

/// Remove a pin from the kernel GPIO interface. A pin that was never
/// exported is not an error.
pub fn unexport(root: &Path, pin: u8) -> Result<()> {
    if !pin_dir(root, pin).exists() {
        return Ok(());
    }
    fs::write(root.join("unexport"), pin.to_string())
        .map_err(|e| Error::io("unexport", pin, e))
}

/// Write the pin's direction: `in` or `out`.
pub fn set_direction(root: &Path, pin: u8, output: bool) -> Result<()> {
    let token = if output { "out" } else { "in" };
    fs::write(pin_dir(root, pin).join("direction"), token)
        .map_err(|e| Error::io("set direction", pin, e))
}

/// Write the pin's interrupt edge mode.
pub fn set_edge(root: &Path, pin: u8, edge: Edge) -> Result<()> {
    fs::write(pin_dir(root, pin).join("edge"), edge_token(edge))
        .map_err(|e| Error::io("set edge", pin, e))
}

/// Open a pin's value file for reading and writing.
pub fn open_value(root: &Path, pin: u8) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(value_path(root, pin))
        .map_err(|e| Error::io("open value file", pin, e))
}

/// Sysfs token for an edge mode.
pub fn edge_token(edge: Edge) -> &'static str {
    match edge {
        Edge::Rising => "rising",
        Edge::Falling => "falling",
        Edge::Both => "both",
    }
}
