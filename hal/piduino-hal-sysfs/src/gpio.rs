//! Digital backend over the kernel GPIO interface

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use piduino_hal::{Error, GpioBackend, Level, PinMode, Pull, Result};

use crate::fs;

/// Kernel sysfs GPIO backend.
///
/// Value files are opened once at configuration time and cached for the
/// pin's lifetime to avoid the open cost on every read or write. The cache
/// mutex also serializes value-file access between the caller and any
/// worker thread driving the same pin.
pub struct SysfsGpio {
    root: PathBuf,
    values: Mutex<HashMap<u8, File>>,
}

impl SysfsGpio {
    /// Backend over the default `/sys/class/gpio` tree.
    pub fn new() -> Self {
        Self::with_root(fs::DEFAULT_ROOT)
    }

    /// Backend over an alternate sysfs root. Used by tests with a fake
    /// tree, and by systems that mount sysfs elsewhere.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// The sysfs root this backend operates on.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBackend for SysfsGpio {
    fn configure(&self, pin: u8, mode: PinMode) -> Result<()> {
        if mode.backend() != piduino_hal::Backend::Kernel || mode.is_pwm() {
            return Err(Error::UnsupportedMode { pin, mode });
        }

        fs::export(&self.root, pin)?;

        // The sysfs interface has no pull-resistor control; the request is
        // honored as plain input.
        if mode.pull() != Pull::Off {
            log::warn!("pin {pin}: pull resistors are not controllable via sysfs, ignoring");
        }

        fs::set_direction(&self.root, pin, mode.is_output())?;

        let value = fs::open_value(&self.root, pin)?;
        self.values.lock().insert(pin, value);
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        let mut values = self.values.lock();
        let file = values.get_mut(&pin).ok_or(Error::NotConfigured(pin))?;
        let byte: &[u8] = if level.is_high() { b"1" } else { b"0" };
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek value", pin, e))?;
        file.write_all(byte)
            .map_err(|e| Error::io("write value", pin, e))
    }

    fn read(&self, pin: u8) -> Result<Level> {
        let mut values = self.values.lock();
        let file = values.get_mut(&pin).ok_or(Error::NotConfigured(pin))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek value", pin, e))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)
            .map_err(|e| Error::io("read value", pin, e))?;
        Ok(Level::from(byte[0] == b'1'))
    }

    fn reset(&self, pin: u8) -> Result<()> {
        self.values.lock().remove(&pin);
        if fs::pin_dir(&self.root, pin).exists() {
            fs::set_direction(&self.root, pin, false)?;
        }
        Ok(())
    }
}
