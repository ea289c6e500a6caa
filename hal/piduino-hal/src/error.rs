//! Shared error taxonomy
//!
//! Configuration and resource faults are unrecoverable misconfiguration in
//! an embedded-control context; callers typically unwrap them at the top of
//! the binary. Timeouts are not errors and are returned as sentinel values
//! by the operations that can time out.

use std::io;

use thiserror::Error;

use crate::gpio::{PinMode, MAX_PINS};

/// Result type for all backend and board operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by pin configuration and backend access.
#[derive(Debug, Error)]
pub enum Error {
    /// Pin index outside the supported range.
    #[error("pin {0} is out of range (valid: 0..{MAX_PINS})")]
    InvalidPin(u8),

    /// The requested mode is not supported for this pin or backend.
    #[error("pin {pin}: mode {mode:?} is not supported here")]
    UnsupportedMode { pin: u8, mode: PinMode },

    /// Digital operation on a pin that was never configured with `pin_mode`.
    #[error("pin {0} used before digital configuration")]
    NotConfigured(u8),

    /// PWM operation on a pin without a PWM assignment.
    #[error("pin {0} used before PWM configuration")]
    NotPwmConfigured(u8),

    /// The pin is not wired to a hardware PWM channel.
    #[error("pin {0} has no hardware PWM channel")]
    UnsupportedPwmPin(u8),

    /// Duty cycle outside `[0, resolution)`.
    #[error("pin {pin}: duty cycle {duty} exceeds resolution")]
    InvalidDutyCycle { pin: u8, duty: u32 },

    /// The frequency/resolution combination has no programmable divisor.
    #[error("unsupported PWM frequency {hz} Hz (computed divisor {divisor})")]
    UnsupportedFrequency { hz: f64, divisor: i64 },

    /// An OS-level file operation failed.
    #[error("{op} failed{}: {source}", .pin.map(|p| format!(" for pin {p}")).unwrap_or_default())]
    Io {
        /// Operation description, e.g. `"export"` or `"open value file"`.
        op: &'static str,
        /// Pin the operation targeted, if any.
        pin: Option<u8>,
        #[source]
        source: io::Error,
    },

    /// Mapping a peripheral memory window failed.
    #[error("memory-mapping {device} failed: {source}")]
    MemoryMap {
        /// Device path that was being mapped.
        device: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(feature = "embedded-hal")]
impl embedded_hal::digital::Error for Error {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl Error {
    /// Shorthand for an I/O error tied to a specific pin.
    pub fn io(op: &'static str, pin: u8, source: io::Error) -> Self {
        Error::Io {
            op,
            pin: Some(pin),
            source,
        }
    }
}
