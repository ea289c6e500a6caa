//! embedded-hal digital pin adapter
//!
//! Lets driver crates written against `embedded-hal` 1.0 run on top of a
//! [`Board`]: a `PinHandle` is a board clone plus a pin index, so handles
//! are cheap and can coexist with direct board calls.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use piduino_hal::{Error, Level, Result};

use crate::board::Board;

/// A single pin viewed through the `embedded-hal` digital traits.
pub struct PinHandle {
    board: Board,
    pin: u8,
}

impl Board {
    /// An `embedded-hal` handle for a pin. The pin still needs
    /// [`Board::pin_mode`] before use.
    pub fn pin(&self, pin: u8) -> Result<PinHandle> {
        self.inner.registry.record(pin)?;
        Ok(PinHandle {
            board: self.clone(),
            pin,
        })
    }
}

impl ErrorType for PinHandle {
    type Error = Error;
}

impl OutputPin for PinHandle {
    fn set_low(&mut self) -> Result<()> {
        self.board.digital_write(self.pin, Level::Low)
    }

    fn set_high(&mut self) -> Result<()> {
        self.board.digital_write(self.pin, Level::High)
    }
}

impl InputPin for PinHandle {
    fn is_high(&mut self) -> Result<bool> {
        Ok(self.board.digital_read(self.pin)?.is_high())
    }

    fn is_low(&mut self) -> Result<bool> {
        Ok(!self.board.digital_read(self.pin)?.is_high())
    }
}
