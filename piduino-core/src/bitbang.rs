//! Bit-banged serial transfer and pulse timing
//!
//! Stateless helpers layered on `digital_read`/`digital_write`. The clock
//! rate is whatever the backend achieves; peripherals that need a minimum
//! clock period get it from the sysfs backend's latency alone.

use std::time::{Duration, Instant};

use piduino_hal::{BitOrder, Level, Result};

use crate::board::Board;

impl Board {
    /// Shift one byte out, one clock pulse per bit.
    pub fn shift_out(&self, data_pin: u8, clock_pin: u8, order: BitOrder, value: u8) -> Result<()> {
        for i in 0..8 {
            let bit = match order {
                BitOrder::LsbFirst => (value >> i) & 1,
                BitOrder::MsbFirst => (value >> (7 - i)) & 1,
            };
            self.digital_write(data_pin, Level::from(bit == 1))?;
            self.digital_write(clock_pin, Level::High)?;
            self.digital_write(clock_pin, Level::Low)?;
        }
        Ok(())
    }

    /// Shift one byte in, sampling the data pin while the clock is high.
    pub fn shift_in(&self, data_pin: u8, clock_pin: u8, order: BitOrder) -> Result<u8> {
        let mut value = 0u8;
        for i in 0..8 {
            self.digital_write(clock_pin, Level::High)?;
            let bit = self.digital_read(data_pin)?.is_high() as u8;
            match order {
                BitOrder::LsbFirst => value |= bit << i,
                BitOrder::MsbFirst => value |= bit << (7 - i),
            }
            self.digital_write(clock_pin, Level::Low)?;
        }
        Ok(value)
    }

    /// Measure the length of the next pulse at `level`, in microseconds.
    ///
    /// Three phases, all bounded by `timeout_us`: wait for any pulse in
    /// progress to end, wait for the pulse to start, then time it.
    /// Returns 0 on timeout; a timeout is a defined outcome, not an error.
    pub fn pulse_in(&self, pin: u8, level: Level, timeout_us: u64) -> Result<u64> {
        let deadline = Instant::now() + Duration::from_micros(timeout_us);

        while self.digital_read(pin)? == level {
            if Instant::now() >= deadline {
                return Ok(0);
            }
        }
        while self.digital_read(pin)? != level {
            if Instant::now() >= deadline {
                return Ok(0);
            }
        }
        let start = Instant::now();
        while self.digital_read(pin)? == level {
            if Instant::now() >= deadline {
                return Ok(0);
            }
        }
        Ok(start.elapsed().as_micros() as u64)
    }
}
