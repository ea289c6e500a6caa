//! GPIO register block
//!
//! Function-select packs ten pins per word at three bits each, so
//! concurrent mode changes on nearby pins would race; a block-level mutex
//! serializes every read-modify-write word. Level changes go through the
//! dedicated set/clear registers, which never need read-modify-write.

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use piduino_hal::{Backend, Error, GpioBackend, Level, PinMode, Pull, Result};

use crate::mmap::PeripheralMap;
use crate::{BLOCK_LEN, GPIO_BASE};

// Word indices into the GPIO block
const GPFSEL0: usize = 0;
const GPSET0: usize = 7;
const GPCLR0: usize = 10;
const GPLEV0: usize = 13;
const GPPUD: usize = 37;
const GPPUDCLK0: usize = 38;

/// Pull-register settle time. The datasheet asks for 150 core cycles;
/// a microsecond-scale sleep is comfortably beyond that.
const PUD_SETTLE: Duration = Duration::from_micros(5);

/// Function-select codes for one pin (3 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub(crate) enum FunctionSelect {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt5 = 0b010,
}

/// Memory-mapped GPIO backend for the BCM2835.
pub struct Bcm2835Gpio {
    regs: PeripheralMap,
    /// Guards read-modify-write registers shared between pins
    /// (function-select, pull control).
    word_lock: Mutex<()>,
}

impl Bcm2835Gpio {
    /// Map the GPIO block. Tries `/dev/gpiomem` first (no root required),
    /// then falls back to `/dev/mem`.
    pub fn map() -> Result<Self> {
        let regs = match PeripheralMap::map("/dev/gpiomem", 0, BLOCK_LEN) {
            Ok(regs) => regs,
            Err(first) => {
                log::debug!("gpiomem unavailable ({first}), falling back to /dev/mem");
                PeripheralMap::map("/dev/mem", GPIO_BASE, BLOCK_LEN)?
            }
        };
        Ok(Self::with_registers(regs))
    }

    /// Backend over an explicit register block. Tests pass an in-memory
    /// block here.
    pub fn with_registers(regs: PeripheralMap) -> Self {
        Self {
            regs,
            word_lock: Mutex::new(()),
        }
    }

    pub(crate) fn set_function(&self, pin: u8, function: FunctionSelect) {
        let _guard = self.word_lock.lock();
        let reg = GPFSEL0 + (pin as usize) / 10;
        let shift = ((pin as usize) % 10) * 3;
        let mut word = self.regs.read(reg);
        word &= !(0b111 << shift);
        word |= (function as u32) << shift;
        self.regs.write(reg, word);
    }

    pub(crate) fn function(&self, pin: u8) -> u32 {
        let reg = GPFSEL0 + (pin as usize) / 10;
        let shift = ((pin as usize) % 10) * 3;
        (self.regs.read(reg) >> shift) & 0b111
    }

    /// Program the built-in pull resistor using the two-register clock
    /// pulse protocol: set the mode, pulse the per-pin clock line, then
    /// clear both.
    pub(crate) fn set_pull(&self, pin: u8, pull: Pull) {
        let code = match pull {
            Pull::Off => 0b00,
            Pull::Down => 0b01,
            Pull::Up => 0b10,
        };
        let clk_reg = GPPUDCLK0 + (pin as usize) / 32;
        let clk_bit = 1u32 << ((pin as usize) % 32);

        let _guard = self.word_lock.lock();
        self.regs.write(GPPUD, code);
        thread::sleep(PUD_SETTLE);
        self.regs.write(clk_reg, clk_bit);
        thread::sleep(PUD_SETTLE);
        self.regs.write(GPPUD, 0);
        self.regs.write(clk_reg, 0);
    }

    fn pin_bit(pin: u8) -> (usize, u32) {
        ((pin as usize) / 32, 1u32 << ((pin as usize) % 32))
    }
}

impl GpioBackend for Bcm2835Gpio {
    fn configure(&self, pin: u8, mode: PinMode) -> Result<()> {
        if mode.backend() != Backend::Mmio || mode.is_pwm() {
            // PWM routing happens through the PWM backend
            return Err(Error::UnsupportedMode { pin, mode });
        }

        if mode.is_output() {
            self.set_function(pin, FunctionSelect::Output);
        } else {
            // Pull state must be latched before the pin becomes an input
            self.set_pull(pin, mode.pull());
            self.set_function(pin, FunctionSelect::Input);
        }
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        let (word, bit) = Self::pin_bit(pin);
        let reg = if level.is_high() { GPSET0 } else { GPCLR0 };
        self.regs.write(reg + word, bit);
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level> {
        let (word, bit) = Self::pin_bit(pin);
        Ok(Level::from(self.regs.read(GPLEV0 + word) & bit != 0))
    }

    fn reset(&self, pin: u8) -> Result<()> {
        self.set_pull(pin, Pull::Off);
        self.set_function(pin, FunctionSelect::Input);
        Ok(())
    }
}
