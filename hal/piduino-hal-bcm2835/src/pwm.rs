//! Hardware PWM controller and its clock manager
//!
//! The BCM2835 PWM block has two channels, each reachable from a fixed set
//! of pins through an alternate pin function. Frequency is programmed on
//! the shared PWM clock (integer divisor from a 19.2 MHz oscillator),
//! duty through the per-channel data register against a fixed range.

use std::hint;
use std::sync::Arc;

use parking_lot::Mutex;

use piduino_hal::{Error, PwmBackend, Result, PWM_RESOLUTION};

use crate::gpio::{Bcm2835Gpio, FunctionSelect};
use crate::mmap::PeripheralMap;
use crate::{BLOCK_LEN, CLOCK_BASE, PWM_BASE};

// Word indices into the PWM block
const PWM_CTL: usize = 0;
const PWM_RNG1: usize = 4;
const PWM_DAT1: usize = 5;
const PWM_RNG2: usize = 8;
const PWM_DAT2: usize = 9;

// PWM_CTL bits per channel: enable and mark-space mode
const CTL_PWEN1: u32 = 1 << 0;
const CTL_MSEN1: u32 = 1 << 7;
const CTL_PWEN2: u32 = 1 << 8;
const CTL_MSEN2: u32 = 1 << 15;

// Word indices into the clock block
const PWMCLK_CNTL: usize = 40;
const PWMCLK_DIV: usize = 41;

// Clock manager magic
const CLK_PASSWORD: u32 = 0x5A00_0000;
const CLK_SRC_OSC: u32 = 0x01;
const CLK_ENABLE: u32 = 0x10;
const CLK_BUSY: u32 = 0x80;

/// Default PWM clock source on the Pi: the 19.2 MHz crystal oscillator.
pub const OSC_CLOCK_HZ: f64 = 19_200_000.0;

/// Largest divisor the 12-bit DIVI field can hold.
const MAX_DIVISOR: i64 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Pwm0,
    Pwm1,
}

/// Pins wired to a PWM channel, with the alternate function that routes
/// them there.
const PWM_PINS: &[(u8, Channel, FunctionSelect)] = &[
    (12, Channel::Pwm0, FunctionSelect::Alt0),
    (13, Channel::Pwm1, FunctionSelect::Alt0),
    (18, Channel::Pwm0, FunctionSelect::Alt5),
    (19, Channel::Pwm1, FunctionSelect::Alt5),
    (40, Channel::Pwm0, FunctionSelect::Alt0),
    (41, Channel::Pwm1, FunctionSelect::Alt0),
    (45, Channel::Pwm1, FunctionSelect::Alt0),
    (52, Channel::Pwm0, FunctionSelect::Alt1),
    (53, Channel::Pwm1, FunctionSelect::Alt1),
];

fn channel_for(pin: u8) -> Result<(Channel, FunctionSelect)> {
    PWM_PINS
        .iter()
        .find(|(p, _, _)| *p == pin)
        .map(|&(_, ch, alt)| (ch, alt))
        .ok_or(Error::UnsupportedPwmPin(pin))
}

/// Hardware PWM backend over the BCM2835 PWM and clock blocks.
pub struct Bcm2835Pwm {
    gpio: Arc<Bcm2835Gpio>,
    pwm: PeripheralMap,
    clock: PeripheralMap,
    base_clock_hz: f64,
    /// Serializes control/clock sequences; both channels share them.
    ctl_lock: Mutex<()>,
}

impl Bcm2835Pwm {
    /// Map the PWM and clock blocks from `/dev/mem`. Unlike the GPIO
    /// block there is no restricted device for these, so this requires
    /// root (or a udev rule granting access).
    pub fn map(gpio: Arc<Bcm2835Gpio>) -> Result<Self> {
        let pwm = PeripheralMap::map("/dev/mem", PWM_BASE, BLOCK_LEN)?;
        let clock = PeripheralMap::map("/dev/mem", CLOCK_BASE, BLOCK_LEN)?;
        Ok(Self::with_registers(gpio, pwm, clock, OSC_CLOCK_HZ))
    }

    /// Backend over explicit register blocks with a configurable base
    /// clock. The divisor computation depends only on `base_clock_hz`, so
    /// ports to SoCs with a different PWM source clock change this value
    /// rather than the programming sequence.
    pub fn with_registers(
        gpio: Arc<Bcm2835Gpio>,
        pwm: PeripheralMap,
        clock: PeripheralMap,
        base_clock_hz: f64,
    ) -> Self {
        Self {
            gpio,
            pwm,
            clock,
            base_clock_hz,
            ctl_lock: Mutex::new(()),
        }
    }

    fn check_duty(pin: u8, duty: u32) -> Result<()> {
        if duty >= PWM_RESOLUTION {
            return Err(Error::InvalidDutyCycle { pin, duty });
        }
        Ok(())
    }

    fn data_reg(channel: Channel) -> usize {
        match channel {
            Channel::Pwm0 => PWM_DAT1,
            Channel::Pwm1 => PWM_DAT2,
        }
    }

    fn spin_while_busy(&self) {
        while self.clock.read(PWMCLK_CNTL) & CLK_BUSY != 0 {
            hint::spin_loop();
        }
    }
}

impl PwmBackend for Bcm2835Pwm {
    fn configure(&self, pin: u8) -> Result<()> {
        let (channel, alt) = channel_for(pin)?;
        self.gpio.set_function(pin, alt);

        let _guard = self.ctl_lock.lock();
        let (rng, enable) = match channel {
            Channel::Pwm0 => (PWM_RNG1, CTL_MSEN1 | CTL_PWEN1),
            Channel::Pwm1 => (PWM_RNG2, CTL_MSEN2 | CTL_PWEN2),
        };
        self.pwm.write(rng, PWM_RESOLUTION);
        self.pwm.write(PWM_CTL, self.pwm.read(PWM_CTL) | enable);
        Ok(())
    }

    fn set_frequency(&self, pin: u8, hz: f64, duty: u32) -> Result<()> {
        let (channel, _) = channel_for(pin)?;
        Self::check_duty(pin, duty)?;

        // The channel counts base-clock ticks: one period is
        // PWM_RESOLUTION ticks, so the divisor targets hz * resolution.
        let divisor = (self.base_clock_hz / (hz * PWM_RESOLUTION as f64)) as i64;
        if !(0..=MAX_DIVISOR).contains(&divisor) {
            return Err(Error::UnsupportedFrequency { hz, divisor });
        }

        let _guard = self.ctl_lock.lock();

        // Reprogramming the clock with channels running glitches the
        // output; stop everything, change the divisor, restore.
        let ctl = self.pwm.read(PWM_CTL);
        self.pwm.write(PWM_CTL, 0);

        self.clock.write(PWMCLK_CNTL, CLK_PASSWORD | CLK_SRC_OSC);
        self.spin_while_busy();
        self.clock
            .write(PWMCLK_DIV, CLK_PASSWORD | ((divisor as u32) << 12));
        self.clock
            .write(PWMCLK_CNTL, CLK_PASSWORD | CLK_ENABLE | CLK_SRC_OSC);

        self.pwm.write(PWM_CTL, ctl);
        self.pwm.write(Self::data_reg(channel), duty);
        Ok(())
    }

    fn set_duty(&self, pin: u8, duty: u32) -> Result<()> {
        let (channel, _) = channel_for(pin)?;
        Self::check_duty(pin, duty)?;
        self.pwm.write(Self::data_reg(channel), duty);
        Ok(())
    }
}
