//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use piduino_hal::{Error, GpioBackend, Level, PinMode, PwmBackend, Result};

struct FakePinState {
    mode: PinMode,
    level: Level,
    writes: Vec<(Instant, Level)>,
    resets: usize,
}

/// In-memory GPIO backend recording every write with a timestamp.
#[derive(Default)]
pub struct FakeGpio {
    pins: Mutex<HashMap<u8, FakePinState>>,
    read_fns: Mutex<HashMap<u8, Box<dyn Fn() -> Level + Send + Sync>>>,
}

impl FakeGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the value `read` returns for a pin, e.g. a time-based pulse.
    pub fn set_read_fn<F>(&self, pin: u8, f: F)
    where
        F: Fn() -> Level + Send + Sync + 'static,
    {
        self.read_fns.lock().unwrap().insert(pin, Box::new(f));
    }

    pub fn level(&self, pin: u8) -> Level {
        self.pins.lock().unwrap()[&pin].level
    }

    pub fn writes(&self, pin: u8) -> Vec<(Instant, Level)> {
        self.pins.lock().unwrap()[&pin].writes.clone()
    }

    pub fn write_count(&self, pin: u8) -> usize {
        self.pins.lock().unwrap()[&pin].writes.len()
    }

    pub fn reset_count(&self, pin: u8) -> usize {
        self.pins
            .lock()
            .unwrap()
            .get(&pin)
            .map(|p| p.resets)
            .unwrap_or(0)
    }
}

impl GpioBackend for FakeGpio {
    fn configure(&self, pin: u8, mode: PinMode) -> Result<()> {
        let mut pins = self.pins.lock().unwrap();
        let state = pins.entry(pin).or_insert(FakePinState {
            mode,
            level: Level::Low,
            writes: Vec::new(),
            resets: 0,
        });
        state.mode = mode;
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        let mut pins = self.pins.lock().unwrap();
        let state = pins.get_mut(&pin).ok_or(Error::NotConfigured(pin))?;
        state.level = level;
        state.writes.push((Instant::now(), level));
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level> {
        if let Some(f) = self.read_fns.lock().unwrap().get(&pin) {
            return Ok(f());
        }
        let pins = self.pins.lock().unwrap();
        Ok(pins.get(&pin).map(|p| p.level).unwrap_or(Level::Low))
    }

    fn reset(&self, pin: u8) -> Result<()> {
        let mut pins = self.pins.lock().unwrap();
        let state = pins.get_mut(&pin).ok_or(Error::NotConfigured(pin))?;
        state.resets += 1;
        Ok(())
    }
}

/// Recorded hardware PWM operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PwmCall {
    Configure(u8),
    SetFrequency(u8, f64, u32),
    SetDuty(u8, u32),
}

#[derive(Default)]
pub struct FakePwm {
    pub calls: Mutex<Vec<PwmCall>>,
    min_hz: Mutex<Option<f64>>,
}

impl FakePwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PwmCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Reject `set_frequency` below a threshold, like a divisor running
    /// out of range on real hardware.
    pub fn reject_below(&self, hz: f64) {
        *self.min_hz.lock().unwrap() = Some(hz);
    }
}

impl PwmBackend for FakePwm {
    fn configure(&self, pin: u8) -> Result<()> {
        self.calls.lock().unwrap().push(PwmCall::Configure(pin));
        Ok(())
    }

    fn set_frequency(&self, pin: u8, hz: f64, duty: u32) -> Result<()> {
        if let Some(min) = *self.min_hz.lock().unwrap() {
            if hz < min {
                return Err(Error::UnsupportedFrequency { hz, divisor: 9999 });
            }
        }
        self.calls
            .lock()
            .unwrap()
            .push(PwmCall::SetFrequency(pin, hz, duty));
        Ok(())
    }

    fn set_duty(&self, pin: u8, duty: u32) -> Result<()> {
        self.calls.lock().unwrap().push(PwmCall::SetDuty(pin, duty));
        Ok(())
    }
}

/// Fraction of time spent high across a recorded write sequence.
pub fn high_ratio(writes: &[(Instant, Level)]) -> f64 {
    let mut high = Duration::ZERO;
    let mut total = Duration::ZERO;
    for pair in writes.windows(2) {
        let (t0, level) = pair[0];
        let (t1, _) = pair[1];
        total += t1 - t0;
        if level == Level::High {
            high += t1 - t0;
        }
    }
    high.as_secs_f64() / total.as_secs_f64()
}
