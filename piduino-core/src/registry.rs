//! Pin registry
//!
//! One record per pin index, each behind its own mutex. The record is the
//! single owner of everything attached to the pin: its backend assignment,
//! configuration flags, duty cycle, and the worker slots. Worker handles
//! live here, keyed by pin identity, never in shared slots.

use parking_lot::Mutex;

use piduino_hal::{Backend, Error, PinMode, Result, DEFAULT_PWM_HZ, MAX_PINS};

use crate::interrupt::InterruptWorker;
use crate::worker::Worker;

pub(crate) struct PinRecord {
    /// Backend family recorded on the first `pin_mode` call; fixed until
    /// the next `pin_mode` reassigns it.
    pub backend: Option<Backend>,
    pub mode: Option<PinMode>,
    pub digital_configured: bool,
    pub pwm_configured: bool,
    /// Last commanded duty cycle, 0 until set.
    pub duty: u32,
    pub pwm_hz: f64,
    pub soft_pwm: Option<Worker>,
    pub tone: Option<Worker>,
    pub interrupt: Option<InterruptWorker>,
}

impl Default for PinRecord {
    fn default() -> Self {
        Self {
            backend: None,
            mode: None,
            digital_configured: false,
            pwm_configured: false,
            duty: 0,
            pwm_hz: DEFAULT_PWM_HZ,
            soft_pwm: None,
            tone: None,
            interrupt: None,
        }
    }
}

pub(crate) struct Registry {
    pins: Vec<Mutex<PinRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            pins: (0..MAX_PINS).map(|_| Mutex::new(PinRecord::default())).collect(),
        }
    }

    /// The record for a pin, or `InvalidPin` for an out-of-range index.
    pub fn record(&self, pin: u8) -> Result<&Mutex<PinRecord>> {
        self.pins.get(pin as usize).ok_or(Error::InvalidPin(pin))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Mutex<PinRecord>)> {
        self.pins.iter().enumerate().map(|(i, rec)| (i as u8, rec))
    }
}
