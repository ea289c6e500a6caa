//! PWM backend trait and duty-cycle math
//!
//! Duty cycles are integers in `[0, PWM_RESOLUTION)`, Arduino style. The
//! degenerate values (0 and full scale) are never sent to a PWM engine;
//! the board layer turns them into static digital levels.

use std::time::Duration;

use crate::error::Result;

/// Discrete duty-cycle steps per PWM period.
pub const PWM_RESOLUTION: u32 = 256;

/// Default PWM frequency, matching `analogWrite` on stock Arduino boards.
pub const DEFAULT_PWM_HZ: f64 = 490.0;

/// Hardware PWM backend
///
/// Implemented by SoC backends whose PWM controller drives a fixed subset
/// of pins. Software PWM lives above this layer and works on any pin.
pub trait PwmBackend: Send + Sync {
    /// Route the pin to its PWM channel and enable mark-space mode.
    fn configure(&self, pin: u8) -> Result<()>;

    /// Reprogram the channel's frequency and duty cycle.
    fn set_frequency(&self, pin: u8, hz: f64, duty: u32) -> Result<()>;

    /// Update only the duty cycle.
    fn set_duty(&self, pin: u8, duty: u32) -> Result<()>;
}

/// Split one PWM period into (high, low) times for a software PWM loop.
///
/// `duty` must be strictly between 0 and `PWM_RESOLUTION - 1`; the
/// degenerate values have no period to split.
pub fn soft_pwm_times(hz: f64, duty: u32) -> (Duration, Duration) {
    debug_assert!(duty > 0 && duty < PWM_RESOLUTION - 1);
    debug_assert!(hz.is_finite() && hz > 0.0);
    let period_us = 1_000_000.0 / hz;
    let high_us = period_us * duty as f64 / (PWM_RESOLUTION - 1) as f64;
    let low_us = period_us - high_us;
    (
        Duration::from_micros(high_us as u64),
        Duration::from_micros(low_us as u64),
    )
}
