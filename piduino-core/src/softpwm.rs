//! PWM engine: hardware dispatch, soft-PWM workers, tone generation
//!
//! Pins configured with the hardware PWM mode program the SoC's PWM
//! controller directly. Every other output-capable pin gets PWM emulated
//! by a dedicated worker thread toggling the digital output at computed
//! intervals. Degenerate duty cycles (0 and full scale) bypass the worker
//! entirely and set a static level.

use std::sync::Arc;
use std::time::Duration;

use piduino_hal::{pwm::soft_pwm_times, Error, Level, PinMode, Result, PWM_RESOLUTION};

use crate::board::Board;
use crate::time;
use crate::worker::Worker;

impl Board {
    /// Update a PWM-configured pin's duty cycle, `0..PWM_RESOLUTION`.
    pub fn analog_write(&self, pin: u8, duty: u32) -> Result<()> {
        let hz = self.inner.registry.record(pin)?.lock().pwm_hz;
        self.reprogram_pwm(pin, hz, duty)
    }

    /// Reprogram a pin's PWM frequency, keeping the current duty cycle.
    pub fn set_pwm_frequency(&self, pin: u8, hz: f64) -> Result<()> {
        let duty = self.inner.registry.record(pin)?.lock().duty;
        self.reprogram_pwm(pin, hz, duty)
    }

    /// Reprogram a pin's PWM frequency and duty cycle together.
    pub fn set_pwm_frequency_duty(&self, pin: u8, hz: f64, duty: u32) -> Result<()> {
        self.reprogram_pwm(pin, hz, duty)
    }

    /// Reprogram a pin's PWM period, given in microseconds.
    pub fn set_pwm_period_us(&self, pin: u8, period_us: f64) -> Result<()> {
        self.set_pwm_frequency(pin, 1_000_000.0 / period_us)
    }

    /// Emit a square wave at 50% duty. With `duration_ms > 0` the tone is
    /// stopped after the duration: in place when `blocking`, otherwise by
    /// a one-shot worker (replacing any previous tone worker for the pin).
    pub fn tone(&self, pin: u8, hz: f64, duration_ms: u64, blocking: bool) -> Result<()> {
        let previous = self.inner.registry.record(pin)?.lock().tone.take();
        if let Some(worker) = previous {
            worker.cancel();
        }

        self.reprogram_pwm(pin, hz, PWM_RESOLUTION / 2)?;

        if duration_ms == 0 {
            return Ok(());
        }
        if blocking {
            time::delay(duration_ms);
            return self.no_tone(pin);
        }

        // Weak handle: a forgotten tone worker must not keep the board
        // alive past its last user.
        let weak = Arc::downgrade(&self.inner);
        let worker = Worker::spawn(format!("tone-{pin}"), move |token| {
            if !token.sleep(Duration::from_millis(duration_ms)) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                if let Err(e) = Board::from_inner(inner).no_tone(pin) {
                    log::warn!("pin {pin}: stopping tone failed: {e}");
                }
            }
        })
        .map_err(|e| Error::io("spawn tone worker", pin, e))?;

        self.inner.registry.record(pin)?.lock().tone = Some(worker);
        Ok(())
    }

    /// Stop a tone: cancels the pin's tone worker and drops duty to 0.
    pub fn no_tone(&self, pin: u8) -> Result<()> {
        let previous = self.inner.registry.record(pin)?.lock().tone.take();
        if let Some(worker) = previous {
            worker.cancel();
        }
        self.analog_write(pin, 0)
    }

    /// Common PWM path: validates, cancels the pin's previous soft-PWM
    /// worker, applies the hardware or software strategy, and records the
    /// new parameters once the backend has accepted them.
    fn reprogram_pwm(&self, pin: u8, hz: f64, duty: u32) -> Result<()> {
        if duty >= PWM_RESOLUTION {
            return Err(Error::InvalidDutyCycle { pin, duty });
        }
        // Zero and negative frequencies have no period; a worker fed one
        // would toggle the pin with no sleep between edges.
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::UnsupportedFrequency { hz, divisor: 0 });
        }

        let rec_mutex = self.inner.registry.record(pin)?;
        let (hardware, freq_changed, previous) = {
            let mut rec = rec_mutex.lock();
            if !rec.pwm_configured {
                return Err(Error::NotPwmConfigured(pin));
            }
            (
                rec.mode == Some(PinMode::MmioPwm),
                rec.pwm_hz != hz,
                rec.soft_pwm.take(),
            )
        };

        // Join the old worker before the new configuration takes effect,
        // so its last scheduled edge cannot land afterwards.
        if let Some(worker) = previous {
            worker.cancel();
        }

        if hardware {
            let pwm = self.inner.pwm_backend()?;
            // A pure duty update only touches the data register; the
            // clock divisor sequence is reserved for frequency changes
            if freq_changed {
                pwm.set_frequency(pin, hz, duty)?;
            } else {
                pwm.set_duty(pin, duty)?;
            }
        } else {
            self.apply_soft_pwm(pin, hz, duty)?;
        }

        // Commit after the backend accepted: a rejected frequency must not
        // become the record's notion of the current one.
        let mut rec = rec_mutex.lock();
        rec.pwm_hz = hz;
        rec.duty = duty;
        Ok(())
    }

    fn apply_soft_pwm(&self, pin: u8, hz: f64, duty: u32) -> Result<()> {
        let backend = self.digital_backend(pin)?;

        // Degenerate duties are a static level, no worker
        if duty == 0 {
            return backend.write(pin, Level::Low);
        }
        if duty == PWM_RESOLUTION - 1 {
            return backend.write(pin, Level::High);
        }

        let (high_time, low_time) = soft_pwm_times(hz, duty);
        let worker = Worker::spawn(format!("soft-pwm-{pin}"), move |token| loop {
            if let Err(e) = backend.write(pin, Level::Low) {
                log::error!("pin {pin}: soft PWM write failed: {e}");
                break;
            }
            if !token.sleep(low_time) {
                break;
            }
            if let Err(e) = backend.write(pin, Level::High) {
                log::error!("pin {pin}: soft PWM write failed: {e}");
                break;
            }
            if !token.sleep(high_time) {
                break;
            }
        })
        .map_err(|e| Error::io("spawn soft PWM worker", pin, e))?;

        self.inner.registry.record(pin)?.lock().soft_pwm = Some(worker);
        Ok(())
    }
}
