//! Termination handling and the safety reset
//!
//! No output may stay energized after the controlling process disappears.
//! A `signal-hook` iterator thread receives SIGINT/SIGHUP/SIGTERM and runs
//! the reset (or a user exit callback) on that ordinary thread, then exits
//! with the signal number as status. The async-signal context itself does
//! nothing beyond queueing, so the reset is free to lock and join.

use std::process;
use std::sync::{Arc, Once, OnceLock, Weak};
use std::thread;

use parking_lot::Mutex;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::board::Inner;

/// The board the termination hook resets. A weak handle: the hook must
/// not keep a dropped board alive.
static TARGET: OnceLock<Mutex<Weak<Inner>>> = OnceLock::new();
static INSTALL: Once = Once::new();

pub(crate) fn install(inner: &Arc<Inner>) {
    let target = TARGET.get_or_init(|| Mutex::new(Weak::new()));
    *target.lock() = Arc::downgrade(inner);

    INSTALL.call_once(|| {
        let mut signals = match Signals::new([SIGINT, SIGHUP, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                log::error!("installing termination handler failed: {e}");
                return;
            }
        };
        let spawned = thread::Builder::new()
            .name("piduino-signals".into())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    terminate(signal);
                }
            });
        if let Err(e) = spawned {
            log::error!("spawning signal thread failed: {e}");
        }
    });
}

fn terminate(signal: i32) -> ! {
    log::debug!("termination signal {signal}, running safety reset");
    if let Some(target) = TARGET.get() {
        if let Some(inner) = target.lock().upgrade() {
            let callback = inner.exit_callback.lock().take();
            match callback {
                // A registered exit callback replaces the built-in reset
                Some(callback) => callback(),
                None => reset_all(&inner),
            }
        }
    }
    process::exit(signal);
}

/// Drive every pin ever configured for digital or PWM use back to its
/// backend's input state. Workers are cancelled first so nothing re-drives
/// a pin after its reset.
pub(crate) fn reset_all(inner: &Inner) {
    for (pin, rec_mutex) in inner.registry.iter() {
        let (configured, backend, soft, tone, interrupt) = {
            let mut rec = rec_mutex.lock();
            (
                rec.digital_configured || rec.pwm_configured,
                rec.backend,
                rec.soft_pwm.take(),
                rec.tone.take(),
                rec.interrupt.take(),
            )
        };

        if let Some(worker) = soft {
            worker.cancel();
        }
        if let Some(worker) = tone {
            worker.cancel();
        }
        if let Some(worker) = interrupt {
            worker.cancel();
        }

        if !configured {
            continue;
        }
        let Some(backend) = backend else { continue };

        match inner.backend_for(backend) {
            Ok(backend) => {
                if let Err(e) = backend.reset(pin) {
                    log::warn!("pin {pin}: safety reset failed: {e}");
                }
            }
            Err(e) => log::warn!("pin {pin}: no backend for safety reset: {e}"),
        }
    }
}
