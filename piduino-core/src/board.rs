//! The board: pin registry plus backend dispatch
//!
//! A `Board` is a cheap cloneable handle; all clones share one registry
//! and one set of backends. The register-mapped backends are acquired
//! lazily, once per board, on the first use of an `Mmio*` mode.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use piduino_hal::{
    Backend, Error, GpioBackend, Level, PinMode, PwmBackend, Result, DEFAULT_PWM_HZ,
};
use piduino_hal_bcm2835::{Bcm2835Gpio, Bcm2835Pwm};
use piduino_hal_sysfs::{fs as sysfs, SysfsGpio};

use crate::lifecycle;
use crate::registry::Registry;
use crate::time;

/// Lazily acquired register backends. A single slot struct (one mutex)
/// keeps the GPIO and PWM/clock maps consistent without lock-ordering
/// concerns between them.
struct BackendSlots {
    /// Concrete GPIO map, kept so the PWM backend can route pins.
    bcm: Option<Arc<Bcm2835Gpio>>,
    mmio: Option<Arc<dyn GpioBackend>>,
    pwm: Option<Arc<dyn PwmBackend>>,
}

pub(crate) struct Inner {
    pub registry: Registry,
    pub sysfs: Arc<SysfsGpio>,
    kernel: Arc<dyn GpioBackend>,
    slots: Mutex<BackendSlots>,
    pub exit_callback: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Inner {
    /// GPIO register map, mapped on first use. A failed mapping is
    /// returned as a resource error; there is no fallback backend.
    pub fn mmio_gpio(&self) -> Result<Arc<dyn GpioBackend>> {
        let mut slots = self.slots.lock();
        if let Some(mmio) = slots.mmio.clone() {
            return Ok(mmio);
        }
        let bcm = Arc::new(Bcm2835Gpio::map()?);
        let mmio: Arc<dyn GpioBackend> = bcm.clone();
        slots.bcm = Some(bcm);
        slots.mmio = Some(mmio.clone());
        Ok(mmio)
    }

    /// PWM/clock register map, mapped on first use. Maps the GPIO window
    /// first if needed, since the PWM controller routes pins through it.
    pub fn pwm_backend(&self) -> Result<Arc<dyn PwmBackend>> {
        let mut slots = self.slots.lock();
        if let Some(pwm) = slots.pwm.clone() {
            return Ok(pwm);
        }
        let bcm = match slots.bcm.clone() {
            Some(bcm) => bcm,
            None => {
                let bcm = Arc::new(Bcm2835Gpio::map()?);
                slots.bcm = Some(bcm.clone());
                slots.mmio = Some(bcm.clone());
                bcm
            }
        };
        let pwm: Arc<dyn PwmBackend> = Arc::new(Bcm2835Pwm::map(bcm)?);
        slots.pwm = Some(pwm.clone());
        Ok(pwm)
    }

    /// Backend handle for a pin's recorded assignment.
    pub fn backend_for(&self, backend: Backend) -> Result<Arc<dyn GpioBackend>> {
        match backend {
            Backend::Kernel => Ok(self.kernel.clone()),
            Backend::Mmio => self.mmio_gpio(),
        }
    }
}

/// Entry point for sketch-style digital I/O.
#[derive(Clone)]
pub struct Board {
    pub(crate) inner: Arc<Inner>,
}

impl Board {
    /// A board over the real kernel interface and SoC registers.
    ///
    /// Captures the process timebase and installs the termination hook:
    /// on SIGINT/SIGHUP/SIGTERM, every configured pin is reset to a safe
    /// input state (or a registered exit callback runs instead) and the
    /// process exits with the signal number as status.
    pub fn new() -> Board {
        let board = Self::with_sysfs_root(sysfs::DEFAULT_ROOT);
        time::init();
        lifecycle::install(&board.inner);
        board
    }

    /// A board whose kernel backend uses an alternate sysfs root.
    ///
    /// No termination hook is installed; tests drive a fake tree and call
    /// [`Board::reset_all`] directly.
    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Board {
        let sysfs = Arc::new(SysfsGpio::with_root(root));
        Self::assemble(sysfs.clone(), sysfs, None, None)
    }

    /// A board over caller-supplied backends. Used by tests and by boards
    /// whose register layout differs from the built-in one. The interrupt
    /// subsystem still arms pins through the default sysfs tree; see
    /// [`Board::with_backends_at`] to redirect it.
    pub fn with_backends(
        kernel: Arc<dyn GpioBackend>,
        mmio: Arc<dyn GpioBackend>,
        pwm: Arc<dyn PwmBackend>,
    ) -> Board {
        Self::with_backends_at(sysfs::DEFAULT_ROOT, kernel, mmio, pwm)
    }

    /// [`Board::with_backends`] with an alternate sysfs root, so interrupt
    /// arming and teardown can run against a fake tree alongside injected
    /// backends.
    pub fn with_backends_at(
        root: impl Into<PathBuf>,
        kernel: Arc<dyn GpioBackend>,
        mmio: Arc<dyn GpioBackend>,
        pwm: Arc<dyn PwmBackend>,
    ) -> Board {
        let sysfs = Arc::new(SysfsGpio::with_root(root));
        Self::assemble(sysfs, kernel, Some(mmio), Some(pwm))
    }

    fn assemble(
        sysfs: Arc<SysfsGpio>,
        kernel: Arc<dyn GpioBackend>,
        mmio: Option<Arc<dyn GpioBackend>>,
        pwm: Option<Arc<dyn PwmBackend>>,
    ) -> Board {
        Board {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                sysfs,
                kernel,
                slots: Mutex::new(BackendSlots {
                    bcm: None,
                    mmio,
                    pwm,
                }),
                exit_callback: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Board {
        Board { inner }
    }

    /// Configure a pin. The mode family picks the backend; any previous
    /// PWM assignment for the pin is stopped and zeroed first.
    pub fn pin_mode(&self, pin: u8, mode: PinMode) -> Result<()> {
        let rec_mutex = self.inner.registry.record(pin)?;

        // Stop PWM drive before the pin changes identity. Workers are
        // joined outside the record lock; they never take it themselves.
        let (soft, tone) = {
            let mut rec = rec_mutex.lock();
            (rec.soft_pwm.take(), rec.tone.take())
        };
        if let Some(worker) = soft {
            worker.cancel();
        }
        if let Some(worker) = tone {
            worker.cancel();
        }

        if mode.is_pwm() {
            let pwm = self.inner.pwm_backend()?;
            pwm.configure(pin)?;
            pwm.set_frequency(pin, DEFAULT_PWM_HZ, 0)?;
        } else {
            self.inner.backend_for(mode.backend())?.configure(pin, mode)?;
        }

        let mut rec = rec_mutex.lock();
        rec.backend = Some(mode.backend());
        rec.mode = Some(mode);
        rec.digital_configured = true;
        // Output-capable pins accept analog_write: hardware PWM on the
        // dedicated mode, a soft-PWM worker otherwise.
        rec.pwm_configured = mode.is_output();
        rec.duty = 0;
        rec.pwm_hz = DEFAULT_PWM_HZ;
        Ok(())
    }

    /// Drive a configured pin to a logic level.
    pub fn digital_write(&self, pin: u8, level: Level) -> Result<()> {
        self.digital_backend(pin)?.write(pin, level)
    }

    /// Read a configured pin's logic level.
    pub fn digital_read(&self, pin: u8) -> Result<Level> {
        self.digital_backend(pin)?.read(pin)
    }

    /// Register a callback that replaces the safety reset when the process
    /// is terminated by a signal.
    pub fn set_exit_callback<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.inner.exit_callback.lock() = Some(Box::new(callback));
    }

    /// Drive every pin ever configured for digital or PWM use back to its
    /// backend's input state, cancelling all workers. Invoked by the
    /// termination hook; also available to graceful shutdown paths.
    pub fn reset_all(&self) {
        lifecycle::reset_all(&self.inner);
    }

    pub(crate) fn digital_backend(&self, pin: u8) -> Result<Arc<dyn GpioBackend>> {
        let rec = self.inner.registry.record(pin)?.lock();
        if !rec.digital_configured {
            return Err(Error::NotConfigured(pin));
        }
        match rec.backend {
            Some(backend) => self.inner.backend_for(backend),
            None => Err(Error::NotConfigured(pin)),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
