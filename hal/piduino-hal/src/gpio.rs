//! GPIO types and the digital backend trait
//!
//! A pin is addressed by its SoC index and is bound to one of two access
//! strategies when it is first configured: the kernel's file-based GPIO
//! interface, or direct memory-mapped peripheral registers.

use crate::error::Result;

/// Number of GPIO pins on the modeled SoC (BCM2835). The subset exposed on
/// a board header depends on the board.
pub const MAX_PINS: u8 = 54;

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// `true` for `High`.
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// The opposite level.
    pub fn toggled(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Built-in pull resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Off,
    Up,
    Down,
}

/// Digital transition that triggers an interrupt callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Bit ordering for bit-banged serial transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

/// Access strategy a pin is bound to at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Kernel file-based GPIO interface (portable, slower).
    Kernel,
    /// Memory-mapped peripheral registers (SoC-specific, fast, native PWM).
    Mmio,
}

/// Pin mode constants.
///
/// The plain family selects the kernel backend; the `Mmio*` family selects
/// the register backend. The family is how a pin picks its backend, so the
/// two sets are deliberately separate variants rather than a (mode, backend)
/// pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
    InputPullUp,
    InputPullDown,
    MmioInput,
    MmioOutput,
    MmioInputPullUp,
    MmioInputPullDown,
    /// Hardware PWM output. Only valid on pins wired to a PWM channel.
    MmioPwm,
}

impl PinMode {
    /// Backend family this mode binds the pin to.
    pub fn backend(self) -> Backend {
        match self {
            PinMode::Input | PinMode::Output | PinMode::InputPullUp | PinMode::InputPullDown => {
                Backend::Kernel
            }
            _ => Backend::Mmio,
        }
    }

    /// `true` if the pin is driven by the process (output or PWM).
    pub fn is_output(self) -> bool {
        matches!(
            self,
            PinMode::Output | PinMode::MmioOutput | PinMode::MmioPwm
        )
    }

    /// `true` for the hardware PWM mode.
    pub fn is_pwm(self) -> bool {
        self == PinMode::MmioPwm
    }

    /// Requested pull resistor state.
    pub fn pull(self) -> Pull {
        match self {
            PinMode::InputPullUp | PinMode::MmioInputPullUp => Pull::Up,
            PinMode::InputPullDown | PinMode::MmioInputPullDown => Pull::Down,
            _ => Pull::Off,
        }
    }
}

/// Digital I/O backend
///
/// Implementations handle the actual pin access for one strategy. All
/// methods take `&self`; implementations use interior mutability and are
/// shared across worker threads behind an `Arc`.
pub trait GpioBackend: Send + Sync {
    /// Configure the pin for the given mode.
    ///
    /// Triggers any lazy per-backend resource acquisition (kernel export,
    /// register mapping) on first use.
    fn configure(&self, pin: u8, mode: PinMode) -> Result<()>;

    /// Drive the pin to a logic level.
    fn write(&self, pin: u8, level: Level) -> Result<()>;

    /// Read the pin's current logic level.
    fn read(&self, pin: u8) -> Result<Level>;

    /// Return the pin to a safe (input, no pull) state.
    fn reset(&self, pin: u8) -> Result<()>;
}
