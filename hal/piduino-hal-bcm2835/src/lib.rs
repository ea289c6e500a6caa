//! BCM2835 memory-mapped register backend
//!
//! Drives pins by writing the SoC's GPIO peripheral registers directly
//! through a `/dev/mem` (or `/dev/gpiomem`) mapping. Much lower latency
//! than the kernel file interface, and the only backend with access to the
//! hardware PWM controller.
//!
//! Register blocks are modeled as owned, bounds-checked windows of volatile
//! word cells ([`mmap::PeripheralMap`]) with named accessor methods; no raw
//! offset arithmetic appears at call sites.

mod gpio;
mod mmap;
mod pwm;

pub use gpio::Bcm2835Gpio;
pub use mmap::PeripheralMap;
pub use pwm::Bcm2835Pwm;

/// Physical base of the BCM2835 peripheral window.
pub const PERIPHERAL_BASE: u64 = 0x2000_0000;

/// Offsets of the peripheral blocks within the physical address space.
pub(crate) const GPIO_BASE: u64 = PERIPHERAL_BASE + 0x20_0000;
pub(crate) const PWM_BASE: u64 = PERIPHERAL_BASE + 0x20_C000;
pub(crate) const CLOCK_BASE: u64 = PERIPHERAL_BASE + 0x10_1000;

/// Length of each mapped block in bytes (one page).
pub(crate) const BLOCK_LEN: usize = 4096;
