//! Kernel sysfs GPIO backend
//!
//! Drives pins through `/sys/class/gpio`: export, direction, value and edge
//! control files. Slower than register access but works on any Linux SBC
//! with a GPIO controller, and requires no access to `/dev/mem`.
//!
//! The sysfs root is configurable so tests can point the backend at a fake
//! tree built with `tempfile`.

pub mod fs;
mod gpio;

pub use gpio::SysfsGpio;
