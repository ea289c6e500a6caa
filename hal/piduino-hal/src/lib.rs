//! Piduino Hardware Abstraction Layer
//!
//! This crate defines the backend traits and shared types that let the same
//! sketch-style application code drive GPIO pins through different access
//! strategies on a Linux host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (sketch-style code)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  piduino-core (Board, registry, PWM)    │
//! └─────────────────────────────────────────┘
//!                     │
//! ┌─────────────────────────────────────────┐
//! │  piduino-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ piduino-hal-  │       │ piduino-hal-  │
//! │    sysfs      │       │   bcm2835     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::GpioBackend`] - Digital pin configuration, read, write, reset
//! - [`pwm::PwmBackend`] - Hardware PWM channel control

pub mod error;
pub mod gpio;
pub mod pwm;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use gpio::{Backend, BitOrder, Edge, GpioBackend, Level, PinMode, Pull, MAX_PINS};
pub use pwm::{PwmBackend, DEFAULT_PWM_HZ, PWM_RESOLUTION};
