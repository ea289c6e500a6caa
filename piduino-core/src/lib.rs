//! Backend-agnostic board logic
//!
//! The [`Board`] is the entry point for sketch-style code: it owns the pin
//! registry, picks a backend per pin from the mode family passed to
//! [`Board::pin_mode`], and runs the PWM, tone and interrupt worker threads.
//!
//! ```no_run
//! use piduino_core::{Board, Level, PinMode};
//!
//! let board = Board::new();
//! board.pin_mode(17, PinMode::Output)?;
//! board.digital_write(17, Level::High)?;
//! piduino_core::delay(500);
//! board.digital_write(17, Level::Low)?;
//! # Ok::<(), piduino_core::Error>(())
//! ```
//!
//! Pins bound to the kernel backend go through sysfs control files; pins
//! bound to the register backend share two lazily mapped peripheral
//! windows. Process termination drives every configured pin back to a safe
//! input state (see [`Board::reset_all`]).

mod bitbang;
mod board;
mod ehal;
mod interrupt;
mod lifecycle;
mod registry;
mod softpwm;
mod time;
mod worker;

pub use board::Board;
pub use ehal::PinHandle;
pub use time::{delay, delay_microseconds, micros, millis};

// Shared HAL vocabulary, re-exported so sketches need a single import
pub use piduino_hal::{
    BitOrder, Edge, Error, Level, PinMode, Pull, Result, DEFAULT_PWM_HZ, MAX_PINS, PWM_RESOLUTION,
};
