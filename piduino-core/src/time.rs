//! Process timebase
//!
//! Elapsed time is measured from a single monotonic reference captured
//! once per process: at `Board::new`, or on the first query if no board
//! exists yet.

use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

static START: OnceLock<Instant> = OnceLock::new();

fn start() -> Instant {
    *START.get_or_init(Instant::now)
}

/// Pin the timebase reference to now, if not already captured.
pub(crate) fn init() {
    start();
}

/// Milliseconds since process start.
pub fn millis() -> u64 {
    start().elapsed().as_millis() as u64
}

/// Microseconds since process start.
pub fn micros() -> u64 {
    start().elapsed().as_micros() as u64
}

/// Sleep the calling thread. Resolution is whatever the OS scheduler
/// grants; this is a lower bound, not a precise wait.
pub fn delay(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Sleep the calling thread, microsecond granularity.
pub fn delay_microseconds(us: u64) {
    thread::sleep(Duration::from_micros(us));
}
