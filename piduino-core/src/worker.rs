//! Per-pin worker threads and their cancellation tokens
//!
//! Every worker (soft PWM, tone timeout, interrupt poll) is owned by the
//! pin record that spawned it. Replacing or clearing that slot cancels the
//! previous worker synchronously, so at most one worker ever drives a pin.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Cooperative stop signal handed to a worker's closure.
pub(crate) struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    /// `true` once the owner has requested cancellation.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sleep for up to `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the token was set before the full duration
    /// elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            // Cancellation unparks us; spurious wakeups loop back
            thread::park_timeout(deadline - now);
        }
    }
}

/// A cancellable worker thread.
pub(crate) struct Worker {
    flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn<F>(name: String, body: F) -> io::Result<Worker>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let flag = Arc::new(AtomicBool::new(false));
        let token = StopToken { flag: flag.clone() };
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || body(token))?;
        Ok(Worker {
            flag,
            handle: Some(handle),
        })
    }

    /// Signal the worker to stop and wait for it to finish.
    pub fn cancel(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            // A worker ending its own life (tone timeout firing no_tone)
            // must not join itself.
            if thread::current().id() != handle.thread().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.finish();
    }
}
