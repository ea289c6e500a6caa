//! Edge-triggered interrupt delivery
//!
//! Interrupts always go through the kernel GPIO interface, whichever
//! backend owns the pin's digital I/O: the pin is exported, its edge file
//! armed, and a per-pin worker blocks on `poll` over the value file. A
//! self-pipe gives `detach_interrupt` a way to wake the poll immediately;
//! cancellation never relies on thread-kill semantics.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use piduino_hal::{Edge, Error, Level, Result};
use piduino_hal_sysfs::fs as sysfs;

use crate::board::Board;
use crate::worker::{StopToken, Worker};

/// Events that signal an edge on a sysfs GPIO value file.
const EDGE_EVENTS: libc::c_short = libc::POLLPRI | libc::POLLERR;

/// A poll worker plus the write end of its wakeup pipe.
pub(crate) struct InterruptWorker {
    worker: Option<Worker>,
    wake_tx: OwnedFd,
}

impl InterruptWorker {
    fn spawn<C>(pin: u8, value: File, events: libc::c_short, callback: C) -> io::Result<Self>
    where
        C: FnMut(Level) + Send + 'static,
    {
        let (wake_rx, wake_tx) = pipe()?;
        let worker = Worker::spawn(format!("irq-{pin}"), move |token| {
            poll_loop(pin, value, wake_rx, events, token, callback);
        })?;
        Ok(Self {
            worker: Some(worker),
            wake_tx,
        })
    }

    /// Wake the poll and wait for the worker to exit.
    pub fn cancel(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(worker) = self.worker.take() {
            // One byte on the pipe unblocks the poll; the token stops the loop
            let _ = unsafe { libc::write(self.wake_tx.as_raw_fd(), [1u8].as_ptr().cast(), 1) };
            worker.cancel();
        }
    }
}

impl Drop for InterruptWorker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // Safety: both fds are freshly created and owned here.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

fn poll_loop<C>(
    pin: u8,
    mut value: File,
    wake_rx: OwnedFd,
    events: libc::c_short,
    token: StopToken,
    mut callback: C,
) where
    C: FnMut(Level),
{
    loop {
        let mut fds = [
            libc::pollfd {
                fd: value.as_raw_fd(),
                events,
                revents: 0,
            },
            libc::pollfd {
                fd: wake_rx.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), 2, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            log::error!("pin {pin}: interrupt poll failed: {err}");
            break;
        }
        if token.is_set() || fds[1].revents != 0 {
            break;
        }
        if fds[0].revents == 0 {
            continue;
        }

        // Sysfs wants a rewind before re-reading; pipes used in tests
        // cannot seek, which is fine to ignore.
        let _ = value.seek(SeekFrom::Start(0));
        let mut byte = [0u8; 1];
        match value.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => callback(Level::from(byte[0] == b'1')),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => {
                log::error!("pin {pin}: interrupt value read failed: {e}");
                break;
            }
        }
    }
}

impl Board {
    /// Run `callback` on every matching edge of a pin.
    ///
    /// Replaces any interrupt already attached to the pin; the previous
    /// worker is stopped before the new one starts.
    pub fn attach_interrupt<C>(&self, pin: u8, edge: Edge, callback: C) -> Result<()>
    where
        C: FnMut(Level) + Send + 'static,
    {
        let rec_mutex = self.inner.registry.record(pin)?;
        let root = self.inner.sysfs.root();

        sysfs::export(root, pin)?;
        sysfs::set_edge(root, pin, edge)?;

        let previous = rec_mutex.lock().interrupt.take();
        if let Some(worker) = previous {
            worker.cancel();
        }

        let mut value = sysfs::open_value(root, pin)?;
        // Initial read arms edge detection; the first poll wakeup should
        // be a real edge, not the pre-existing level
        let mut byte = [0u8; 1];
        let _ = value.read(&mut byte);

        let worker = InterruptWorker::spawn(pin, value, EDGE_EVENTS, callback)
            .map_err(|e| Error::io("spawn interrupt worker", pin, e))?;
        rec_mutex.lock().interrupt = Some(worker);
        Ok(())
    }

    /// Stop delivering interrupts for a pin and release it from the
    /// kernel GPIO interface.
    pub fn detach_interrupt(&self, pin: u8) -> Result<()> {
        let previous = self.inner.registry.record(pin)?.lock().interrupt.take();
        if let Some(worker) = previous {
            worker.cancel();
        }
        sysfs::unexport(self.inner.sysfs.root(), pin)
    }
}
