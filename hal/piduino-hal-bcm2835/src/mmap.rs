//! Owned volatile register windows
//!
//! A `PeripheralMap` is a fixed-size block of 32-bit cells, either mapped
//! from a physical-memory character device or (for tests) backed by plain
//! heap memory. All access is volatile and bounds-checked; the higher
//! layers address cells by named register index only.

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr;

use piduino_hal::{Error, Result};

#[derive(Debug)]
enum Region {
    /// `mmap`ed device memory, released with `munmap`.
    Mapped,
    /// Heap-backed block used by unit tests.
    Owned,
}

/// A mapped peripheral register block.
#[derive(Debug)]
pub struct PeripheralMap {
    base: *mut u32,
    words: usize,
    region: Region,
}

// The raw pointer targets device memory (or a leaked heap block) that lives
// as long as the map itself; cells are accessed volatilely.
unsafe impl Send for PeripheralMap {}
unsafe impl Sync for PeripheralMap {}

impl PeripheralMap {
    /// Map `len` bytes of physical memory at `offset` from `device`.
    ///
    /// `offset` must be page-aligned. The device stays open only for the
    /// duration of the `mmap` call.
    pub fn map(device: &str, offset: u64, len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(|e| Error::MemoryMap {
                device: device.to_string(),
                source: e,
            })?;

        // Safety: length and fd are valid; the kernel validates the offset.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset as libc::off_t,
            )
        };

        if base == libc::MAP_FAILED {
            return Err(Error::MemoryMap {
                device: device.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self {
            base: base as *mut u32,
            words: len / 4,
            region: Region::Mapped,
        })
    }

    /// A zero-filled in-memory block. Lets register sequencing be unit
    /// tested without hardware.
    pub fn in_memory(words: usize) -> Self {
        let block = vec![0u32; words].into_boxed_slice();
        Self {
            base: Box::leak(block).as_mut_ptr(),
            words,
            region: Region::Owned,
        }
    }

    /// Volatile read of the cell at word index `idx`.
    pub fn read(&self, idx: usize) -> u32 {
        assert!(idx < self.words, "register index {idx} out of range");
        // Safety: bounds checked above; base is valid for self.words cells.
        unsafe { ptr::read_volatile(self.base.add(idx)) }
    }

    /// Volatile write of the cell at word index `idx`.
    pub fn write(&self, idx: usize, value: u32) {
        assert!(idx < self.words, "register index {idx} out of range");
        // Safety: bounds checked above; base is valid for self.words cells.
        unsafe { ptr::write_volatile(self.base.add(idx), value) }
    }

    /// Number of word cells in the block.
    pub fn len(&self) -> usize {
        self.words
    }

    /// `true` for a zero-length block.
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}

impl Drop for PeripheralMap {
    fn drop(&mut self) {
        match self.region {
            Region::Mapped => {
                // Safety: base/words describe the original mapping.
                unsafe {
                    libc::munmap(self.base as *mut libc::c_void, self.words * 4);
                }
            }
            Region::Owned => {
                // Safety: reconstructs the block leaked in `in_memory`.
                unsafe {
                    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                        self.base, self.words,
                    )));
                }
            }
        }
    }
}
