//! Shared accumulator cell
//!
//! A single `Real` in an anonymous `MAP_SHARED` mapping. The mapping is made
//! before any subordinate is forked, so parent and children address the same
//! physical page; private memory would leave every process with its own copy.
//!
//! ```text
//!  parent ──fork──► child 0 ──┐
//!    │    ──fork──► child 1 ──┤  merge under NamedSemaphore
//!    │                        ▼
//!    └──────────────► [ Real ]  (MAP_SHARED | MAP_ANONYMOUS)
//! ```
//!
//! `merge` is the only write path and always holds the semaphore.

use std::io;
use std::mem::size_of;
use std::ptr::{self, NonNull};

use crate::error::{Error, Result};
use crate::semaphore::NamedSemaphore;
use crate::series::Real;

#[derive(Debug)]
pub struct SharedAccumulator {
    cell: NonNull<Real>,
}

// Writes only happen through `merge`, under the named semaphore.
unsafe impl Send for SharedAccumulator {}
unsafe impl Sync for SharedAccumulator {}

impl SharedAccumulator {
    /// Map a zeroed cell visible to this process and all later forks
    pub fn new() -> Result<Self> {
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size_of::<Real>(),
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(Error::SharedMemory(io::Error::last_os_error()));
        }
        let cell = NonNull::new(addr.cast::<Real>())
            .ok_or_else(|| Error::SharedMemory(io::Error::other("mmap returned null")))?;
        unsafe { cell.as_ptr().write_volatile(0.0) };
        Ok(Self { cell })
    }

    /// Add a finished partial sum while holding `lock`
    pub fn merge(&self, lock: &NamedSemaphore, partial: Real) -> Result<()> {
        let _guard = lock.acquire()?;
        let p = self.cell.as_ptr();
        unsafe { p.write_volatile(p.read_volatile() + partial) };
        Ok(())
    }

    /// Current value; meaningful once no writer can still be running
    pub fn read(&self) -> Real {
        unsafe { self.cell.as_ptr().read_volatile() }
    }
}

impl Drop for SharedAccumulator {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.cell.as_ptr().cast(), size_of::<Real>());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_at_zero() {
        let acc = SharedAccumulator::new().unwrap();
        assert_eq!(acc.read(), 0.0);
    }

    #[test]
    fn test_merge_adds() {
        let acc = SharedAccumulator::new().unwrap();
        let lock = NamedSemaphore::create_unique().unwrap();

        acc.merge(&lock, 0.25).unwrap();
        acc.merge(&lock, -1.0).unwrap();
        assert_eq!(acc.read(), -0.75);
    }

    #[test]
    fn test_concurrent_merges_are_not_lost() {
        let acc = SharedAccumulator::new().unwrap();
        let lock = NamedSemaphore::create_unique().unwrap();

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..500 {
                        acc.merge(&lock, 1.0).unwrap();
                    }
                });
            }
        });
        assert_eq!(acc.read(), 4000.0);
    }
}
