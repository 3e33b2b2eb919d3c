//! POSIX named semaphore used as the cross-process merge lock
//!
//! The semaphore is identified by name, not by an in-memory object: the top
//! level process creates it and every subordinate opens it again by name.
//! Only the creating handle unlinks the name when dropped.
//!
//! To inspect live semaphores on Linux:
//! ```bash
//! ls -al /dev/shm/sem.*
//! ```

use std::ffi::CString;
use std::io;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, error};

use crate::error::{Error, Result};

/// Attempts at finding an unused name before giving up
const NAME_ATTEMPTS: u32 = 16;

static NEXT_NAME: AtomicU32 = AtomicU32::new(0);

/// A binary named semaphore
#[derive(Debug)]
pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
    owner: bool,
}

// sem_wait/sem_post are thread-safe on a shared sem_t.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a fresh semaphore with a name unique to this process
    pub fn create_unique() -> Result<Self> {
        let mut last_err = None;
        for _ in 0..NAME_ATTEMPTS {
            let name = format!(
                "/approx_pi.{}.{}",
                std::process::id(),
                NEXT_NAME.fetch_add(1, Ordering::Relaxed)
            );
            match Self::create(&name) {
                Err(Error::MutexUnavailable { source, .. })
                    if source.raw_os_error() == Some(libc::EEXIST) =>
                {
                    debug!(name = %name, "semaphore name taken, trying next");
                    last_err = Some(Error::MutexUnavailable { name, source });
                }
                other => return other,
            }
        }
        Err(last_err.unwrap_or_else(|| Error::MutexUnavailable {
            name: "/approx_pi".to_string(),
            source: io::Error::from_raw_os_error(libc::EEXIST),
        }))
    }

    /// Create a new semaphore with count 1; fails if `name` already exists
    pub fn create(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        let mode: libc::c_uint = 0o600;
        let initial: libc::c_uint = 1;
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode,
                initial,
            )
        };
        Self::from_raw(sem, name, true)
    }

    /// Open an existing semaphore by name
    pub fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        Self::from_raw(sem, name, false)
    }

    fn from_raw(sem: *mut libc::sem_t, name: &str, owner: bool) -> Result<Self> {
        if sem == libc::SEM_FAILED {
            return Err(Error::MutexUnavailable {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }
        let sem = NonNull::new(sem).ok_or_else(|| Error::MutexUnavailable {
            name: name.to_string(),
            source: io::Error::other("sem_open returned null"),
        })?;
        Ok(Self {
            sem,
            name: name.to_string(),
            owner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the semaphore is held; released when the guard drops
    pub fn acquire(&self) -> Result<SemaphoreGuard<'_>> {
        loop {
            if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                return Ok(SemaphoreGuard { sem: self });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(Error::MutexUnavailable {
                    name: self.name.clone(),
                    source: err,
                });
            }
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem.as_ptr());
        }
        if self.owner
            && let Err(e) = unlink(&self.name)
        {
            error!(name = %self.name, "failed to unlink semaphore: {}", e);
        }
    }
}

/// Holds the semaphore until dropped
#[derive(Debug)]
pub struct SemaphoreGuard<'a> {
    sem: &'a NamedSemaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if unsafe { libc::sem_post(self.sem.sem.as_ptr()) } != 0 {
            error!(
                name = %self.sem.name,
                "sem_post failed: {}",
                io::Error::last_os_error()
            );
        }
    }
}

/// Remove a semaphore name from the system
///
/// Handles that are already open stay usable until closed.
pub fn unlink(name: &str) -> io::Result<()> {
    let c_name = CString::new(name)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if unsafe { libc::sem_unlink(c_name.as_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|e| Error::MutexUnavailable {
        name: name.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidInput, e),
    })
}
