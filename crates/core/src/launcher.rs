//! Starting and reaping subordinate workers
//!
//! The supervisor hands each subordinate its job explicitly at spawn time and
//! never relies on state copied into a child by accident. A `Launcher` decides
//! where that job runs:
//!
//! - [`ForkLauncher`]: a real child process per subordinate (`fork`/`waitpid`)
//! - [`InlineLauncher`]: runs the job on the calling thread, for deterministic
//!   tests of the supervisor without OS processes
//!
//! A job returns the exit code the subordinate should terminate with.

use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use crate::error::EXIT_PANIC;

/// How a subordinate ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
    /// The wait itself failed, so the outcome is unknown
    Unobserved,
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited(0))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exited with status {}", code),
            Termination::Signaled(sig) => write!(f, "terminated by signal {}", sig),
            Termination::Unobserved => f.write_str("exit status could not be collected"),
        }
    }
}

pub trait Launcher {
    type Child;

    /// Start subordinate `index` running `job`
    fn spawn(&mut self, index: u32, job: &dyn Fn() -> i32) -> io::Result<Self::Child>;

    /// Block until `child` has terminated
    fn wait(&mut self, child: Self::Child) -> io::Result<Termination>;
}

/// One forked OS process per subordinate
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkLauncher;

/// A forked subordinate that has not been reaped yet
#[derive(Debug)]
pub struct ForkedChild {
    pid: libc::pid_t,
}

impl Launcher for ForkLauncher {
    type Child = ForkedChild;

    fn spawn(&mut self, _index: u32, job: &dyn Fn() -> i32) -> io::Result<ForkedChild> {
        match unsafe { libc::fork() } {
            -1 => Err(io::Error::last_os_error()),
            0 => {
                restore_default_signals();
                let code = panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or(EXIT_PANIC);
                // Leave without running destructors of state inherited from the parent.
                unsafe { libc::_exit(code) }
            }
            pid => Ok(ForkedChild { pid }),
        }
    }

    fn wait(&mut self, child: ForkedChild) -> io::Result<Termination> {
        let mut status: libc::c_int = 0;
        loop {
            let rc = unsafe { libc::waitpid(child.pid, &mut status, 0) };
            if rc == child.pid {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }

        Ok(if libc::WIFEXITED(status) {
            Termination::Exited(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            Termination::Signaled(libc::WTERMSIG(status))
        } else {
            Termination::Unobserved
        })
    }
}

/// Give a fresh child the default SIGINT/SIGTERM behavior
///
/// The parent may have trapped these for cleanup; a child must still die on
/// Ctrl-C instead of queueing the signal for a handler thread it does not have.
fn restore_default_signals() {
    use std::mem::MaybeUninit;

    for sig in [libc::SIGINT, libc::SIGTERM] {
        unsafe {
            let mut action: libc::sigaction = MaybeUninit::zeroed().assume_init();
            action.sa_sigaction = libc::SIG_DFL;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(sig, &action, std::ptr::null_mut());
        }
    }
}

/// Runs each job to completion inside `spawn`
#[derive(Debug, Default)]
pub struct InlineLauncher;

impl Launcher for InlineLauncher {
    type Child = Termination;

    fn spawn(&mut self, _index: u32, job: &dyn Fn() -> i32) -> io::Result<Termination> {
        Ok(match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(code) => Termination::Exited(code),
            Err(_) => Termination::Exited(EXIT_PANIC),
        })
    }

    fn wait(&mut self, child: Termination) -> io::Result<Termination> {
        Ok(child)
    }
}
