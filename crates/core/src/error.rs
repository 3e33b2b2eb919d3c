//! Engine errors
//!
//! One error enum covers the whole run. Subordinate processes cannot return
//! an `Error` to their supervisor, so each variant also maps to the exit code
//! a forked worker leaves with (see [`Error::exit_code`]).

use std::fmt;
use std::io;

use thiserror::Error;

use crate::launcher::Termination;

/// Exit code of a subordinate whose job panicked.
pub const EXIT_PANIC: i32 = 101;

/// Which level of the worker hierarchy an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Process,
    Thread,
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerKind::Process => f.write_str("process"),
            WorkerKind::Thread => f.write_str("thread"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A partition across zero workers was requested
    #[error("cannot partition {total} iterations across zero workers")]
    InvalidPartition { total: u64 },

    /// The named semaphore could not be created, opened or waited on
    #[error("semaphore {name} is unavailable: {source}")]
    MutexUnavailable {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The shared accumulator mapping could not be created
    #[error("failed to map shared accumulator: {0}")]
    SharedMemory(#[source] io::Error),

    /// A worker process or thread could not be created
    #[error("failed to spawn worker {kind} {index}: {source}")]
    SpawnFailure {
        kind: WorkerKind,
        index: u32,
        #[source]
        source: io::Error,
    },

    /// A subordinate process did not exit cleanly
    #[error("worker process {index} failed: {termination}")]
    WorkerFailed { index: u32, termination: Termination },

    /// A worker thread panicked before merging its partial sum
    #[error("worker thread {index} panicked: {message}")]
    ThreadPanicked { index: u32, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Exit code used by a subordinate process (and the CLI) for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPartition { .. } => 1,
            Error::MutexUnavailable { .. } | Error::SharedMemory(_) => 2,
            Error::SpawnFailure { .. } => 3,
            Error::WorkerFailed { .. } | Error::ThreadPanicked { .. } => 4,
        }
    }
}

/// Format a panic payload into an error message
pub fn format_panic_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_panic_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("panic message");
        assert_eq!(format_panic_payload(payload.as_ref()), "panic message");

        let payload: Box<dyn std::any::Any + Send> = Box::new("owned panic".to_string());
        assert_eq!(format_panic_payload(payload.as_ref()), "owned panic");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(format_panic_payload(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        let mutex = Error::MutexUnavailable {
            name: "/x".to_string(),
            source: io::Error::from_raw_os_error(libc::ENOENT),
        };
        let spawn = Error::SpawnFailure {
            kind: WorkerKind::Process,
            index: 0,
            source: io::Error::from_raw_os_error(libc::EAGAIN),
        };
        let failed = Error::WorkerFailed {
            index: 2,
            termination: Termination::Exited(1),
        };

        assert_eq!(Error::InvalidPartition { total: 5 }.exit_code(), 1);
        assert_eq!(mutex.exit_code(), 2);
        assert_eq!(spawn.exit_code(), 3);
        assert_eq!(failed.exit_code(), 4);
        assert_ne!(EXIT_PANIC, 0);
    }

    #[test]
    fn test_display_names_the_worker() {
        let err = Error::WorkerFailed {
            index: 3,
            termination: Termination::Signaled(libc::SIGKILL),
        };
        let msg = err.to_string();
        assert!(msg.contains("worker process 3"), "got: {msg}");

        let err = Error::SpawnFailure {
            kind: WorkerKind::Thread,
            index: 1,
            source: io::Error::other("no threads left"),
        };
        assert!(err.to_string().starts_with("failed to spawn worker thread 1"));
    }
}
