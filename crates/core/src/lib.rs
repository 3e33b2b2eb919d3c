//! approx-pi: a process-vs-thread throughput benchmark
//!
//! Approximates π with the Leibniz series, splitting the iteration count
//! across a two-level hierarchy of OS processes and per-process threads.
//! Every worker sums its own contiguous range and merges the partial sum into
//! one accumulator that lives in shared memory and is guarded by a POSIX named
//! semaphore, so the merge is exclusive across processes as well as threads.
//!
//! # Modules
//!
//! - `partition`: contiguous range splitting (`WorkRange`, `WorkerId`)
//! - `series`: the alternating series and the final π formula
//! - `accumulator`: the shared-memory accumulator cell
//! - `semaphore`: named cross-process lock
//! - `sink`: per-worker diagnostic logs
//! - `config`: run and output configuration
//! - `worker`: compute a range, then merge it
//! - `threads`: per-process thread fan-out
//! - `launcher`: how subordinate workers are started and reaped
//! - `supervisor`: the top-level run
//! - `error`: error type and exit codes

pub mod accumulator;
pub mod config;
pub mod error;
pub mod launcher;
pub mod partition;
pub mod semaphore;
pub mod series;
pub mod sink;
pub mod supervisor;
pub mod threads;
pub mod worker;

pub use accumulator::SharedAccumulator;
pub use config::{OutputConfig, RunConfig, Sampling};
pub use error::{Error, Result, WorkerKind};
pub use launcher::{ForkLauncher, InlineLauncher, Launcher, Termination};
pub use partition::{WorkRange, WorkerId, partition};
pub use semaphore::NamedSemaphore;
pub use series::{REFERENCE_PI, Real, approximate_pi, sequential_pi};
pub use sink::{DiagnosticSink, FileSink};
pub use supervisor::{Approximation, ProcessSupervisor};
