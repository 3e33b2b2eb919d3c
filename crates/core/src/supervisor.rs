//! Top-level run: spawn, compute, reap, finalize
//!
//! ```text
//! Planning ─► Spawning ─► AwaitingAll ─► Finalizing ─► Completed
//!                 │             │
//!                 └─────────────┴──────────────────────► Failed(index)
//! ```
//!
//! `processes - 1` subordinates are launched, each with its range passed
//! explicitly; the calling process is the last worker group and sums its own
//! share (which carries the remainder) in place. Subordinates are then waited
//! for in index order. A failed subordinate is not retried: its partial sum is
//! lost and the run is reported as failed. The accumulator and semaphore are
//! released when the supervisor is consumed, whatever the outcome.

use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::accumulator::SharedAccumulator;
use crate::config::RunConfig;
use crate::error::{Error, Result, WorkerKind};
use crate::launcher::{Launcher, Termination};
use crate::partition::{WorkRange, partition};
use crate::semaphore::NamedSemaphore;
use crate::series::{self, Real};
use crate::threads;
use crate::worker::ProcessContext;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Planning,
    Spawning,
    AwaitingAll,
    Finalizing,
    Completed,
    /// Process index whose failure ended the run
    Failed(u32),
}

/// Result of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approximation {
    /// `4 * (1 + series_sum)`
    pub pi: Real,
    /// Merged sum of every worker's range
    pub series_sum: Real,
    /// Wall clock from first spawn to final read
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct ProcessSupervisor {
    config: RunConfig,
    accumulator: SharedAccumulator,
    lock: NamedSemaphore,
    phase: Phase,
}

impl ProcessSupervisor {
    /// Validate the plan and create the shared resources
    ///
    /// Fails before any work starts if the process count is zero or the
    /// semaphore or shared mapping cannot be created.
    pub fn new(config: RunConfig) -> Result<Self> {
        partition(config.iterations, config.processes)?;
        let lock = NamedSemaphore::create_unique()?;
        let accumulator = SharedAccumulator::new()?;
        debug!(semaphore = lock.name(), "shared resources ready");
        Ok(Self {
            config,
            accumulator,
            lock,
            phase: Phase::Planning,
        })
    }

    /// Name of the merge semaphore, for cleanup on abnormal exit
    pub fn semaphore_name(&self) -> &str {
        self.lock.name()
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "supervisor phase");
        if let Phase::Failed(index) = phase {
            error!(process = index, during = ?self.phase, "run failed");
        }
        self.phase = phase;
    }

    fn fail(&mut self, index: u32, err: Error) -> Error {
        self.enter(Phase::Failed(index));
        err
    }

    fn context<'a>(&'a self, lock: &'a NamedSemaphore) -> ProcessContext<'a> {
        ProcessContext {
            accumulator: &self.accumulator,
            lock,
            output: &self.config.output,
            total: self.config.iterations,
        }
    }

    /// Sum one process's share, merging under that process's own lock handle
    fn run_group(&self, index: u32, range: WorkRange) -> Result<()> {
        // Every process, the calling one included, opens the lock by name
        // rather than trusting a handle copied across fork.
        let lock = NamedSemaphore::open(self.lock.name())?;
        threads::run_process(index, range, self.config.threads, &self.context(&lock))
    }

    /// Body of a subordinate; returns its exit code
    fn run_subordinate(&self, index: u32, range: WorkRange) -> i32 {
        match self.run_group(index, range) {
            Ok(()) => 0,
            Err(e) => {
                error!(process = index, "worker process failed: {}", e);
                e.exit_code()
            }
        }
    }

    /// Run every worker to completion and read the merged result
    pub fn run<L: Launcher>(mut self, launcher: &mut L) -> Result<Approximation> {
        let RunConfig {
            iterations,
            processes,
            threads: thread_count,
            ..
        } = self.config;
        let ranges = WorkRange::new(0, iterations).split(processes)?;
        let own_index = processes - 1;
        let own_range = ranges[ranges.len() - 1];

        info!(iterations, processes, threads = thread_count, "starting run");
        let started = Instant::now();
        self.enter(Phase::Spawning);

        let mut children = Vec::with_capacity(ranges.len() - 1);
        let mut spawn_error = None;
        for (index, &range) in (0u32..).zip(&ranges[..ranges.len() - 1]) {
            let job = || self.run_subordinate(index, range);
            match launcher.spawn(index, &job) {
                Ok(child) => children.push((index, child)),
                Err(source) => {
                    error!(process = index, "failed to spawn worker process: {}", source);
                    spawn_error = Some((
                        index,
                        Error::SpawnFailure {
                            kind: WorkerKind::Process,
                            index,
                            source,
                        },
                    ));
                    break;
                }
            }
        }

        let own_result = if spawn_error.is_none() {
            self.run_group(own_index, own_range)
        } else {
            Ok(())
        };

        self.enter(Phase::AwaitingAll);
        let mut worker_error = None;
        for (index, child) in children {
            let termination = launcher.wait(child).unwrap_or_else(|e| {
                error!(process = index, "wait failed: {}", e);
                Termination::Unobserved
            });
            if termination.success() {
                debug!(process = index, "worker process finished");
            } else {
                error!(process = index, "worker process {}", termination);
                worker_error.get_or_insert((index, Error::WorkerFailed { index, termination }));
            }
        }

        if let Some((index, e)) = spawn_error {
            return Err(self.fail(index, e));
        }
        if let Err(e) = own_result {
            return Err(self.fail(own_index, e));
        }
        if let Some((index, e)) = worker_error {
            return Err(self.fail(index, e));
        }

        self.enter(Phase::Finalizing);
        let series_sum = self.accumulator.read();
        let elapsed = started.elapsed();
        self.enter(Phase::Completed);

        let pi = series::approximate_pi(series_sum);
        info!(pi, elapsed_ms = elapsed.as_millis() as u64, "run completed");
        Ok(Approximation {
            pi,
            series_sum,
            elapsed,
        })
    }
}
