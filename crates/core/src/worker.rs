//! A single worker: sum one range privately, then merge once
//!
//! The partial sum never leaves the worker until the merge, which is the
//! only write to the shared accumulator and always holds the named
//! semaphore. A merge that cannot take the lock is an error, never a skip:
//! a silently dropped partial sum would corrupt the result.

use std::time::Instant;

use tracing::debug;

use crate::accumulator::SharedAccumulator;
use crate::config::OutputConfig;
use crate::error::Result;
use crate::partition::{WorkRange, WorkerId};
use crate::semaphore::NamedSemaphore;
use crate::series::{self, Real};
use crate::sink::DiagnosticSink;

/// Shared state one process hands to each of its workers
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    pub accumulator: &'a SharedAccumulator,
    /// This process's own handle on the merge lock
    pub lock: &'a NamedSemaphore,
    pub output: &'a OutputConfig,
    /// Iterations in the whole run, used to pick the log stride
    pub total: u64,
}

/// Sum the terms of `range`, reporting the running sum to `sink`
pub fn compute(range: WorkRange, sink: Option<&mut dyn DiagnosticSink>) -> Real {
    let mut sum: Real = 0.0;
    match sink {
        Some(sink) => {
            for (index, t) in series::terms(range) {
                sum += t;
                sink.record(index, sum);
            }
            sink.finish();
        }
        None => {
            for (_, t) in series::terms(range) {
                sum += t;
            }
        }
    }
    sum
}

/// Compute `range` and merge the result into the shared accumulator
pub fn run(id: WorkerId, range: WorkRange, ctx: &ProcessContext<'_>) -> Result<Real> {
    let started = Instant::now();
    let mut sink = ctx.output.open_sink(id, ctx.total);
    let partial = compute(range, sink.as_mut().map(|s| s as &mut dyn DiagnosticSink));
    ctx.accumulator.merge(ctx.lock, partial)?;

    debug!(
        worker = %id,
        start = range.start,
        count = range.count,
        partial,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "merged partial sum"
    );
    Ok(partial)
}
