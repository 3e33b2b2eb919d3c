//! Contiguous range partitioning
//!
//! Both levels of the worker hierarchy are split the same way: every worker
//! gets `floor(total / workers)` terms and the last worker at that level also
//! takes the remainder. Applying the split first across processes and then,
//! inside each process, across its threads keeps the union of all leaf ranges
//! exactly `[0, total)`.

use std::fmt;

use crate::error::{Error, Result};

/// A half-open span `[start, start + count)` of series-term indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkRange {
    /// Zero-based index of the first term
    pub start: u64,
    /// Number of terms to sum
    pub count: u64,
}

impl WorkRange {
    pub const fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    /// One past the last index in the range
    pub const fn end(&self) -> u64 {
        self.start + self.count
    }

    /// Split into `workers` contiguous sub-ranges, remainder on the last one
    pub fn split(self, workers: u32) -> Result<Vec<WorkRange>> {
        let (per_worker, remainder) = partition(self.count, workers)?;
        let last = workers - 1;
        Ok((0..workers)
            .map(|i| {
                let count = if i == last {
                    per_worker + remainder
                } else {
                    per_worker
                };
                WorkRange::new(self.start + per_worker * u64::from(i), count)
            })
            .collect())
    }
}

/// Per-worker share and leftover for `total` terms across `worker_count` workers
///
/// Returns `(per_worker, remainder)`. Zero workers is rejected rather than
/// defaulted.
pub fn partition(total: u64, worker_count: u32) -> Result<(u64, u64)> {
    if worker_count == 0 {
        return Err(Error::InvalidPartition { total });
    }
    let workers = u64::from(worker_count);
    let per_worker = total / workers;
    Ok((per_worker, total - per_worker * workers))
}

/// Identifies a worker in logs and output file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub process_index: u32,
    pub thread_index: Option<u32>,
}

impl WorkerId {
    /// The single inline worker of a process
    pub const fn process(process_index: u32) -> Self {
        Self {
            process_index,
            thread_index: None,
        }
    }

    pub const fn thread(process_index: u32, thread_index: u32) -> Self {
        Self {
            process_index,
            thread_index: Some(thread_index),
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.thread_index {
            Some(t) => write!(f, "p{}-t{}", self.process_index, t),
            None => write!(f, "p{}", self.process_index),
        }
    }
}
