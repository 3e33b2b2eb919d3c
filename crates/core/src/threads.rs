//! Per-process thread fan-out
//!
//! Runs inside every process of the run, the calling one included. With a
//! thread count of zero the process's range is summed by one inline worker;
//! otherwise the range is split again and every thread is joined before this
//! returns, so a process can never be observed as finished while one of its
//! threads still has an unmerged partial sum.

use std::thread;

use tracing::{debug, error};

use crate::error::{Error, Result, WorkerKind, format_panic_payload};
use crate::partition::{WorkRange, WorkerId};
use crate::worker::{self, ProcessContext};

/// Sum `range` on behalf of process `process_index` using `threads` threads
pub fn run_process(
    process_index: u32,
    range: WorkRange,
    threads: u32,
    ctx: &ProcessContext<'_>,
) -> Result<()> {
    if threads == 0 {
        worker::run(WorkerId::process(process_index), range, ctx)?;
        return Ok(());
    }

    let ranges = range.split(threads)?;
    debug!(
        process = process_index,
        threads,
        start = range.start,
        count = range.count,
        "starting worker threads"
    );

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(ranges.len());
        let mut first_error = None;

        for (thread_index, sub_range) in (0u32..).zip(ranges) {
            let id = WorkerId::thread(process_index, thread_index);
            let spawned = thread::Builder::new()
                .name(format!("approx-pi-{}", id))
                .spawn_scoped(scope, move || worker::run(id, sub_range, ctx));
            match spawned {
                Ok(handle) => handles.push((thread_index, handle)),
                Err(source) => {
                    error!(worker = %id, "failed to spawn worker thread: {}", source);
                    first_error = Some(Error::SpawnFailure {
                        kind: WorkerKind::Thread,
                        index: thread_index,
                        source,
                    });
                    break;
                }
            }
        }

        // Join everything that did start, even after a spawn failure.
        for (thread_index, handle) in handles {
            let outcome = match handle.join() {
                Ok(result) => result.map(drop),
                Err(payload) => Err(Error::ThreadPanicked {
                    index: thread_index,
                    message: format_panic_payload(payload.as_ref()),
                }),
            };
            if let Err(e) = outcome {
                error!(process = process_index, thread = thread_index, "{}", e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    })
}
