use crate::error::AnalyzerError;
use crate::pool::chunk::plan_chunks;
use crossbeam_channel::unbounded;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{debug, warn};

/// Result of one chunk task.
#[derive(Debug)]
pub struct ChunkOutput<T> {
    pub chunk: usize,
    pub lines: usize,
    pub result: Result<T, AnalyzerError>,
}

/// Run `task` over `worker_count` contiguous chunks of `lines`, one scoped
/// thread per chunk.
///
/// Workers share nothing but the read-only input. Each reports back over a
/// completion channel; a panicking worker yields an
/// [`AnalyzerError::ChunkFailure`] for its chunk and does not affect its
/// siblings. Outputs are returned in chunk order regardless of completion order.
pub fn run_chunks<T, F>(lines: &[String], worker_count: usize, task: F) -> Vec<ChunkOutput<T>>
where
    T: Send,
    F: Fn(&[String]) -> T + Sync,
{
    let chunks = plan_chunks(lines.len(), worker_count);
    let (tx, rx) = unbounded::<(usize, usize, Result<T, String>)>();
    let task = &task;

    thread::scope(|scope| {
        for (chunk, range) in chunks.into_iter().enumerate() {
            let slice = &lines[range];
            let worker_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("parse-{}", chunk))
                .spawn_scoped(scope, move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| task(slice)))
                        .map_err(|payload| panic_message(payload.as_ref()));
                    let _ = worker_tx.send((chunk, slice.len(), result));
                });
            if let Err(err) = spawned {
                let _ = tx.send((chunk, slice.len(), Err(format!("spawn worker: {}", err))));
            }
        }
    });
    drop(tx);

    let mut outputs: Vec<ChunkOutput<T>> = rx
        .iter()
        .map(|(chunk, lines, result)| {
            let result = result.map_err(|reason| AnalyzerError::ChunkFailure {
                chunk,
                lines,
                reason,
            });
            match &result {
                Ok(_) => debug!(chunk, lines, "chunk finished"),
                Err(err) => warn!(error = %err, "dropping chunk from merge"),
            }
            ChunkOutput {
                chunk,
                lines,
                result,
            }
        })
        .collect();

    outputs.sort_by_key(|o| o.chunk);
    outputs
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
