use std::ops::Range;

/// Split `total_lines` into `worker_count` contiguous ranges.
///
/// Every range but the last holds `total_lines / worker_count` lines; the last
/// one also takes the remainder. The ranges cover `0..total_lines` exactly once.
/// A `worker_count` of 0 is treated as 1.
pub fn plan_chunks(total_lines: usize, worker_count: usize) -> Vec<Range<usize>> {
    let workers = worker_count.max(1);
    let slice_size = total_lines / workers;
    let remainder = total_lines % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = if i + 1 == workers {
            slice_size + remainder
        } else {
            slice_size
        };
        chunks.push(start..start + len);
        start += len;
    }
    chunks
}
