//! Parallel variant: split the raw lines into contiguous chunks and parse each
//! chunk on its own worker thread.

pub mod chunk;
pub mod worker;

pub use worker::run_chunks;
