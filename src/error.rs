use thiserror::Error;

/// Failure kinds of an analyzer run that callers may want to tell apart.
///
/// I/O and configuration problems are reported as plain `anyhow` errors with
/// context; these variants cover the conditions the pipeline itself detects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("no input available: {reason}")]
    NoInput { reason: String },

    #[error("only {parsed} of {total} lines parsed ({percent:.2}%), below the {threshold}% threshold")]
    ParseRatio {
        parsed: usize,
        total: usize,
        percent: f64,
        threshold: f64,
    },

    #[error("chunk {chunk} ({lines} lines) failed: {reason}")]
    ChunkFailure {
        chunk: usize,
        lines: usize,
        reason: String,
    },
}
