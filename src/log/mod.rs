//! Access log input: line grammar, parsed records and log file discovery.

pub mod parse;
pub mod row;
pub mod source;

pub use parse::LineParser;
pub use row::LogRecord;
pub use source::{LogFile, find_latest};
