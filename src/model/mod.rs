//! Aggregation model: fold parsed records into per-URL statistics, gate on
//! parse quality and derive the ranked report rows.

pub mod aggregate;
pub mod gate;
pub mod report;

pub use aggregate::UrlStats;
pub use gate::check_parse_ratio;
pub use report::{ReportRow, build_report};
