use crate::error::AnalyzerError;

/// Minimum share of lines that must parse for a report to be produced.
pub const PARSE_THRESHOLD_PERCENT: f64 = 50.0;

/// `part` as a percentage of `total`; 0 when `total` is 0.
pub fn percent(total: f64, part: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    part / total * 100.0
}

/// Reject runs where fewer than half of the lines read produced a record.
///
/// `total_lines` counts every line read, blank or not, including lines of
/// chunks whose worker failed. Returns the parsed percentage on success.
pub fn check_parse_ratio(total_lines: usize, parsed: usize) -> Result<f64, AnalyzerError> {
    let pct = percent(total_lines as f64, parsed as f64);
    if pct < PARSE_THRESHOLD_PERCENT {
        return Err(AnalyzerError::ParseRatio {
            parsed,
            total: total_lines,
            percent: pct,
            threshold: PARSE_THRESHOLD_PERCENT,
        });
    }
    Ok(pct)
}
