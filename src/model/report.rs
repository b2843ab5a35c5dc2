use crate::model::aggregate::{UrlAccumulator, UrlStats};
use crate::model::gate::percent;
use serde::Serialize;

/// Final statistics for one URL, as embedded into the HTML report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub url: String,
    pub count: u64,
    pub time_sum: f64,
    pub time_avg: f64,
    pub time_max: f64,
    pub time_med: f64,
    /// Share of `time_sum` in the total request time.
    pub time_perc: f64,
    /// Share of `count` in the total request count.
    pub count_perc: f64,
}

impl ReportRow {
    fn from_accumulator(acc: &UrlAccumulator, total_count: u64, total_time: f64) -> Self {
        Self {
            url: acc.url.clone(),
            count: acc.count,
            time_sum: acc.time_sum,
            time_avg: acc.time_sum / acc.count as f64,
            time_max: acc.times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            time_med: median(&acc.times),
            time_perc: percent(total_time, acc.time_sum),
            count_perc: percent(total_count as f64, acc.count as f64),
        }
    }
}

/// Build report rows ranked by total time, largest first, keeping at most
/// `report_size` rows. Rows with equal `time_sum` keep first-seen URL order.
pub fn build_report(
    stats: &UrlStats,
    total_count: u64,
    total_time: f64,
    report_size: usize,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = stats
        .iter()
        .filter(|acc| acc.count > 0)
        .map(|acc| ReportRow::from_accumulator(acc, total_count, total_time))
        .collect();

    // Stable: equal sums stay in discovery order.
    rows.sort_by(|a, b| {
        b.time_sum
            .partial_cmp(&a.time_sum)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(report_size);
    rows
}

fn median(times: &[f64]) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
