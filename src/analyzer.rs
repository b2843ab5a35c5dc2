//! Pipeline driver: lines → records (sequential or chunked) → quality gate →
//! per-URL aggregation → ranked rows → report sink.

use crate::config::Config;
use crate::error::AnalyzerError;
use crate::log::{LineParser, LogFile};
use crate::model::{ReportRow, UrlStats, build_report, check_parse_ratio};
use crate::pool::run_chunks;
use crate::render::ReportSink;
use anyhow::Context;
use tracing::{debug, info, warn};

/// Parsed totals and ranked rows for one log.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub rows: Vec<ReportRow>,
    pub total_lines: usize,
    pub parsed: usize,
    pub parsed_percent: f64,
    pub failed_chunks: usize,
}

/// What a call to [`Analyzer::run`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report already existed; nothing was parsed.
    Skipped { report_name: String },
    /// The log produced no rows, so no report was written.
    Empty { report_name: String },
    Published { report_name: String, rows: usize },
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    parser: LineParser,
    report_size: usize,
    worker_count: usize,
}

impl Analyzer {
    pub fn new(parser: LineParser, report_size: usize, worker_count: usize) -> Self {
        Self {
            parser,
            report_size,
            worker_count: worker_count.max(1),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(LineParser::new()?, cfg.report_size, cfg.worker_count))
    }

    /// Produce the report for `log` unless `sink` already holds it.
    pub fn run(&self, log: &LogFile, sink: &dyn ReportSink) -> anyhow::Result<RunOutcome> {
        let report_name = log.report_name();
        if sink.exists(&report_name) {
            info!(report = %report_name, "report already exists, skipping");
            return Ok(RunOutcome::Skipped { report_name });
        }

        let lines = log.read_lines().map_err(|err| AnalyzerError::NoInput {
            reason: format!("{:#}", err),
        })?;
        let analysis = self
            .analyze(&lines)
            .with_context(|| format!("analyze log file {}", log.path.display()))?;
        info!(
            total_lines = analysis.total_lines,
            parsed = analysis.parsed,
            parsed_percent = %format!("{:.2}", analysis.parsed_percent),
            failed_chunks = analysis.failed_chunks,
            "parsed log"
        );

        if analysis.rows.is_empty() {
            warn!(report = %report_name, "no rows to report, skipping report generation");
            return Ok(RunOutcome::Empty { report_name });
        }

        sink.publish(&report_name, &analysis.rows)?;
        Ok(RunOutcome::Published {
            report_name,
            rows: analysis.rows.len(),
        })
    }

    /// Parse, gate and rank already-loaded lines.
    pub fn analyze(&self, lines: &[String]) -> Result<Analysis, AnalyzerError> {
        self.analyze_with(lines, |chunk| self.parse_chunk(chunk))
    }

    fn analyze_with<F>(&self, lines: &[String], task: F) -> Result<Analysis, AnalyzerError>
    where
        F: Fn(&[String]) -> UrlStats + Sync,
    {
        let (stats, failed_chunks) = if self.worker_count == 1 {
            (task(lines), 0)
        } else {
            self.parse_parallel(lines, task)
        };

        let parsed = stats.total_count() as usize;
        let parsed_percent = check_parse_ratio(lines.len(), parsed)?;
        debug!(urls = stats.len(), "aggregated records");

        // Request shares are relative to every line read, parsed or not.
        let rows = build_report(
            &stats,
            lines.len() as u64,
            stats.total_time(),
            self.report_size,
        );

        Ok(Analysis {
            rows,
            total_lines: lines.len(),
            parsed,
            parsed_percent,
            failed_chunks,
        })
    }

    fn parse_parallel<F>(&self, lines: &[String], task: F) -> (UrlStats, usize)
    where
        F: Fn(&[String]) -> UrlStats + Sync,
    {
        debug!(workers = self.worker_count, lines = lines.len(), "parsing in chunks");

        let mut stats = UrlStats::new();
        let mut failed = 0;
        let mut lost_lines = 0;
        // Outputs arrive in chunk order, which keeps first-seen URL order intact.
        for output in run_chunks(lines, self.worker_count, task) {
            match output.result {
                Ok(chunk_stats) => stats.merge(chunk_stats),
                Err(_) => {
                    failed += 1;
                    lost_lines += output.lines;
                }
            }
        }
        if failed > 0 {
            warn!(failed_chunks = failed, lost_lines, "merged without failed chunks");
        }
        (stats, failed)
    }

    fn parse_chunk(&self, lines: &[String]) -> UrlStats {
        lines
            .iter()
            .filter_map(|line| self.parser.parse_line(line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::fs;

    fn line(url: &str, request_time: &str) -> String {
        format!(
            r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET {} HTTP/1.1" 200 927 "-" "Lynx/2.8.8dev.9" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" {}"#,
            url, request_time
        )
    }

    fn analyzer(report_size: usize, workers: usize) -> Analyzer {
        Analyzer::new(LineParser::new().unwrap(), report_size, workers)
    }

    #[derive(Default)]
    struct RecordingSink {
        existing: bool,
        published: RefCell<Vec<(String, Vec<ReportRow>)>>,
    }

    impl ReportSink for RecordingSink {
        fn exists(&self, _report_name: &str) -> bool {
            self.existing
        }

        fn publish(&self, report_name: &str, rows: &[ReportRow]) -> anyhow::Result<()> {
            self.published
                .borrow_mut()
                .push((report_name.to_string(), rows.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn ranks_scenario_lines() {
        let lines = vec![line("/a", "0.5"), line("/a", "1.5"), line("/b", "2.0")];
        let analysis = analyzer(10, 1).analyze(&lines).unwrap();

        assert_eq!(analysis.total_lines, 3);
        assert_eq!(analysis.parsed, 3);
        let a = &analysis.rows[0];
        assert_eq!(a.url, "/a");
        assert_eq!(
            (a.count, a.time_sum, a.time_avg, a.time_max, a.time_med),
            (2, 2.0, 1.0, 1.5, 1.0)
        );
        let b = &analysis.rows[1];
        assert_eq!(b.url, "/b");
        assert_eq!((b.count, b.time_sum), (1, 2.0));
    }

    #[test]
    fn mostly_unparsable_log_is_rejected() {
        let mut lines: Vec<String> = (0..4).map(|i| line(&format!("/u/{}", i), "0.1")).collect();
        lines.extend((0..6).map(|i| format!("broken line {}", i)));

        let err = analyzer(10, 1).analyze(&lines).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::ParseRatio {
                parsed: 4,
                total: 10,
                ..
            }
        ));
    }

    #[test]
    fn parallel_matches_sequential() {
        let lines: Vec<String> = (0..103)
            .map(|i| match i % 7 {
                0 => "garbage".to_string(),
                n => line(&format!("/u/{}", i % 5), &(f64::from(n) / 8.0).to_string()),
            })
            .collect();

        let sequential = analyzer(1000, 1).analyze(&lines).unwrap();
        for workers in [2, 3, 8, 200] {
            let parallel = analyzer(1000, workers).analyze(&lines).unwrap();
            assert_eq!(parallel, sequential, "workers = {}", workers);
        }
    }

    #[test]
    fn failed_chunk_is_dropped_from_merge() {
        let lines: Vec<String> = (0..8).map(|i| line(&format!("/u/{}", i), "0.5")).collect();
        let a = analyzer(10, 4);
        let analysis = a
            .analyze_with(&lines, |chunk| {
                if chunk.iter().any(|l| l.contains("/u/2 ")) {
                    panic!("worker crashed");
                }
                a.parse_chunk(chunk)
            })
            .unwrap();

        assert_eq!(analysis.failed_chunks, 1);
        assert_eq!(analysis.parsed, 6);
        assert_eq!(analysis.parsed_percent, 75.0);
        assert!(analysis.rows.iter().all(|r| r.url != "/u/2" && r.url != "/u/3"));
    }

    #[test]
    fn failed_chunk_can_breach_threshold() {
        let mut lines = vec!["junk".to_string(), "junk".to_string()];
        lines.extend((0..8).map(|i| line(&format!("/u/{}", i), "0.5")));
        let a = analyzer(10, 4);

        // Chunks are [2, 2, 2, 4]; losing the last one leaves 4 of 10 lines.
        let err = a
            .analyze_with(&lines, |chunk| {
                if chunk.len() == 4 {
                    panic!("worker crashed");
                }
                a.parse_chunk(chunk)
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::ParseRatio {
                parsed: 4,
                total: 10,
                ..
            }
        ));
    }

    #[test]
    fn existing_report_skips_parsing() {
        let sink = RecordingSink {
            existing: true,
            ..Default::default()
        };
        // The log does not exist: reading it would fail.
        let log = LogFile::from_path("/nonexistent/nginx-access-ui.log-20170630.gz", "nginx-access-ui")
            .unwrap();

        let outcome = analyzer(10, 1).run(&log, &sink).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Skipped {
                report_name: "report-2017.06.30.html".to_string()
            }
        );
        assert!(sink.published.borrow().is_empty());
    }

    #[test]
    fn publishes_ranked_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx-access-ui.log-20170630");
        let body = [
            line("/fast", "0.010"),
            line("/slow", "1.500"),
            line("/fast", "0.020"),
            "not a log line".to_string(),
        ]
        .join("\n");
        fs::write(&path, body).unwrap();

        let sink = RecordingSink::default();
        let log = LogFile::from_path(path, "nginx-access-ui").unwrap();
        let outcome = analyzer(1, 2).run(&log, &sink).unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Published {
                report_name: "report-2017.06.30.html".to_string(),
                rows: 1,
            }
        );
        let published = sink.published.borrow();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1[0].url, "/slow");
    }

    #[test]
    fn unreadable_log_is_no_input() {
        let sink = RecordingSink::default();
        let log = LogFile::from_path("/nonexistent/nginx-access-ui.log-20170630", "nginx-access-ui")
            .unwrap();
        let err = analyzer(10, 1).run(&log, &sink).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::NoInput { .. })
        ));
        assert!(sink.published.borrow().is_empty());
    }

    #[test]
    fn count_share_is_relative_to_lines_read() {
        let lines = vec![
            line("/fast", "0.010"),
            line("/slow", "1.500"),
            line("/fast", "0.020"),
            "not a log line".to_string(),
        ];

        for workers in [1, 2] {
            let analysis = analyzer(10, workers).analyze(&lines).unwrap();
            let shares: Vec<(&str, f64)> = analysis
                .rows
                .iter()
                .map(|r| (r.url.as_str(), r.count_perc))
                .collect();
            assert_eq!(shares, vec![("/slow", 25.0), ("/fast", 50.0)]);
        }
    }

    #[test]
    fn parse_ratio_error_survives_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx-access-ui.log-20170630");
        fs::write(&path, "junk\njunk\n").unwrap();

        let sink = RecordingSink::default();
        let log = LogFile::from_path(path, "nginx-access-ui").unwrap();
        let err = analyzer(10, 1).run(&log, &sink).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::ParseRatio { .. })
        ));
        assert!(sink.published.borrow().is_empty());
    }
}
