use crate::log::row::LogRecord;
use anyhow::Context;
use regex::Regex;

/// Matches lines written with the nginx `ui_short` log format:
///
/// $remote_addr $remote_user  $http_x_real_ip [$time_local] "$request"
/// $status $body_bytes_sent "$http_referer" "$http_user_agent"
/// "$http_x_forwarded_for" "$http_X_REQUEST_ID" "$http_X_RB_USER" $request_time
///
/// Example:
/// 1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/banner/25019354 HTTP/1.1" 200 927 "-" "Lynx/2.8.8dev.9" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" 0.390
const LINE_RE: &str = r#"^\S+ \S+\s+\S+ \[[^\]]*\] "\S+ (?P<url>\S+) [^"]*" \S+ \S+ "[^"]*" "[^"]*" "[^"]*" "[^"]*" "[^"]*" (?P<request_time>\S+)\s*$"#;

/// Compiled line grammar. Built once per run and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct LineParser {
    re: Regex,
}

impl LineParser {
    pub fn new() -> anyhow::Result<Self> {
        let re = Regex::new(LINE_RE).context("compile access log grammar")?;
        Ok(Self { re })
    }

    /// Extract `(url, request_time)` from one line, or `None` if the line does
    /// not follow the grammar or the latency is not a non-negative number.
    pub fn parse_line(&self, line: &str) -> Option<LogRecord> {
        let caps = self.re.captures(line)?;

        let request_time: f64 = caps.name("request_time")?.as_str().parse().ok()?;
        if !request_time.is_finite() || request_time < 0.0 {
            return None;
        }

        Some(LogRecord::new(caps.name("url")?.as_str(), request_time))
    }
}
