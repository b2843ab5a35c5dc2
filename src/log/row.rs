/// A single request extracted from one access log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub url: String,
    /// Seconds spent serving the request (`$request_time`).
    pub request_time: f64,
}

impl LogRecord {
    pub fn new(url: impl Into<String>, request_time: f64) -> Self {
        Self {
            url: url.into(),
            request_time,
        }
    }
}
