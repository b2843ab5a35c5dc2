use crate::log::LogRecord;
use std::collections::HashMap;

/// Running latency aggregate for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlAccumulator {
    pub url: String,
    pub count: u64,
    pub time_sum: f64,
    /// Individual request times in the order they were observed.
    pub times: Vec<f64>,
}

impl UrlAccumulator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            count: 0,
            time_sum: 0.0,
            times: Vec::new(),
        }
    }

    pub fn push(&mut self, request_time: f64) {
        self.count += 1;
        self.time_sum += request_time;
        self.times.push(request_time);
    }

    /// Fold another accumulator of the same URL into this one.
    pub fn absorb(&mut self, other: UrlAccumulator) {
        debug_assert_eq!(self.url, other.url);
        self.count += other.count;
        self.time_sum += other.time_sum;
        self.times.extend(other.times);
    }
}

/// Per-URL accumulators keyed by URL, iterated in first-seen order.
///
/// Each parallel chunk builds its own `UrlStats`; chunks are combined with
/// [`UrlStats::merge`]. Merging contiguous chunks in input order yields the same
/// URL order as a single sequential fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlStats {
    index: HashMap<String, usize>,
    entries: Vec<UrlAccumulator>,
}

impl UrlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: LogRecord) {
        let LogRecord { url, request_time } = record;
        self.entry(url).push(request_time);
    }

    pub fn merge(&mut self, other: UrlStats) {
        for acc in other.entries {
            match self.index.get(&acc.url) {
                Some(&i) => self.entries[i].absorb(acc),
                None => {
                    self.index.insert(acc.url.clone(), self.entries.len());
                    self.entries.push(acc);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> Option<&UrlAccumulator> {
        self.index.get(url).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UrlAccumulator> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of records folded in so far.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|a| a.count).sum()
    }

    /// Sum of every accumulator's `time_sum`.
    pub fn total_time(&self) -> f64 {
        self.entries.iter().map(|a| a.time_sum).sum()
    }

    fn entry(&mut self, url: String) -> &mut UrlAccumulator {
        let i = match self.index.get(&url) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.entries.push(UrlAccumulator::new(url.clone()));
                self.index.insert(url, i);
                i
            }
        };
        &mut self.entries[i]
    }
}

impl Extend<LogRecord> for UrlStats {
    fn extend<I: IntoIterator<Item = LogRecord>>(&mut self, iter: I) {
        for record in iter {
            self.record(record);
        }
    }
}

impl FromIterator<LogRecord> for UrlStats {
    fn from_iter<I: IntoIterator<Item = LogRecord>>(iter: I) -> Self {
        let mut stats = UrlStats::new();
        stats.extend(iter);
        stats
    }
}
