//! Discovery of the newest access log in a directory and transparent reading
//! of plain or gzip-compressed log files.
//!
//! File names follow `<service-prefix>.log-<YYYYMMDD>[.gz]`. The date embedded in
//! the name is the only ordering key; anything that does not match is ignored.

use crate::error::AnalyzerError;
use anyhow::Context;
use chrono::NaiveDate;
use flate2::read::MultiGzDecoder;
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A log file together with the date parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
}

impl LogFile {
    /// Wrap an explicitly chosen file; the date is taken from its name when possible.
    pub fn from_path(path: impl Into<PathBuf>, service_prefix: &str) -> anyhow::Result<Self> {
        let path = path.into();
        let re = file_name_re(service_prefix)?;
        let date = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| parse_file_date(&re, n));
        Ok(Self { path, date })
    }

    /// `report-YYYY.MM.DD.html`, or `report-unknown.html` without a date.
    pub fn report_name(&self) -> String {
        match self.date {
            Some(date) => format!("report-{}.html", date.format("%Y.%m.%d")),
            None => "report-unknown.html".to_string(),
        }
    }

    pub fn is_gzip(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "gz")
    }

    /// Read every line of the file, decompressing `.gz` files on the fly.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
    /// corrupt line still counts towards the total and simply fails to parse.
    pub fn read_lines(&self) -> anyhow::Result<Vec<String>> {
        let file = File::open(&self.path)
            .with_context(|| format!("open log file {}", self.path.display()))?;

        let reader: Box<dyn Read> = if self.is_gzip() {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let mut reader = BufReader::new(reader);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("read log file {}", self.path.display()))?;
            if n == 0 {
                break;
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            lines.push(String::from_utf8_lossy(&buf).into_owned());
        }

        debug!(path = %self.path.display(), lines = lines.len(), "read log file");
        Ok(lines)
    }
}

/// Find the most recent log of `service_prefix` in `dir`.
///
/// Returns [`AnalyzerError::NoInput`] when the directory is missing or holds no
/// matching file.
pub fn find_latest(dir: &Path, service_prefix: &str) -> anyhow::Result<LogFile> {
    let re = file_name_re(service_prefix)?;

    let entries = fs::read_dir(dir).map_err(|err| AnalyzerError::NoInput {
        reason: format!("cannot read log dir {}: {}", dir.display(), err),
    })?;

    let mut latest: Option<LogFile> = None;
    for entry in entries {
        let entry = entry.with_context(|| format!("list log dir {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(date) = parse_file_date(&re, name) else {
            continue;
        };
        let path = entry.path();
        // Same date in plain and .gz form: the larger path wins, whatever the listing order.
        if latest
            .as_ref()
            .is_none_or(|cur| (cur.date, &cur.path) < (Some(date), &path))
        {
            latest = Some(LogFile {
                path,
                date: Some(date),
            });
        }
    }

    match latest {
        Some(file) => {
            info!(path = %file.path.display(), "selected latest log file");
            Ok(file)
        }
        None => Err(AnalyzerError::NoInput {
            reason: format!("no {} logs found in {}", service_prefix, dir.display()),
        }
        .into()),
    }
}

fn file_name_re(service_prefix: &str) -> anyhow::Result<Regex> {
    let pattern = format!(
        r"^{}\.log-(?P<date>\d{{8}})(?P<ext>\.gz)?$",
        regex::escape(service_prefix)
    );
    Regex::new(&pattern).with_context(|| format!("bad service prefix {:?}", service_prefix))
}

fn parse_file_date(re: &Regex, file_name: &str) -> Option<NaiveDate> {
    let date = re.captures(file_name)?.name("date")?.as_str();
    match NaiveDate::parse_from_str(date, "%Y%m%d") {
        Ok(d) => Some(d),
        Err(_) => {
            info!(file = file_name, "cannot parse date of log file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const PREFIX: &str = "nginx-access-ui";

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn picks_newest_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "nginx-access-ui.log-20180630.gz");
        touch(dir.path(), "nginx-access-ui.log-20190630.gz");
        touch(dir.path(), "nginx-access-ui.log-20170101");
        touch(dir.path(), "nginx-access-acc.log-20200430");
        touch(dir.path(), "nginx-access-ui.log-20201340");
        touch(dir.path(), "nginx-access-ui.log-20210101.bz2");

        let latest = find_latest(dir.path(), PREFIX).unwrap();
        assert_eq!(
            latest.path,
            dir.path().join("nginx-access-ui.log-20190630.gz")
        );
        assert_eq!(latest.report_name(), "report-2019.06.30.html");
    }

    #[test]
    fn same_date_prefers_compressed_copy() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "nginx-access-ui.log-20190630");
        touch(dir.path(), "nginx-access-ui.log-20190630.gz");
        touch(dir.path(), "nginx-access-ui.log-20180630.gz");

        let latest = find_latest(dir.path(), PREFIX).unwrap();
        assert_eq!(
            latest.path,
            dir.path().join("nginx-access-ui.log-20190630.gz")
        );
    }

    #[test]
    fn no_matching_file_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "nginx-access-acc.log-20200430");

        let err = find_latest(dir.path(), PREFIX).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::NoInput { .. })
        ));
    }

    #[test]
    fn missing_dir_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_latest(&dir.path().join("absent"), PREFIX).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalyzerError>(),
            Some(AnalyzerError::NoInput { .. })
        ));
    }

    #[test]
    fn report_names() {
        let cases = [
            ("nginx-access-ui.log-20170630.gz", "report-2017.06.30.html"),
            ("./root/nginx-access-ui.log-20170630.gz", "report-2017.06.30.html"),
            ("nginx-access-ui.log-20170630", "report-2017.06.30.html"),
            ("nginx-access-ui.log-20170.gz", "report-unknown.html"),
            ("nginx-access-ui.log.gz", "report-unknown.html"),
        ];
        for (path, expected) in cases {
            let file = LogFile::from_path(path, PREFIX).unwrap();
            assert_eq!(file.report_name(), expected, "{}", path);
        }
    }

    #[test]
    fn gzip_detection_uses_extension() {
        let gz = LogFile::from_path("./root/nginx-access-ui.log-20170630.gz", PREFIX).unwrap();
        let gzz = LogFile::from_path("nginx-access-ui.log-20170630.gzz", PREFIX).unwrap();
        let plain = LogFile::from_path("nginx-access-ui.log-20170630", PREFIX).unwrap();
        assert!(gz.is_gzip());
        assert!(!gzz.is_gzip());
        assert!(!plain.is_gzip());
    }

    #[test]
    fn reads_plain_and_gzip_lines() {
        let dir = tempfile::tempdir().unwrap();
        let body = "first\r\nsecond\n\nfourth";

        let plain = dir.path().join("nginx-access-ui.log-20170630");
        fs::write(&plain, body).unwrap();

        let gz = dir.path().join("nginx-access-ui.log-20170701.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let expected = vec!["first", "second", "", "fourth"];
        for path in [plain, gz] {
            let lines = LogFile::from_path(path, PREFIX).unwrap().read_lines().unwrap();
            assert_eq!(lines, expected);
        }
    }

    #[test]
    fn invalid_utf8_is_kept_as_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx-access-ui.log-20170630");
        fs::write(&path, b"ok\n\xff\xfe\n").unwrap();

        let lines = LogFile::from_path(path, PREFIX).unwrap().read_lines().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ok");
    }
}
