//! Report output: HTML rendering and atomic placement in the report directory.

pub mod html;

use crate::model::ReportRow;
use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub use html::{DEFAULT_TEMPLATE, render_html_report};

/// Destination for finished reports.
pub trait ReportSink {
    /// Whether a report with this name has already been produced.
    fn exists(&self, report_name: &str) -> bool;

    /// Store the ranked rows under `report_name`.
    fn publish(&self, report_name: &str, rows: &[ReportRow]) -> anyhow::Result<()>;
}

/// Writes HTML reports into a directory, one file per report name.
#[derive(Debug, Clone)]
pub struct HtmlReportSink {
    report_dir: PathBuf,
    template: Option<PathBuf>,
}

impl HtmlReportSink {
    /// `template` is an HTML file containing `$table_json`; the built-in page is
    /// used when it is `None`.
    pub fn new(report_dir: impl Into<PathBuf>, template: Option<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
            template,
        }
    }

    pub fn report_path(&self, report_name: &str) -> PathBuf {
        self.report_dir.join(report_name)
    }

    fn load_template(&self) -> anyhow::Result<String> {
        match &self.template {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("read report template {}", path.display())),
            None => Ok(DEFAULT_TEMPLATE.to_string()),
        }
    }
}

impl ReportSink for HtmlReportSink {
    fn exists(&self, report_name: &str) -> bool {
        self.report_path(report_name).exists()
    }

    fn publish(&self, report_name: &str, rows: &[ReportRow]) -> anyhow::Result<()> {
        let html = render_html_report(&self.load_template()?, rows)?;
        let target = self.report_path(report_name);
        write_atomically(&self.report_dir, &target, html.as_bytes())?;
        info!(path = %target.display(), rows = rows.len(), "report written");
        Ok(())
    }
}

#[cfg(unix)]
const REPORT_MODE: u32 = 0o644;

/// Write into a temp file next to `target`, then rename it over `target`, so a
/// half-written report is never visible under the final name.
fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create report dir {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write temp file {}", tmp.path().display()))?;

    // Temp files start out owner-only; reports are served by other users.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(REPORT_MODE))
            .with_context(|| format!("set mode of {}", tmp.path().display()))?;
    }

    tmp.persist(target)
        .with_context(|| format!("move report into place at {}", target.display()))?;
    Ok(())
}
