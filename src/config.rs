use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// On-disk shape: every setting lives under a `[log-analyzer]` table.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "log-analyzer")]
    analyzer: Config,
}

/// Settings for one analyzer run.
///
/// Keys are lower-case in TOML; the upper-case spellings (`REPORT_SIZE`, ...)
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Maximum number of rows in the report. Default: 1000.
    #[serde(default = "default_report_size", alias = "REPORT_SIZE")]
    pub report_size: usize,

    /// Directory receiving `report-YYYY.MM.DD.html` files. Default: "./reports".
    #[serde(default = "default_report_dir", alias = "REPORT_DIR")]
    pub report_dir: PathBuf,

    /// Directory scanned for access logs. Default: "./log".
    #[serde(default = "default_log_dir", alias = "LOG_DIR")]
    pub log_dir: PathBuf,

    /// Parse workers; 1 parses sequentially on the calling thread. Default: 1.
    #[serde(default = "default_worker_count", alias = "WORKER_COUNT")]
    pub worker_count: usize,

    /// Append log output to this file instead of stdout.
    #[serde(default, alias = "LOGGING_FILE_PATH")]
    pub logging_file_path: Option<PathBuf>,

    /// Log file name prefix, as in `<prefix>.log-YYYYMMDD[.gz]`. Default: "nginx-access-ui".
    #[serde(default = "default_service_prefix", alias = "SERVICE_PREFIX")]
    pub service_prefix: String,

    /// HTML template containing `$table_json`; the built-in page when unset.
    #[serde(default, alias = "REPORT_TEMPLATE")]
    pub report_template: Option<PathBuf>,
}

/// Values given on the command line; each one that is set wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub report_size: Option<usize>,
    pub report_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub worker_count: Option<usize>,
}

fn default_report_size() -> usize {
    1000
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("./reports")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./log")
}

fn default_worker_count() -> usize {
    1
}

fn default_service_prefix() -> String {
    "nginx-access-ui".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_size: default_report_size(),
            report_dir: default_report_dir(),
            log_dir: default_log_dir(),
            worker_count: default_worker_count(),
            logging_file_path: None,
            service_prefix: default_service_prefix(),
            report_template: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Keys missing from the file keep
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        Self::from_toml(&data).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(data)?;
        Ok(file.analyzer)
    }

    /// Apply command-line overrides on top of this configuration.
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.report_size {
            self.report_size = v;
        }
        if let Some(v) = overrides.report_dir {
            self.report_dir = v;
        }
        if let Some(v) = overrides.log_dir {
            self.log_dir = v;
        }
        if let Some(v) = overrides.worker_count {
            self.worker_count = v;
        }
        self
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.report_size == 0 {
            bail!("report_size must be positive");
        }

        if self.worker_count == 0 {
            bail!("worker_count must be positive");
        }

        if self.service_prefix.is_empty() {
            bail!("service_prefix is required");
        }

        Ok(())
    }
}
