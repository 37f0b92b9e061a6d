use crate::error::ReportError;
use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DATE_FORMAT: &str = "%Y-%m-%d_%Hh%M.%S.%3f";

/// Session timestamp used in output file names, e.g. `2026-10-19_14h03.27.512`
pub fn date_stamp(at: &DateTime<Local>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Where one session's files go. Every output shares the same base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    base: PathBuf,
}

impl SessionPaths {
    pub fn rotation(data_dir: &Path, participant: &str, date: &str) -> Self {
        Self {
            base: data_dir.join(format!("MR_sub{participant}_{date}")),
        }
    }

    pub fn preference(data_dir: &Path, participant: &str, date: &str) -> Self {
        Self {
            base: data_dir.join(format!("PREF_sub{participant}_{date}")),
        }
    }

    /// Creates the data directory if needed
    pub fn ensure_dir(&self) -> Result<(), ReportError> {
        if let Some(dir) = self.base.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn practice_csv(&self) -> PathBuf {
        self.with_suffix("_practice.csv")
    }

    pub fn main_csv(&self) -> PathBuf {
        self.with_suffix(".csv")
    }

    pub fn summary_json(&self) -> PathBuf {
        self.with_suffix("_summary.json")
    }

    pub fn plot_png(&self) -> PathBuf {
        self.with_suffix("_results.png")
    }

    // base names contain dots from the timestamp, so set_extension is out
    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.base.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }
}
