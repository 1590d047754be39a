use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::Result;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One CSV written by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub job: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Writes `df` with a header row, empty cells for missing values and
/// second-resolution timestamps. Missing parent directories are created.
pub fn write_csv(job: &str, df: &mut DataFrame, path: &Path) -> Result<OutputSummary> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(DATETIME_FORMAT.to_string()))
        .with_date_format(Some(DATE_FORMAT.to_string()))
        .with_null_value(String::new())
        .finish(df)?;

    info!(
        job,
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "wrote output"
    );

    Ok(OutputSummary {
        job: job.to_string(),
        path: path.to_path_buf(),
        rows: df.height(),
        columns: df.width(),
    })
}
