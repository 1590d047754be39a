use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::frame::{float_column, float_values};

/// Columns `selective_fill` passes through untouched.
pub const PASSTHROUGH_COLUMNS: [&str; 2] = ["time", "hydro_year"];

/// Gap limits keyed on sensor depth. Near-surface sensors follow the
/// seasonal signal closely enough to bridge two weeks; deeper sensors only
/// two samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapPolicy {
    pub shallow_limit_m: f64,
    pub shallow_max_gap: usize,
    pub deep_max_gap: usize,
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self {
            shallow_limit_m: 4.0,
            shallow_max_gap: 14,
            deep_max_gap: 2,
        }
    }
}

impl GapPolicy {
    pub fn max_gap_for_depth(&self, depth_m: f64) -> usize {
        if depth_m < self.shallow_limit_m {
            self.shallow_max_gap
        } else {
            self.deep_max_gap
        }
    }
}

/// Outcome of filling one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GapReport {
    pub filled_gaps: usize,
    pub filled_samples: usize,
    pub open_gaps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGapReport {
    pub column: String,
    pub max_gap: usize,
    pub report: GapReport,
}

pub fn interpolate_short_gaps(values: &[Option<f64>], max_gap: usize) -> Vec<Option<f64>> {
    fill_short_gaps(values, max_gap).0
}

/// Linearly interpolates every inside gap of at most `max_gap` samples.
/// Leading and trailing gaps, and longer gaps, are counted as open.
pub fn fill_short_gaps(values: &[Option<f64>], max_gap: usize) -> (Vec<Option<f64>>, GapReport) {
    let mut filled = values.to_vec();
    let mut report = GapReport::default();

    let mut idx = 0;
    while idx < values.len() {
        if values[idx].is_some() {
            idx += 1;
            continue;
        }

        let start = idx;
        while idx < values.len() && values[idx].is_none() {
            idx += 1;
        }
        let len = idx - start;

        let left = start.checked_sub(1).and_then(|prev| values[prev]);
        let right = values.get(idx).copied().flatten();
        let (Some(left), Some(right)) = (left, right) else {
            report.open_gaps += 1;
            continue;
        };
        if len > max_gap {
            report.open_gaps += 1;
            continue;
        }

        let step = (right - left) / (len + 1) as f64;
        for offset in 0..len {
            filled[start + offset] = Some(left + step * (offset + 1) as f64);
        }
        report.filled_gaps += 1;
        report.filled_samples += len;
    }

    (filled, report)
}

/// Fills every depth column of a borehole frame with the limit its depth
/// allows. Column names other than `time` and `hydro_year` must be depths in
/// metres.
pub fn selective_fill(
    df: &DataFrame,
    policy: &GapPolicy,
) -> Result<(DataFrame, Vec<ColumnGapReport>)> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    let mut reports = Vec::new();

    for column in df.get_columns() {
        let name = column.name().as_str();
        if PASSTHROUGH_COLUMNS.contains(&name) {
            columns.push(column.clone());
            continue;
        }

        let depth: f64 = name
            .trim()
            .parse()
            .map_err(|_| PipelineError::InvalidDepthColumn(name.to_string()))?;
        let max_gap = policy.max_gap_for_depth(depth);

        let values = float_values(df, name)?;
        let (filled, report) = fill_short_gaps(&values, max_gap);
        debug!(
            column = name,
            max_gap,
            filled_gaps = report.filled_gaps,
            filled_samples = report.filled_samples,
            open_gaps = report.open_gaps,
            "interpolated depth column"
        );

        columns.push(float_column(name, filled));
        reports.push(ColumnGapReport {
            column: name.to_string(),
            max_gap,
            report,
        });
    }

    Ok((DataFrame::new(columns)?, reports))
}
