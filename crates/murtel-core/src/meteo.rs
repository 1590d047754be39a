use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::datetime_format;
use crate::daily::{
    aggregate_to_daily, attach_daily_column, daily_sums, reindex_days, DEFAULT_MIN_SAMPLES_PER_DAY,
};
use crate::error::Result;

/// Precipitation readings above this many millimetres are instrument faults.
pub const DEFAULT_PRECIP_CEILING_MM: f64 = 500.0;

const PERMOS_OUTPUT_COLUMNS: [&str; 5] = ["date", "airtemp", "surftemp", "snowh", "longout"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteoOptions {
    /// Combined PERMOS rows after this instant are dropped.
    #[serde(with = "datetime_format")]
    pub permos_cutoff: NaiveDateTime,
    /// Days reinstated as empty rows in the PERMOS daily series.
    pub permos_gap_start: NaiveDate,
    pub permos_gap_end: NaiveDate,
    pub min_samples_per_day: usize,
    pub precip_ceiling_mm: f64,
}

impl Default for MeteoOptions {
    fn default() -> Self {
        Self {
            permos_cutoff: NaiveDate::from_ymd_opt(2023, 9, 20)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            permos_gap_start: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap_or_default(),
            permos_gap_end: NaiveDate::from_ymd_opt(2019, 9, 30).unwrap_or_default(),
            min_samples_per_day: DEFAULT_MIN_SAMPLES_PER_DAY,
            precip_ceiling_mm: DEFAULT_PRECIP_CEILING_MM,
        }
    }
}

/// Brings the Corvatsch87 station frame onto the PERMOS hourly layout:
/// snow height from cm to m, incoming longwave as `longout`.
pub fn corvatsch87_as_permos(df: DataFrame) -> Result<DataFrame> {
    Ok(df
        .lazy()
        .select([
            col("date"),
            col("airtemp"),
            col("surftemp"),
            (col("snowh") / lit(100.0)).alias("snowh"),
            col("LWRdown").alias("longout"),
        ])
        .collect()?)
}

/// Joins the 1997-2019 PERMOS record with the 2019-2023 station record,
/// cuts it at the cutoff and reduces it to daily means with the known outage
/// window restored as empty days.
pub fn permos_daily(
    permos: DataFrame,
    corvatsch87: DataFrame,
    options: &MeteoOptions,
) -> Result<DataFrame> {
    let mut combined = permos.select(PERMOS_OUTPUT_COLUMNS)?;
    let recent = corvatsch87_as_permos(corvatsch87)?;
    combined.vstack_mut(&recent)?;

    let combined = combined
        .lazy()
        .filter(col("date").lt_eq(lit(options.permos_cutoff)))
        .collect()?;
    info!(rows = combined.height(), cutoff = %options.permos_cutoff, "combined PERMOS record");

    let daily = aggregate_to_daily(&combined, options.min_samples_per_day)?;
    reindex_days(&daily, options.permos_gap_start, options.permos_gap_end)
}

/// Daily means of the PERMA-XT export plus the daily precipitation total as
/// `Pluvio_sum`.
pub fn perma_xt_daily(df: &DataFrame, options: &MeteoOptions) -> Result<DataFrame> {
    let daily = aggregate_to_daily(df, options.min_samples_per_day)?;
    let sums = daily_sums(df, "date", "Pluvio")?;
    attach_daily_column(&daily, &sums, "Pluvio_sum")
}

/// Drops rows whose `value_col` is missing or above `ceiling`.
pub fn clean_precipitation(df: DataFrame, value_col: &str, ceiling: f64) -> Result<DataFrame> {
    let rows_in = df.height();
    let cleaned = df
        .lazy()
        .filter(col(value_col).is_not_null().and(col(value_col).lt_eq(lit(ceiling))))
        .collect()?;
    info!(
        rows_in,
        rows_out = cleaned.height(),
        ceiling,
        "removed implausible precipitation"
    );
    Ok(cleaned)
}
