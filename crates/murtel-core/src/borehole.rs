use polars::prelude::*;
use tracing::info;

use crate::calendar::hydrological_year;
use crate::error::Result;
use crate::frame::datetime_values;
use crate::gap_fill::{selective_fill, ColumnGapReport, GapPolicy};

pub const HYDRO_YEAR_COLUMN: &str = "hydro_year";

/// Appends the hydrological year of each `time` sample as an `Int32` column.
pub fn add_hydro_year(df: &DataFrame) -> Result<DataFrame> {
    let years: Vec<Option<i32>> = datetime_values(df, "time")?
        .into_iter()
        .map(|time| time.map(|t| hydrological_year(t.date())))
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new(HYDRO_YEAR_COLUMN.into(), years))?;
    Ok(output)
}

/// Keeps rows whose calendar year of `time` lies within the inclusive bounds.
pub fn clip_years(df: DataFrame, min_year: Option<i32>, max_year: Option<i32>) -> Result<DataFrame> {
    let lower = min_year.map(|year| col("time").dt().year().gt_eq(lit(year)));
    let upper = max_year.map(|year| col("time").dt().year().lt_eq(lit(year)));

    let predicate = match (lower, upper) {
        (Some(lower), Some(upper)) => lower.and(upper),
        (Some(bound), None) | (None, Some(bound)) => bound,
        (None, None) => return Ok(df),
    };

    Ok(df.lazy().filter(predicate).collect()?)
}

pub struct BoreholeOutput {
    pub df: DataFrame,
    pub gaps: Vec<ColumnGapReport>,
}

/// Adds the hydro year and fills gaps on the full record; the year window is
/// applied last.
pub fn process_borehole(
    df: &DataFrame,
    policy: &GapPolicy,
    min_year: Option<i32>,
    max_year: Option<i32>,
) -> Result<BoreholeOutput> {
    let with_year = add_hydro_year(df)?;
    let (filled, gaps) = selective_fill(&with_year, policy)?;

    let filled_samples: usize = gaps.iter().map(|gap| gap.report.filled_samples).sum();
    let open_gaps: usize = gaps.iter().map(|gap| gap.report.open_gaps).sum();
    info!(
        depths = gaps.len(),
        filled_samples, open_gaps, "applied selective gap filling"
    );

    let clipped = clip_years(filled, min_year, max_year)?;
    info!(
        rows_in = df.height(),
        rows_out = clipped.height(),
        ?min_year,
        ?max_year,
        "clipped borehole record"
    );

    Ok(BoreholeOutput { df: clipped, gaps })
}
