use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::calendar::date_range;
use crate::error::{PipelineError, Result};
use crate::frame::{date_column, date_values, float_column, float_values, is_numeric};

/// Hourly feeds need this many rows for a day to count.
pub const DEFAULT_MIN_SAMPLES_PER_DAY: usize = 15;

/// `date` when present, else `time`.
pub fn time_key(df: &DataFrame) -> Result<&'static str> {
    let names = df.get_column_names();
    if names.iter().any(|name| name.as_str() == "date") {
        Ok("date")
    } else if names.iter().any(|name| name.as_str() == "time") {
        Ok("time")
    } else {
        Err(PipelineError::MissingTimeColumn)
    }
}

fn value_columns<'a>(df: &'a DataFrame, key: &str) -> Vec<&'a str> {
    df.get_columns()
        .iter()
        .filter(|column| column.name().as_str() != key)
        .filter(|column| is_numeric(column.dtype()) || column.dtype() == &DataType::String)
        .map(|column| column.name().as_str())
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Daily means of every numeric column over days with at least
/// `min_samples` rows. Text columns are coerced to numbers first, so
/// unparseable cells count as missing. Output starts with a `date` column.
pub fn aggregate_to_daily(df: &DataFrame, min_samples: usize) -> Result<DataFrame> {
    let key = time_key(df)?;
    let days = date_values(df, key)?;

    let mut groups: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (row, day) in days.iter().enumerate() {
        if let Some(day) = day {
            groups.entry(*day).or_default().push(row);
        }
    }
    let observed_days = groups.len();
    groups.retain(|_, rows| rows.len() >= min_samples);

    let kept: Vec<NaiveDate> = groups.keys().copied().collect();
    let mut columns = vec![date_column("date", &kept)?];
    for name in value_columns(df, key) {
        let values = float_values(df, name)?;
        let means = groups
            .values()
            .map(|rows| mean(rows.iter().filter_map(|&row| values[row])))
            .collect();
        columns.push(float_column(name, means));
    }

    debug!(
        rows = df.height(),
        observed_days,
        kept_days = kept.len(),
        min_samples,
        "aggregated to daily means"
    );
    Ok(DataFrame::new(columns)?)
}

/// Sum of `value_col` for every day from the first to the last timestamp.
/// Days without observations sum to zero. Output columns: `date`,
/// `<value_col>_sum`.
pub fn daily_sums(df: &DataFrame, time_col: &str, value_col: &str) -> Result<DataFrame> {
    let days = date_values(df, time_col)?;
    let values = float_values(df, value_col)?;

    let (Some(first), Some(last)) = (
        days.iter().flatten().min().copied(),
        days.iter().flatten().max().copied(),
    ) else {
        return Ok(DataFrame::new(vec![
            date_column("date", &[])?,
            float_column(&format!("{value_col}_sum"), Vec::new()),
        ])?);
    };

    let range = date_range(first, last);
    let mut sums = vec![0.0; range.len()];
    for (day, value) in days.iter().zip(values.iter()) {
        if let (Some(day), Some(value)) = (day, value) {
            sums[(*day - first).num_days() as usize] += value;
        }
    }

    Ok(DataFrame::new(vec![
        date_column("date", &range)?,
        float_column(
            &format!("{value_col}_sum"),
            sums.into_iter().map(Some).collect(),
        ),
    ])?)
}

/// Adds the `value` column of `sums` to `daily`, matched on `date`. Days of
/// `daily` without a sum get a missing value.
pub fn attach_daily_column(daily: &DataFrame, sums: &DataFrame, value: &str) -> Result<DataFrame> {
    let lookup: HashMap<NaiveDate, Option<f64>> = date_values(sums, "date")?
        .into_iter()
        .zip(float_values(sums, value)?)
        .filter_map(|(day, value)| day.map(|day| (day, value)))
        .collect();

    let aligned: Vec<Option<f64>> = date_values(daily, "date")?
        .into_iter()
        .map(|day| day.and_then(|day| lookup.get(&day).copied().flatten()))
        .collect();

    let mut output = daily.clone();
    output.with_column(float_column(value, aligned))?;
    Ok(output)
}

/// Extends a daily frame with every day of `start..=end`; added days carry
/// missing values. Rows come out sorted by `date`.
pub fn reindex_days(df: &DataFrame, start: NaiveDate, end: NaiveDate) -> Result<DataFrame> {
    let existing = date_values(df, "date")?;
    let mut index: BTreeSet<NaiveDate> = existing.iter().flatten().copied().collect();
    index.extend(date_range(start, end));

    let position: HashMap<NaiveDate, usize> = existing
        .iter()
        .enumerate()
        .filter_map(|(row, day)| day.map(|day| (day, row)))
        .collect();
    let days: Vec<NaiveDate> = index.into_iter().collect();

    let mut columns = vec![date_column("date", &days)?];
    for name in value_columns(df, "date") {
        let values = float_values(df, name)?;
        let reindexed = days
            .iter()
            .map(|day| position.get(day).and_then(|&row| values[row]))
            .collect();
        columns.push(float_column(name, reindexed));
    }

    Ok(DataFrame::new(columns)?)
}
