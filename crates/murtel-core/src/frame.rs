//! Conversions between polars columns and plain vectors.
//!
//! Transforms in this crate operate on `Vec<Option<f64>>` and rebuild frames
//! afterwards, so every column crossing that boundary goes through here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

use crate::error::{PipelineError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect())
}

/// Reads a `Datetime` (any unit) or `Date` column as naive timestamps.
/// Dates map to midnight.
pub fn datetime_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = column.cast(&DataType::Int64)?;
            Ok(raw
                .i64()?
                .into_iter()
                .map(|value| value.and_then(|v| from_time_unit(v, unit)))
                .collect())
        }
        DataType::Date => Ok(date_values(df, name)?
            .into_iter()
            .map(|day| day.map(|d| d.and_time(NaiveTime::MIN)))
            .collect()),
        other => Err(PipelineError::Validation(format!(
            "column '{name}' has type {other}, expected a timestamp"
        ))),
    }
}

/// Calendar day of every row of a `Date` or `Datetime` column.
pub fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Date => {
            let raw = column.cast(&DataType::Int32)?;
            Ok(raw
                .i32()?
                .into_iter()
                .map(|value| value.and_then(date_from_days))
                .collect())
        }
        DataType::Datetime(_, _) => Ok(datetime_values(df, name)?
            .into_iter()
            .map(|value| value.map(|dt| dt.date()))
            .collect()),
        other => Err(PipelineError::Validation(format!(
            "column '{name}' has type {other}, expected a date"
        ))),
    }
}

pub fn datetime_column(name: &str, values: &[Option<NaiveDateTime>]) -> Result<Column> {
    let micros: Vec<Option<i64>> = values
        .iter()
        .map(|value| value.map(|dt| dt.and_utc().timestamp_micros()))
        .collect();
    let series = Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(series.into())
}

pub fn date_column(name: &str, values: &[NaiveDate]) -> Result<Column> {
    let days: Vec<i32> = values.iter().map(|day| days_since_epoch(*day)).collect();
    let series = Series::new(name.into(), days).cast(&DataType::Date)?;
    Ok(series.into())
}

pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

pub fn days_since_epoch(day: NaiveDate) -> i32 {
    let seconds = day.and_time(NaiveTime::MIN).and_utc().timestamp();
    seconds.div_euclid(SECONDS_PER_DAY) as i32
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    DateTime::from_timestamp(i64::from(days) * SECONDS_PER_DAY, 0).map(|dt| dt.date_naive())
}

fn from_time_unit(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let datetime = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    datetime.map(|dt| dt.naive_utc())
}
