use chrono::{Months, NaiveDate, NaiveDateTime};
use murtel_parser::{Axis, NodeMatrix, SaaRecord};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calendar::date_range;
use crate::config::{datetime_format, optional_datetime_format};
use crate::error::{PipelineError, Result};
use crate::frame::{date_column, datetime_column, float_column};

/// 15 samples at the 8-hour SAA interval is a 5-day window.
pub const DEFAULT_SMOOTH_WINDOW: usize = 15;

pub fn default_reference_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 1, 6)
        .and_then(|date| date.and_hms_opt(12, 5, 0))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationOptions {
    /// Reference sample; every displacement is relative to it.
    #[serde(with = "datetime_format")]
    pub start: NaiveDateTime,
    pub one_year: bool,
    pub smooth: bool,
    pub daily: bool,
    pub smooth_window: usize,
    /// Keep only rows strictly after this time.
    #[serde(
        with = "optional_datetime_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub clip_after: Option<NaiveDateTime>,
    /// Keep only rows strictly before this time.
    #[serde(
        with = "optional_datetime_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub clip_before: Option<NaiveDateTime>,
}

impl Default for DeformationOptions {
    fn default() -> Self {
        Self {
            start: default_reference_time(),
            one_year: false,
            smooth: true,
            daily: true,
            smooth_window: DEFAULT_SMOOTH_WINDOW,
            clip_after: None,
            clip_before: None,
        }
    }
}

/// Displacement of every node relative to the reference sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Components {
    pub x1: NodeMatrix,
    pub y1: NodeMatrix,
    pub z1: NodeMatrix,
}

impl Components {
    pub fn axes(&self) -> [(Axis, &NodeMatrix); 3] {
        [(Axis::X, &self.x1), (Axis::Y, &self.y1), (Axis::Z, &self.z1)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyLast {
    pub days: Vec<NaiveDate>,
    /// Last sample time of each day; `None` for days without samples.
    pub time: Vec<Option<NaiveDateTime>>,
    pub values: NodeMatrix,
}

pub struct DeformationOutput {
    pub total: DataFrame,
    pub components: Vec<(Axis, DataFrame)>,
}

/// Appends export periods in the order given.
pub fn concat_periods(parts: Vec<SaaRecord>) -> Result<SaaRecord> {
    let mut parts = parts.into_iter();
    let Some(mut combined) = parts.next() else {
        return Err(PipelineError::Validation(
            "no SAA periods to combine".to_string(),
        ));
    };

    for part in parts {
        if part.node_count() != combined.node_count() {
            return Err(PipelineError::Validation(format!(
                "SAA period has {} nodes, expected {}",
                part.node_count(),
                combined.node_count()
            )));
        }
        if let (Some(previous), Some(next)) = (combined.time.last(), part.time.first()) {
            if next <= previous {
                warn!(%previous, %next, "SAA periods overlap or are out of order");
            }
        }

        combined.time.extend_from_slice(&part.time);
        combined.x.extend(&part.x);
        combined.y.extend(&part.y);
        combined.z.extend(&part.z);
        combined.temperature = match (combined.temperature.take(), part.temperature) {
            (Some(mut temperature), Some(extra)) => {
                temperature.extend(&extra);
                Some(temperature)
            }
            _ => None,
        };
    }

    Ok(combined)
}

/// Absolute mean elevation of each node, i.e. its depth below the surface.
pub fn mean_depths(z: &NodeMatrix) -> Vec<Option<f64>> {
    z.nodes()
        .map(|values| {
            let (sum, count) = values
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
            (count > 0).then(|| (sum / count as f64).abs())
        })
        .collect()
}

pub fn reference_index(times: &[NaiveDateTime], start: NaiveDateTime) -> Result<usize> {
    times
        .iter()
        .position(|time| *time == start)
        .ok_or(PipelineError::ReferenceTimeNotFound(start))
}

fn subtract_reference(matrix: &NodeMatrix, reference: usize) -> NodeMatrix {
    matrix.map_nodes(|values| {
        let base = values.get(reference).copied().flatten();
        values
            .iter()
            .map(|value| match (value, base) {
                (Some(value), Some(base)) => Some(value - base),
                _ => None,
            })
            .collect()
    })
}

pub fn relative_components(record: &SaaRecord, start: NaiveDateTime) -> Result<Components> {
    let reference = reference_index(&record.time, start)?;
    debug!(reference, %start, "located SAA reference sample");

    Ok(Components {
        x1: subtract_reference(&record.x, reference),
        y1: subtract_reference(&record.y, reference),
        z1: subtract_reference(&record.z, reference),
    })
}

/// Horizontal displacement magnitude `sqrt(x1^2 + y1^2)` per sample and node.
pub fn total_horizontal(record: &SaaRecord, start: NaiveDateTime) -> Result<NodeMatrix> {
    let components = relative_components(record, start)?;
    Ok(horizontal_magnitude(&components))
}

fn horizontal_magnitude(components: &Components) -> NodeMatrix {
    let columns = components
        .x1
        .nodes()
        .zip(components.y1.nodes())
        .map(|(x, y)| {
            x.iter()
                .zip(y.iter())
                .map(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => Some(x.hypot(*y)),
                    _ => None,
                })
                .collect()
        })
        .collect();
    NodeMatrix::new(columns)
}

/// Centered moving mean over `window` samples ignoring missing values. The
/// window reaches `window / 2` samples back and `(window - 1) / 2` forward.
/// Positions with fewer than `min_periods` observations stay missing.
pub fn rolling_mean_centered(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    if window == 0 {
        return values.to_vec();
    }
    let before = window / 2;
    let after = (window - 1) / 2;
    let min_periods = min_periods.max(1);
    let last = values.len().saturating_sub(1);

    (0..values.len())
        .map(|idx| {
            let lo = idx.saturating_sub(before);
            let hi = (idx + after).min(last);
            let (sum, count) = values[lo..=hi]
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
            (count >= min_periods).then(|| sum / count as f64)
        })
        .collect()
}

/// One row per calendar day between the first and last sample. Each node
/// keeps its last observed value of the day.
pub fn resample_daily_last(times: &[NaiveDateTime], values: &NodeMatrix) -> DailyLast {
    let (Some(first), Some(last)) = (times.iter().min(), times.iter().max()) else {
        return DailyLast {
            days: Vec::new(),
            time: Vec::new(),
            values: NodeMatrix::with_nodes(values.node_count(), 0),
        };
    };
    let first_day = first.date();
    let days = date_range(first_day, last.date());
    let bucket_of = |time: &NaiveDateTime| (time.date() - first_day).num_days() as usize;

    let mut day_time = vec![None; days.len()];
    for time in times {
        day_time[bucket_of(time)] = Some(*time);
    }

    let columns = values
        .nodes()
        .map(|node| {
            let mut daily = vec![None; days.len()];
            for (time, value) in times.iter().zip(node.iter()) {
                if let Some(value) = value {
                    daily[bucket_of(time)] = Some(*value);
                }
            }
            daily
        })
        .collect();

    DailyLast {
        days,
        time: day_time,
        values: NodeMatrix::new(columns),
    }
}

/// Keeps rows with `start <= time < start + 1 year`.
pub fn clip_one_year(df: DataFrame, start: NaiveDateTime) -> Result<DataFrame> {
    let end = start.checked_add_months(Months::new(12)).ok_or_else(|| {
        PipelineError::Processing(format!("cannot add one year to {start}"))
    })?;
    let predicate = col("time").gt_eq(lit(start)).and(col("time").lt(lit(end)));
    Ok(df.lazy().filter(predicate).collect()?)
}

/// Drops rows at or before `after` and at or after `before`.
pub fn clip_window(
    df: DataFrame,
    after: Option<NaiveDateTime>,
    before: Option<NaiveDateTime>,
) -> Result<DataFrame> {
    let lower = after.map(|after| col("time").gt(lit(after)));
    let upper = before.map(|before| col("time").lt(lit(before)));
    let predicate = match (lower, upper) {
        (Some(lower), Some(upper)) => lower.and(upper),
        (Some(bound), None) | (None, Some(bound)) => bound,
        (None, None) => return Ok(df),
    };
    Ok(df.lazy().filter(predicate).collect()?)
}

/// Node columns `0..n` followed by `time`, optionally led by another column.
pub fn node_frame(
    leading: Option<Column>,
    matrix: &NodeMatrix,
    time: &[Option<NaiveDateTime>],
) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(matrix.node_count() + 2);
    columns.extend(leading);
    for (node, values) in matrix.nodes().enumerate() {
        columns.push(float_column(&node.to_string(), values.to_vec()));
    }
    columns.push(datetime_column("time", time)?);
    Ok(DataFrame::new(columns)?)
}

pub fn mean_depths_frame(depths: &[Option<f64>]) -> Result<DataFrame> {
    let nodes: Vec<i64> = (0..depths.len() as i64).collect();
    let columns = vec![
        Column::from(Series::new("node".into(), nodes)),
        float_column("depth_m", depths.to_vec()),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Reduces a combined SAA record to total horizontal deformation and the
/// per-axis relative components.
pub fn reduce_deformation(
    record: &SaaRecord,
    options: &DeformationOptions,
) -> Result<DeformationOutput> {
    let components = relative_components(record, options.start)?;
    let mut total = horizontal_magnitude(&components);

    if options.smooth {
        total = total.map_nodes(|values| rolling_mean_centered(values, options.smooth_window, 1));
        debug!(window = options.smooth_window, "smoothed total deformation");
    }

    let mut total_df = if options.daily {
        let daily = resample_daily_last(&record.time, &total);
        info!(
            samples = record.len(),
            days = daily.days.len(),
            "resampled deformation to daily"
        );
        node_frame(
            Some(date_column("date", &daily.days)?),
            &daily.values,
            &daily.time,
        )?
    } else {
        let times: Vec<Option<NaiveDateTime>> = record.time.iter().copied().map(Some).collect();
        node_frame(None, &total, &times)?
    };

    if options.one_year {
        total_df = clip_one_year(total_df, options.start)?;
    }
    total_df = clip_window(total_df, options.clip_after, options.clip_before)?;

    let times: Vec<Option<NaiveDateTime>> = record.time.iter().copied().map(Some).collect();
    let mut component_frames = Vec::with_capacity(3);
    for (axis, matrix) in components.axes() {
        let frame = node_frame(None, matrix, &times)?;
        let frame = clip_window(frame, options.clip_after, options.clip_before)?;
        component_frames.push((axis, frame));
    }

    Ok(DeformationOutput {
        total: total_df,
        components: component_frames,
    })
}
