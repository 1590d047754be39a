use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{StringRecord, StringRecordsIter};
use polars::prelude::*;

use crate::errors::ParserError;

/// Cell contents treated as missing by every reader.
pub(crate) const MISSING_TOKENS: &[&str] = &["", "na", "nan", "-"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

pub(crate) fn csv_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes())
}

pub(crate) fn next_header(
    parser: &'static str,
    records: &mut StringRecordsIter<'_, &[u8]>,
    what: &str,
) -> Result<StringRecord, ParserError> {
    records
        .next()
        .ok_or_else(|| ParserError::FormatMismatch {
            parser,
            reason: format!("file missing {what}"),
        })?
        .map_err(|err| ParserError::Csv {
            parser,
            source: err,
        })
}

pub(crate) fn is_missing(value: &str, extra_missing: &[&str]) -> bool {
    let trimmed = value.trim().trim_matches('"');
    MISSING_TOKENS
        .iter()
        .chain(extra_missing.iter())
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

pub(crate) fn looks_like_time_label(label: &str) -> bool {
    let lower = label.trim().to_ascii_lowercase();
    lower.contains("time") || lower.contains("date")
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim().trim_matches('"');
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

pub(crate) fn parse_timestamp(
    parser: &'static str,
    value: &str,
    line_index: usize,
) -> Result<i64, ParserError> {
    parse_datetime(value)
        .map(|dt| dt.and_utc().timestamp_micros())
        .ok_or_else(|| ParserError::DataRow {
            parser,
            line_index,
            message: format!("invalid timestamp '{}'", value.trim()),
        })
}

pub(crate) fn parse_optional_f64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
    extra_missing: &[&str],
) -> Result<Option<f64>, ParserError> {
    if is_missing(value, extra_missing) {
        return Ok(None);
    }

    let trimmed = value.trim().trim_matches('"');
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => Ok(None),
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) => Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        }),
    }
}

pub(crate) fn parse_required_i64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<i64, ParserError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|err| ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as integer: {err}"),
        })
}

pub(crate) fn datetime_series(name: &str, micros: Vec<i64>) -> PolarsResult<Series> {
    Series::new(name.into(), micros).cast(&DataType::Datetime(TimeUnit::Microseconds, None))
}

/// Accumulates a timestamp column plus any number of float columns, row by
/// row, in header order.
pub(crate) struct FrameBuilder {
    time_name: String,
    timestamps: Vec<i64>,
    names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl FrameBuilder {
    pub fn new(time_name: impl Into<String>, names: Vec<String>) -> Self {
        let values = names.iter().map(|_| Vec::new()).collect();
        Self {
            time_name: time_name.into(),
            timestamps: Vec::new(),
            names,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn push_row(
        &mut self,
        parser: &'static str,
        line_index: usize,
        timestamp: i64,
        row: Vec<Option<f64>>,
    ) -> Result<(), ParserError> {
        if row.len() != self.names.len() {
            return Err(ParserError::DataRow {
                parser,
                line_index,
                message: format!(
                    "expected {} value columns but found {}",
                    self.names.len(),
                    row.len()
                ),
            });
        }
        self.timestamps.push(timestamp);
        for (column, value) in self.values.iter_mut().zip(row) {
            column.push(value);
        }
        Ok(())
    }

    pub fn build(self, parser: &'static str) -> Result<DataFrame, ParserError> {
        if self.timestamps.is_empty() {
            return Err(ParserError::EmptyData { parser });
        }

        let mut columns: Vec<Column> = Vec::with_capacity(self.names.len() + 1);
        let time = datetime_series(&self.time_name, self.timestamps).map_err(|err| {
            ParserError::Validation {
                parser,
                message: format!("failed to cast {} column: {err}", self.time_name),
            }
        })?;
        columns.push(time.into());

        for (name, data) in self.names.iter().zip(self.values) {
            columns.push(Series::new(name.as_str().into(), data).into());
        }

        DataFrame::new(columns).map_err(|err| ParserError::Validation {
            parser,
            message: format!("failed to build dataframe: {err}"),
        })
    }
}

/// Layout of a single-header-row station table.
pub(crate) struct RowSpec<'a> {
    pub time_idx: usize,
    /// Columns to keep, by index, with their output name.
    pub keep: &'a [(usize, String)],
    pub extra_missing: &'a [&'a str],
    /// Unparseable numbers become missing instead of failing the file.
    pub coerce: bool,
}

/// Reads the data rows below a single header row into a frame with a `date`
/// timestamp column followed by the kept value columns.
pub(crate) fn read_timestamped_rows(
    parser: &'static str,
    records: StringRecordsIter<'_, &[u8]>,
    spec: &RowSpec<'_>,
) -> Result<DataFrame, ParserError> {
    let names = spec.keep.iter().map(|(_, name)| name.clone()).collect();
    let mut builder = FrameBuilder::new("date", names);

    for (row_idx, record) in records.enumerate() {
        let record = record.map_err(|err| ParserError::Csv {
            parser,
            source: err,
        })?;
        let line_index = row_idx + 2;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let timestamp = parse_timestamp(
            parser,
            record.get(spec.time_idx).unwrap_or_default(),
            line_index,
        )?;
        let mut row = Vec::with_capacity(builder.width());
        for (idx, name) in spec.keep {
            let value = record.get(*idx).unwrap_or_default();
            let parsed = parse_optional_f64(parser, value, line_index, name, spec.extra_missing);
            match parsed {
                Ok(parsed) => row.push(parsed),
                Err(_) if spec.coerce => row.push(None),
                Err(err) => return Err(err),
            }
        }
        builder.push_row(parser, line_index, timestamp, row)?;
    }

    builder.build(parser)
}
