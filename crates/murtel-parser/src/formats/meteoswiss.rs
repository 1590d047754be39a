use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::ParsedTable;
use crate::registry::TableParser;

use super::common::{datetime_series, parse_optional_f64, parse_required_i64};

const PREAMBLE_LINES: usize = 8;
const KEY_COLUMNS: [&str; 6] = ["STA", "JAHR", "MO", "TG", "HH", "MM"];

/// MeteoSwiss IDAWEB text export: a fixed preamble, a whitespace-separated
/// header `STA JAHR MO TG HH MM <parameter>` and one row per measurement.
///
/// The first row below the header carries the parameter description rather
/// than data and is always discarded.
#[derive(Debug, Default, Clone)]
pub struct MeteoSwissParser {
    value_name: Option<String>,
}

impl MeteoSwissParser {
    pub const NAME: &'static str = "METEOSWISS_IDAWEB";

    /// Names the value column instead of keeping the parameter code.
    pub fn with_value_name(value_name: impl Into<String>) -> Self {
        Self {
            value_name: Some(value_name.into()),
        }
    }

    fn validate_header(fields: &[&str]) -> Result<(), ParserError> {
        if fields.len() != KEY_COLUMNS.len() + 1 {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!(
                    "expected {} header fields, found {}",
                    KEY_COLUMNS.len() + 1,
                    fields.len()
                ),
            });
        }
        for (found, expected) in fields.iter().zip(KEY_COLUMNS.iter()) {
            if !found.eq_ignore_ascii_case(expected) {
                return Err(ParserError::FormatMismatch {
                    parser: Self::NAME,
                    reason: format!("expected header field '{expected}', found '{found}'"),
                });
            }
        }
        Ok(())
    }
}

impl TableParser for MeteoSwissParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut lines = content
            .lines()
            .enumerate()
            .skip(PREAMBLE_LINES)
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or_else(|| ParserError::FormatMismatch {
            parser: Self::NAME,
            reason: "file ended inside the preamble".to_string(),
        })?;
        let header: Vec<&str> = header_line.split_whitespace().collect();
        Self::validate_header(&header)?;

        let value_name = self
            .value_name
            .clone()
            .unwrap_or_else(|| header[KEY_COLUMNS.len()].to_string());

        // description row
        lines.next();

        let mut station: Option<String> = None;
        let mut timestamps = Vec::new();
        let mut years = Vec::new();
        let mut months = Vec::new();
        let mut days = Vec::new();
        let mut values = Vec::new();

        for (line_no, line) in lines {
            let line_index = line_no + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != header.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} fields but found {}",
                        header.len(),
                        fields.len()
                    ),
                });
            }

            if station.is_none() {
                station = Some(fields[0].to_string());
            }

            let year = date_part(fields[1], line_index, "JAHR")?;
            let month = date_part(fields[2], line_index, "MO")?;
            let day = date_part(fields[3], line_index, "TG")?;
            let date = u32::try_from(month)
                .ok()
                .zip(u32::try_from(day).ok())
                .and_then(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
                .ok_or_else(|| ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!("invalid calendar date {year}-{month}-{day}"),
                })?;

            timestamps.push(date.and_time(NaiveTime::MIN).and_utc().timestamp_micros());
            years.push(year);
            months.push(month);
            days.push(day);
            values.push(parse_optional_f64(
                Self::NAME,
                fields[KEY_COLUMNS.len()],
                line_index,
                &value_name,
                &[],
            )?);
        }

        if timestamps.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let date = datetime_series("date", timestamps).map_err(|err| ParserError::Validation {
            parser: Self::NAME,
            message: format!("failed to cast date column: {err}"),
        })?;
        let df = DataFrame::new(vec![
            date.into(),
            Series::new("JAHR".into(), years).into(),
            Series::new("MO".into(), months).into(),
            Series::new("TG".into(), days).into(),
            Series::new(value_name.as_str().into(), values).into(),
        ])
        .map_err(|err| ParserError::Validation {
            parser: Self::NAME,
            message: format!("failed to build dataframe: {err}"),
        })?;

        let mut parsed = ParsedTable::new(Self::NAME, df);
        parsed.station = station;
        Ok(parsed)
    }
}

/// Integer date field that must fit the `Int32` output columns.
fn date_part(value: &str, line_index: usize, column: &str) -> Result<i32, ParserError> {
    let parsed = parse_required_i64(MeteoSwissParser::NAME, value, line_index, column)?;
    i32::try_from(parsed).map_err(|_| ParserError::DataRow {
        parser: MeteoSwissParser::NAME,
        line_index,
        message: format!("{column} value {parsed} out of range"),
    })
}
