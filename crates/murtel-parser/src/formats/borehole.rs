use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::ParsedTable;
use crate::registry::TableParser;

use super::common::{csv_reader, next_header, parse_optional_f64, parse_timestamp, FrameBuilder};

/// Borehole thermistor chain export: `time` followed by one column per
/// sensor depth in metres.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoreholeTemperatureParser;

impl BoreholeTemperatureParser {
    pub const NAME: &'static str = "BOREHOLE_TEMPERATURE";

    fn classify_columns(header: &StringRecord) -> Result<Vec<String>, ParserError> {
        let first = header.get(0).unwrap_or_default();
        if !first.eq_ignore_ascii_case("time") {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("expected first column 'time', found '{first}'"),
            });
        }
        if header.len() < 2 {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "no depth columns after 'time'".to_string(),
            });
        }

        header
            .iter()
            .skip(1)
            .map(|label| match label.parse::<f64>() {
                Ok(depth) if depth.is_finite() => Ok(label.to_string()),
                _ => Err(ParserError::FormatMismatch {
                    parser: Self::NAME,
                    reason: format!("column '{label}' is not a depth in metres"),
                }),
            })
            .collect()
    }
}

impl TableParser for BoreholeTemperatureParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();

        let header = next_header(Self::NAME, &mut records, "column header row")?;
        let depths = Self::classify_columns(&header)?;
        let mut builder = FrameBuilder::new("time", depths.clone());

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2;

            if record.len() != header.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} columns but found {}",
                        header.len(),
                        record.len()
                    ),
                });
            }

            let timestamp =
                parse_timestamp(Self::NAME, record.get(0).unwrap_or_default(), line_index)?;
            let mut row = Vec::with_capacity(depths.len());
            for (idx, depth) in depths.iter().enumerate() {
                let value = record.get(idx + 1).unwrap_or_default();
                row.push(parse_optional_f64(Self::NAME, value, line_index, depth, &[])?);
            }
            builder.push_row(Self::NAME, line_index, timestamp, row)?;
        }

        let df = builder.build(Self::NAME)?;
        Ok(ParsedTable::new(Self::NAME, df))
    }
}
