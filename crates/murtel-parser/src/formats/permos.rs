use crate::errors::ParserError;
use crate::model::ParsedTable;
use crate::registry::TableParser;

use super::common::{csv_reader, next_header, read_timestamped_rows, RowSpec};

/// Columns of the PERMOS level-2 hourly product kept downstream.
pub const PERMOS_COLUMNS: [&str; 4] = ["airtemp", "surftemp", "snowh", "longout"];

/// PERMOS level-2 hourly station product for Murtel (1997 onwards).
#[derive(Debug, Default, Clone, Copy)]
pub struct PermosHourlyParser;

impl PermosHourlyParser {
    pub const NAME: &'static str = "PERMOS_L2_HOURLY";
}

impl TableParser for PermosHourlyParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();
        let header = next_header(Self::NAME, &mut records, "column header row")?;

        let position = |name: &str| {
            header
                .iter()
                .position(|label| label.eq_ignore_ascii_case(name))
        };

        let date_idx = position("date").ok_or_else(|| ParserError::FormatMismatch {
            parser: Self::NAME,
            reason: "header has no 'date' column".to_string(),
        })?;

        let mut keep = Vec::with_capacity(PERMOS_COLUMNS.len());
        for name in PERMOS_COLUMNS {
            let idx = position(name).ok_or_else(|| ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("header has no '{name}' column"),
            })?;
            keep.push((idx, name.to_string()));
        }

        let df = read_timestamped_rows(
            Self::NAME,
            records,
            &RowSpec {
                time_idx: date_idx,
                keep: &keep,
                extra_missing: &[],
                coerce: false,
            },
        )?;
        Ok(ParsedTable::new(Self::NAME, df))
    }
}
