use crate::errors::ParserError;
use crate::model::ParsedTable;
use crate::registry::TableParser;

use super::common::{csv_reader, next_header, read_timestamped_rows, RowSpec};

/// Positional names of the Corvatsch87 station export (2019 onwards).
pub const CORVATSCH87_COLUMNS: [&str; 15] = [
    "date",
    "airtemp",
    "RH",
    "VWND1",
    "DWND1",
    "VWND1_MAX",
    "LWRup",
    "LWRdown",
    "LWRnet",
    "SWRup",
    "SWRdown",
    "SWRnet",
    "snowh",
    "surftemp",
    "PLU_SUM10",
];

/// The logger writes 6999 for failed measurements.
const SENTINELS: &[&str] = &["6999", "6999.0", "6999.00"];

#[derive(Debug, Default, Clone, Copy)]
pub struct Corvatsch87Parser;

impl Corvatsch87Parser {
    pub const NAME: &'static str = "CORVATSCH87_MET";
}

impl TableParser for Corvatsch87Parser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();
        let header = next_header(Self::NAME, &mut records, "column header row")?;

        let first = header.get(0).unwrap_or_default();
        if !first.eq_ignore_ascii_case("timestamp") {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("expected first column 'TimeStamp', found '{first}'"),
            });
        }
        if header.len() != CORVATSCH87_COLUMNS.len() {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!(
                    "expected {} columns, found {}",
                    CORVATSCH87_COLUMNS.len(),
                    header.len()
                ),
            });
        }

        let keep: Vec<(usize, String)> = CORVATSCH87_COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        let df = read_timestamped_rows(
            Self::NAME,
            records,
            &RowSpec {
                time_idx: 0,
                keep: &keep,
                extra_missing: SENTINELS,
                coerce: false,
            },
        )?;
        Ok(ParsedTable::new(Self::NAME, df))
    }
}
