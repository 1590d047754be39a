use crate::errors::ParserError;
use crate::model::ParsedTable;
use crate::registry::TableParser;

use super::common::{
    csv_reader, looks_like_time_label, next_header, read_timestamped_rows, RowSpec,
};

/// Positional names of the PERMA-XT CR6 level-2 table.
pub const PERMA_XT_CR6_COLUMNS: [&str; 16] = [
    "date",
    "rec_num",
    "amb_press",
    "airtemp",
    "RH",
    "airtemp_107probe",
    "pluvio",
    "snow_height",
    "snow_surf_temp",
    "airtemp_25cm_above",
    "airtemp_50cm_above",
    "airtemp_100cm_above",
    "gst_70cm",
    "RH_70cm",
    "gt_2m",
    "RH_2m",
];

/// PERMA-XT CR6 logger, level-2 processed table.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermaXtCr6Parser;

impl PermaXtCr6Parser {
    pub const NAME: &'static str = "PERMA_XT_CR6_L2";
}

impl TableParser for PermaXtCr6Parser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();
        let header = next_header(Self::NAME, &mut records, "column header row")?;

        if header.len() != PERMA_XT_CR6_COLUMNS.len() {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!(
                    "expected {} columns, found {}",
                    PERMA_XT_CR6_COLUMNS.len(),
                    header.len()
                ),
            });
        }
        let first = header.get(0).unwrap_or_default();
        if !looks_like_time_label(first) {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("first column '{first}' is not a timestamp"),
            });
        }

        let keep: Vec<(usize, String)> = PERMA_XT_CR6_COLUMNS
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
                extra_missing: &[],
                coerce: false,
            },
        )?;
        Ok(ParsedTable::new(Self::NAME, df))
    }
}

/// PERMA-XT station export with a `TimeStamp` column and a `Pluvio`
/// precipitation gauge column. Every other column is kept under its own name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermaXtExportParser;

impl PermaXtExportParser {
    pub const NAME: &'static str = "PERMA_XT_EXPORT";
}

impl TableParser for PermaXtExportParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<ParsedTable, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();
        let header = next_header(Self::NAME, &mut records, "column header row")?;

        let time_idx = header
            .iter()
            .position(|label| label == "TimeStamp")
            .ok_or_else(|| ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "header has no 'TimeStamp' column".to_string(),
            })?;
        if !header.iter().any(|label| label == "Pluvio") {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "header has no 'Pluvio' column".to_string(),
            });
        }

        let keep: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != time_idx)
            .map(|(idx, label)| (idx, label.to_string()))
            .collect();

        let df = read_timestamped_rows(
            Self::NAME,
            records,
            &RowSpec {
                time_idx,
                keep: &keep,
                extra_missing: &[],
                coerce: true,
            },
        )?;
        Ok(ParsedTable::new(Self::NAME, df))
    }
}
