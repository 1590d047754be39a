use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{Axis, NodeMatrix, SaaRecord};

use super::common::{csv_reader, next_header, parse_optional_f64, parse_required_i64};

/// Vertical offset of the array head below the reference level, in metres.
pub const SAA_DEPTH_OFFSET_M: f64 = 40.0;

/// The SAA software counts milliseconds from 1980-01-01 00:00:00.
pub fn saa_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1980, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnRole {
    Millis,
    Node { axis: Axis, node: usize },
}

/// Cartesian export of a shape-accelerometer array: `ms` followed by
/// `x_<i>`, `y_<i>`, `z_<i>` and optionally `tempc_<i>` for each node `i`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaaCartesianParser;

impl SaaCartesianParser {
    pub const NAME: &'static str = "SAA_CARTESIAN";

    fn classify_column(column: &str) -> Result<ColumnRole, ParserError> {
        let trimmed = column.trim();
        if trimmed.eq_ignore_ascii_case("ms") {
            return Ok(ColumnRole::Millis);
        }

        let (prefix, index) = trimmed
            .rsplit_once('_')
            .ok_or_else(|| ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("unrecognized column '{trimmed}'"),
            })?;
        let axis = Axis::try_from(prefix).map_err(|reason| ParserError::FormatMismatch {
            parser: Self::NAME,
            reason,
        })?;
        let node = index
            .parse::<usize>()
            .map_err(|_| ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("column '{trimmed}' has no node index"),
            })?;
        Ok(ColumnRole::Node { axis, node })
    }

    fn node_count(roles: &[ColumnRole], axis: Axis) -> Result<usize, ParserError> {
        let mut nodes: Vec<usize> = roles
            .iter()
            .filter_map(|role| match role {
                ColumnRole::Node { axis: a, node } if *a == axis => Some(*node),
                _ => None,
            })
            .collect();
        nodes.sort_unstable();
        for (expected, found) in nodes.iter().enumerate() {
            if *found != expected {
                return Err(ParserError::InvalidHeader {
                    parser: Self::NAME,
                    row_index: 1,
                    message: format!(
                        "{axis} columns must number nodes 0..n without gaps or repeats"
                    ),
                });
            }
        }
        Ok(nodes.len())
    }

    fn classify_columns(header: &StringRecord) -> Result<(Vec<ColumnRole>, usize), ParserError> {
        let roles: Vec<ColumnRole> = header
            .iter()
            .map(Self::classify_column)
            .collect::<Result<_, _>>()?;

        if roles.iter().filter(|role| **role == ColumnRole::Millis).count() != 1 {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "expected exactly one 'ms' column".to_string(),
            });
        }

        let nodes = Self::node_count(&roles, Axis::X)?;
        if nodes == 0 {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "no node columns found".to_string(),
            });
        }
        for axis in [Axis::Y, Axis::Z] {
            let count = Self::node_count(&roles, axis)?;
            if count != nodes {
                return Err(ParserError::Validation {
                    parser: Self::NAME,
                    message: format!("{axis} has {count} nodes but x has {nodes}"),
                });
            }
        }
        let temperature_nodes = Self::node_count(&roles, Axis::Temperature)?;
        if temperature_nodes != 0 && temperature_nodes != nodes {
            return Err(ParserError::Validation {
                parser: Self::NAME,
                message: format!("tempc has {temperature_nodes} nodes but x has {nodes}"),
            });
        }

        Ok((roles, nodes))
    }

    pub fn parse(&self, content: &str) -> Result<SaaRecord, ParserError> {
        let mut reader = csv_reader(content);
        let mut records = reader.records();
        let header = next_header(Self::NAME, &mut records, "column header row")?;
        let (roles, nodes) = Self::classify_columns(&header)?;
        let has_temperature = roles.iter().any(|role| {
            matches!(
                role,
                ColumnRole::Node {
                    axis: Axis::Temperature,
                    ..
                }
            )
        });

        let epoch = saa_epoch();
        let mut time = Vec::new();
        let mut x = NodeMatrix::with_nodes(nodes, 0);
        let mut y = NodeMatrix::with_nodes(nodes, 0);
        let mut z = NodeMatrix::with_nodes(nodes, 0);
        let mut temperature = NodeMatrix::with_nodes(if has_temperature { nodes } else { 0 }, 0);

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2;

            if record.len() != roles.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} columns but found {}",
                        roles.len(),
                        record.len()
                    ),
                });
            }

            for (idx, role) in roles.iter().enumerate() {
                let header_name = header.get(idx).unwrap_or_default();
                let value = record.get(idx).unwrap_or_default();
                match role {
                    ColumnRole::Millis => {
                        // exports occasionally write integral millis as floats; rounded to
                        // the nearest millisecond, not truncated
                        let millis = match value.trim().parse::<f64>() {
                            Ok(parsed) if parsed.is_finite() => parsed.round() as i64,
                            _ => parse_required_i64(Self::NAME, value, line_index, header_name)?,
                        };
                        let timestamp = Duration::try_milliseconds(millis)
                            .and_then(|offset| epoch.checked_add_signed(offset))
                            .ok_or_else(|| ParserError::DataRow {
                                parser: Self::NAME,
                                line_index,
                                message: format!("ms out of range: {value}"),
                            })?;
                        time.push(timestamp);
                    }
                    ColumnRole::Node { axis, node } => {
                        let parsed =
                            parse_optional_f64(Self::NAME, value, line_index, header_name, &[])?;
                        match axis {
                            Axis::X => x.push_value(*node, parsed),
                            Axis::Y => y.push_value(*node, parsed),
                            Axis::Z => z.push_value(
                                *node,
                                parsed.map(|mm| mm / 1000.0 - SAA_DEPTH_OFFSET_M),
                            ),
                            Axis::Temperature => temperature.push_value(*node, parsed),
                        }
                    }
                }
            }
        }

        if time.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        Ok(SaaRecord {
            file_hash: String::new(),
            time,
            x,
            y,
            z,
            temperature: has_temperature.then_some(temperature),
        })
    }
}
