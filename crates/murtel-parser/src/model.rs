use std::fmt;

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;

/// A vendor file decoded into a typed frame.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub format: &'static str,
    pub file_hash: String,
    pub station: Option<String>,
    pub df: DataFrame,
}

impl ParsedTable {
    pub fn new(format: &'static str, df: DataFrame) -> Self {
        Self {
            format,
            file_hash: String::new(),
            station: None,
            df,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Temperature,
}

impl Axis {
    pub fn prefix(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Temperature => "tempc",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl TryFrom<&str> for Axis {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            "tempc" | "temp" | "t" => Ok(Axis::Temperature),
            other => Err(format!("unknown SAA axis '{other}'")),
        }
    }
}

/// Samples of one quantity for every SAA node, stored node-major:
/// `columns[node][sample]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMatrix {
    columns: Vec<Vec<Option<f64>>>,
}

impl NodeMatrix {
    pub fn new(columns: Vec<Vec<Option<f64>>>) -> Self {
        Self { columns }
    }

    pub fn with_nodes(node_count: usize, capacity: usize) -> Self {
        Self {
            columns: (0..node_count)
                .map(|_| Vec::with_capacity(capacity))
                .collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.columns.len()
    }

    pub fn sample_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn node(&self, index: usize) -> Option<&[Option<f64>]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &[Option<f64>]> {
        self.columns.iter().map(Vec::as_slice)
    }

    pub(crate) fn push_value(&mut self, node: usize, value: Option<f64>) {
        if let Some(column) = self.columns.get_mut(node) {
            column.push(value);
        }
    }

    pub fn extend(&mut self, other: &NodeMatrix) {
        for (column, extra) in self.columns.iter_mut().zip(other.columns.iter()) {
            column.extend_from_slice(extra);
        }
    }

    /// Applies `f` to every node column independently.
    pub fn map_nodes<F>(&self, mut f: F) -> NodeMatrix
    where
        F: FnMut(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        NodeMatrix {
            columns: self.columns.iter().map(|column| f(column)).collect(),
        }
    }
}

/// Cartesian output of one shape-accelerometer-array export period.
#[derive(Debug, Clone, Default)]
pub struct SaaRecord {
    pub file_hash: String,
    pub time: Vec<NaiveDateTime>,
    pub x: NodeMatrix,
    pub y: NodeMatrix,
    /// Metres, already shifted by the array's installation offset.
    pub z: NodeMatrix,
    pub temperature: Option<NodeMatrix>,
}

impl SaaRecord {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.x.node_count()
    }
}
