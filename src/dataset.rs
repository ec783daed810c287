//! In-memory dataset model: cell values, rows and the dataset itself.

use serde::de::MapAccess;
use serde::de::Visitor;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::fmt;
use std::fmt::Display;

/// A single cell value as seen by lookups and the cache.
///
/// Serialized untagged, so a cached row reads as a plain JSON object of
/// strings, numbers and nulls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Returns true for `Empty`
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl Display for CellValue {
    /// Numbers print in shortest round-trip form (`12345`, `1.5`), empty cells as "".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Text(value) => f.write_str(value),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One record: column name to cell value, in header order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self { cells }
    }

    /// Gets the value stored under an exact column name
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in header order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<const N: usize> From<[(&str, CellValue); N]> for Row {
    fn from(cells: [(&str, CellValue); N]) -> Self {
        Row::new(cells.into_iter().map(|(name, value)| (name.to_owned(), value)).collect())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.cells.iter().map(|(name, value)| (name, value)))
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

/// Keeps object keys in document order.
struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of column names to cell values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Row, A::Error> {
        let mut cells = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, CellValue>()? {
            cells.push((name, value));
        }
        Ok(Row { cells })
    }
}

/// Where the live dataset came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    LocalUpload,
    Cache,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Remote => "remote",
            SourceKind::LocalUpload => "local-upload",
            SourceKind::Cache => "cache",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered rows from one source plus their provenance.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
    label: String,
    kind: SourceKind,
}

impl Dataset {
    pub fn new(rows: Vec<Row>, label: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            rows,
            label: label.into(),
            kind,
        }
    }

    /// The placeholder held by a session before any load, or after a failed one
    pub fn empty(kind: SourceKind) -> Self {
        Self::new(Vec::new(), String::new(), kind)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Column names of the first row; empty for an empty dataset
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.columns().collect())
            .unwrap_or_default()
    }

    /// Provenance label (file name or URL basename); empty when unknown
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
