use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Canonical column labels expected by every downstream consumer, regardless
/// of how the source sheet named its columns.
pub const STATE_LABEL: &str = "State";
pub const P5_LABEL: &str = "5th Percentile";
pub const MEAN_LABEL: &str = "Mean";
pub const P95_LABEL: &str = "95th Percentile";

/// Population gender a data sheet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{}', expected male or female", other)),
        }
    }
}

/// A single cell as it arrived from the source, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Absent,
}

impl CellValue {
    /// A CSV field as read from a sheet export. Empty fields are missing data,
    /// not empty text.
    pub fn from_csv_field(field: &str) -> Self {
        if field.is_empty() {
            CellValue::Absent
        } else {
            CellValue::Text(field.to_string())
        }
    }

    /// Render the cell as text, or `None` when there is nothing to render.
    pub fn render(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Absent => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One row of a raw table, keyed by the source's own column labels.
pub type RawRow = HashMap<String, CellValue>;

/// A table exactly as fetched: source column labels in original order plus
/// the uncoerced rows. Nothing is guaranteed about the labels.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The source labels chosen for the three numeric roles, in
/// (5th percentile, mean, 95th percentile) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericColumns {
    pub p5: String,
    pub mean: String,
    pub p95: String,
}

impl NumericColumns {
    pub fn canonical() -> Self {
        NumericColumns {
            p5: P5_LABEL.to_string(),
            mean: MEAN_LABEL.to_string(),
            p95: P95_LABEL.to_string(),
        }
    }
}

/// One cleaned row. Serialized field names are the canonical labels, so CSV
/// and JSON exports match what the charting layer addresses columns by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "5th Percentile")]
    pub p5: Option<f64>,
    #[serde(rename = "Mean")]
    pub mean: Option<f64>,
    #[serde(rename = "95th Percentile")]
    pub p95: Option<f64>,
}

impl StatRow {
    /// Whether any of the three measurement values survived coercion.
    pub fn has_numeric(&self) -> bool {
        self.p5.is_some() || self.mean.is_some() || self.p95.is_some()
    }
}

/// A normalized table plus the column-identification outcome that produced
/// it. `numeric_columns` is `None` when no usable measurement columns were
/// found; the rows are then empty and the caller decides how to report that.
#[derive(Debug, Clone, Default)]
pub struct CleanedTable {
    pub rows: Vec<StatRow>,
    pub numeric_columns: Option<NumericColumns>,
    pub state_column: Option<String>,
}

impl CleanedTable {
    /// An empty table, the caller-side substitute for a failed fetch.
    pub fn empty() -> Self {
        CleanedTable::default()
    }

    pub fn has_numeric_data(&self) -> bool {
        self.numeric_columns.is_some() && !self.rows.is_empty()
    }

    /// Rows whose region label is one of `regions`, in table order.
    pub fn rows_for_regions<'a>(&'a self, regions: &[String]) -> Vec<&'a StatRow> {
        self.rows
            .iter()
            .filter(|row| {
                row.state
                    .as_ref()
                    .map(|s| regions.iter().any(|r| r == s))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Serialize the table as CSV with the canonical header.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.rows {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::DataError::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Serialize the rows as pretty JSON with the canonical field names.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }
}
