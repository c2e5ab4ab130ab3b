//!
//! The host-side value domain that crosses the `TableResolver` boundary.
//!
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Real(_))
    }

    /// Whether this value, if numeric, has a zero fractional part. Non-numeric
    /// values are not whole-valued.
    pub fn is_whole_valued(&self) -> bool {
        match self {
            CellValue::Int(_) => true,
            CellValue::Real(v) => v.fract() == 0.0,
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Real(v) => write!(f, "{v}"),
            CellValue::Text(v) => write!(f, "{v}"),
            CellValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}

impl From<&CellValue> for rusqlite::types::Value {
    fn from(value: &CellValue) -> Self {
        use rusqlite::types::Value as SqlValue;
        match value {
            CellValue::Null => SqlValue::Null,
            CellValue::Bool(v) => SqlValue::Integer(*v as i64),
            CellValue::Int(v) => SqlValue::Integer(*v),
            CellValue::Real(v) => SqlValue::Real(*v),
            CellValue::Text(v) => SqlValue::Text(v.clone()),
            CellValue::DateTime(v) => SqlValue::Text(v.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

impl From<rusqlite::types::Value> for CellValue {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value as SqlValue;
        match value {
            SqlValue::Null => CellValue::Null,
            SqlValue::Integer(v) => CellValue::Int(v),
            SqlValue::Real(v) => CellValue::Real(v),
            SqlValue::Text(v) => CellValue::Text(v),
            SqlValue::Blob(v) => CellValue::Text(String::from_utf8_lossy(&v).into_owned()),
        }
    }
}
