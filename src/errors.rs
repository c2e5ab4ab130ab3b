//!
//! Error kinds returned by the query pipeline.
//!
use std::error::Error;
use std::fmt;

pub type Result<T> = std::result::Result<T, SqliteFnError>;

#[derive(Debug)]
pub enum SqliteFnError {
    TableNotFound(String),
    ColumnNotFound(String),
    DuplicateColumn(String),
    EmptyColumnName(Option<usize>),
    QuerySyntax(String),
    RangeResolution { reference: String, reason: String },
    EmptyRange(String),
    TypeInference { column: String, reason: String },
    Execution(String),
    Timeout(f64),
    OutputLimit { rows: usize, limit: usize },

    /// Keep the original engine error around for `source()`.
    Sqlite(rusqlite::Error),
}

impl fmt::Display for SqliteFnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqliteFnError::TableNotFound(name) => write!(f, "no such table: {name}"),
            SqliteFnError::ColumnNotFound(name) => write!(f, "no such column: {name}"),
            SqliteFnError::DuplicateColumn(name) => write!(f, "duplicate column name: {name}"),
            SqliteFnError::EmptyColumnName(Some(pos)) => {
                write!(f, "column name cannot be empty (position {pos})")
            }
            SqliteFnError::EmptyColumnName(None) => write!(f, "column name cannot be empty"),
            SqliteFnError::QuerySyntax(detail) => write!(f, "{detail}"),
            SqliteFnError::RangeResolution { reference, reason } => {
                write!(f, "cannot resolve range: {reference} ({reason})")
            }
            SqliteFnError::EmptyRange(reference) => {
                write!(f, "range contains no data: {reference}")
            }
            SqliteFnError::TypeInference { column, reason } => {
                write!(f, "cannot infer type for column '{column}': {reason}")
            }
            SqliteFnError::Execution(message) => write!(f, "{message}"),
            SqliteFnError::Timeout(secs) => {
                write!(f, "query execution timed out after {secs}s")
            }
            SqliteFnError::OutputLimit { rows, limit } => write!(
                f,
                "result set too large: {rows} rows (limit: {limit}). Use LIMIT clause to reduce output."
            ),
            SqliteFnError::Sqlite(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SqliteFnError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SqliteFnError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

/// Render any error through the canonical `Error: <body>` textual form used by
/// the public entry point — the public call never raises, it only returns text.
pub fn render(err: &SqliteFnError) -> String {
    format!("Error: {err}")
}

/// Normalize a raw engine error per the rules in the error handling design:
/// `no such table:` / `no such column:` prefixes and `syntax error` substrings
/// are reclassified; everything else keeps the engine's own message.
impl From<rusqlite::Error> for SqliteFnError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if let Some(rest) = message.strip_prefix("no such table: ") {
            return SqliteFnError::TableNotFound(rest.trim().to_string());
        }
        if let Some(rest) = message.strip_prefix("no such column: ") {
            return SqliteFnError::ColumnNotFound(rest.trim().to_string());
        }
        if message.contains("syntax error") {
            return SqliteFnError::QuerySyntax(message);
        }
        match &err {
            rusqlite::Error::SqliteFailure(ffi_err, _) => {
                use rusqlite::ErrorCode::*;
                match ffi_err.code {
                    ConstraintViolation | NotFound => {
                        SqliteFnError::Execution(format!("integrity error: {message}"))
                    }
                    _ => SqliteFnError::Sqlite(err),
                }
            }
            rusqlite::Error::InvalidParameterCount(_, _)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnName(_) => {
                SqliteFnError::Execution(format!("programming error: {message}"))
            }
            _ => SqliteFnError::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_canonical_forms() {
        assert_eq!(
            render(&SqliteFnError::TableNotFound("Orders".into())),
            "Error: no such table: Orders"
        );
        assert_eq!(
            render(&SqliteFnError::DuplicateColumn("NAME".into())),
            "Error: duplicate column name: NAME"
        );
        assert_eq!(
            render(&SqliteFnError::OutputLimit { rows: 2_000_000, limit: 1_048_576 }),
            "Error: result set too large: 2000000 rows (limit: 1048576). Use LIMIT clause to reduce output."
        );
    }

    #[test]
    fn normalizes_table_not_found() {
        let raw = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("no such table: NoSuchThing".to_string()),
        );
        let converted: SqliteFnError = raw.into();
        assert!(matches!(converted, SqliteFnError::TableNotFound(ref n) if n == "NoSuchThing"));
    }
}
