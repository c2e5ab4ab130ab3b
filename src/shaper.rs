//!
//! Reshapes an `ExecutionResult` into the tabular value returned to the host,
//! coercing column types and enforcing output limits.
//!
use crate::errors::{Result, SqliteFnError};
use crate::executor::{ExecutionResult, QueryType};
use crate::value::CellValue;

pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;
pub const SOFT_ROW_ADVISORY: usize = 100_000;

/// A 2D tabular value suitable for spreadsheet consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabular {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Set when the soft row advisory (not a hard limit) was crossed.
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShapeOptions {
    /// Replaces a null cell with this text; `None` renders the host's
    /// empty-cell sentinel (modeled here as `CellValue::Null` itself).
    pub null_as: Option<String>,
    pub max_rows: usize,
    pub max_cols: usize,
    pub soft_row_advisory: usize,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        ShapeOptions {
            null_as: None,
            max_rows: MAX_ROWS,
            max_cols: MAX_COLS,
            soft_row_advisory: SOFT_ROW_ADVISORY,
        }
    }
}

/// Per-column best-effort coercion: whole-valued numeric columns become
/// integers, any-numeric columns become reals, anything else is left as-is.
fn coerce_column(values: &mut [CellValue]) {
    let non_null: Vec<&CellValue> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() || !non_null.iter().all(|v| v.is_numeric()) {
        return;
    }
    if non_null.iter().all(|v| v.is_whole_valued()) {
        for v in values.iter_mut() {
            if let CellValue::Real(f) = v {
                *v = CellValue::Int(*f as i64);
            }
        }
    } else {
        for v in values.iter_mut() {
            if let CellValue::Int(i) = v {
                *v = CellValue::Real(*i as f64);
            }
        }
    }
}

fn apply_null_rendering(rows: &mut [Vec<CellValue>], null_as: &Option<String>) {
    let Some(text) = null_as else { return };
    for row in rows.iter_mut() {
        for cell in row.iter_mut() {
            if cell.is_null() {
                *cell = CellValue::Text(text.clone());
            }
        }
    }
}

/// Shape an `ExecutionResult` per §4.5: row-producing results become a table
/// (coerced and limit-checked), DML becomes a one-row "N rows affected"
/// table, DDL becomes a one-row "OK" table.
pub fn shape(result: ExecutionResult, options: &ShapeOptions) -> Result<Tabular> {
    match result.query_type {
        QueryType::Select | QueryType::Pragma | QueryType::Explain => {
            shape_rows(result.columns, result.rows, options)
        }
        QueryType::Insert | QueryType::Update | QueryType::Delete => Ok(Tabular {
            columns: vec!["Result".to_string()],
            rows: vec![vec![CellValue::Text(format!("{} rows affected", result.rowcount))]],
            warning: None,
        }),
        QueryType::Create | QueryType::Drop => Ok(Tabular {
            columns: vec!["Result".to_string()],
            rows: vec![vec![CellValue::Text("OK".to_string())]],
            warning: None,
        }),
        QueryType::Other | QueryType::Empty => Ok(Tabular {
            columns: vec!["Result".to_string()],
            rows: vec![vec![CellValue::Text("OK".to_string())]],
            warning: None,
        }),
    }
}

fn shape_rows(
    columns: Vec<String>,
    mut rows: Vec<Vec<CellValue>>,
    options: &ShapeOptions,
) -> Result<Tabular> {
    let col_count = columns.len();
    if col_count > options.max_cols {
        return Err(SqliteFnError::OutputLimit { rows: rows.len(), limit: options.max_cols });
    }
    if rows.len() > options.max_rows {
        return Err(SqliteFnError::OutputLimit { rows: rows.len(), limit: options.max_rows });
    }

    for col_idx in 0..col_count {
        let mut column_values: Vec<CellValue> =
            rows.iter().map(|row| row[col_idx].clone()).collect();
        coerce_column(&mut column_values);
        for (row, value) in rows.iter_mut().zip(column_values.into_iter()) {
            row[col_idx] = value;
        }
    }

    let warning = if rows.len() >= options.soft_row_advisory {
        Some(format!(
            "result set has {} rows, at or above the {}-row advisory threshold",
            rows.len(),
            options.soft_row_advisory
        ))
    } else {
        None
    };

    apply_null_rendering(&mut rows, &options.null_as);

    Ok(Tabular { columns, rows, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionResult;

    fn select_result(columns: Vec<&str>, rows: Vec<Vec<CellValue>>) -> ExecutionResult {
        ExecutionResult {
            query_type: QueryType::Select,
            columns: columns.into_iter().map(String::from).collect(),
            rowcount: rows.len(),
            rows,
            last_insert_id: None,
            elapsed_ms: 0.0,
        }
    }

    #[test]
    fn coerces_whole_valued_reals_to_integers() {
        let result = select_result(vec!["x"], vec![vec![CellValue::Real(1.0)], vec![CellValue::Real(2.0)]]);
        let tab = shape(result, &ShapeOptions::default()).unwrap();
        assert_eq!(tab.rows[0][0], CellValue::Int(1));
        assert_eq!(tab.rows[1][0], CellValue::Int(2));
    }

    #[test]
    fn dml_shapes_to_rows_affected() {
        let result = ExecutionResult {
            query_type: QueryType::Update,
            columns: vec![],
            rows: vec![],
            rowcount: 3,
            last_insert_id: None,
            elapsed_ms: 0.0,
        };
        let tab = shape(result, &ShapeOptions::default()).unwrap();
        assert_eq!(tab.rows[0][0], CellValue::Text("3 rows affected".to_string()));
    }

    #[test]
    fn ddl_shapes_to_ok() {
        let result = ExecutionResult {
            query_type: QueryType::Create,
            columns: vec![],
            rows: vec![],
            rowcount: 0,
            last_insert_id: None,
            elapsed_ms: 0.0,
        };
        let tab = shape(result, &ShapeOptions::default()).unwrap();
        assert_eq!(tab.rows[0][0], CellValue::Text("OK".to_string()));
    }

    #[test]
    fn hard_row_limit_fails() {
        let mut opts = ShapeOptions::default();
        opts.max_rows = 2;
        let result = select_result(vec!["x"], vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)], vec![CellValue::Int(3)]]);
        let err = shape(result, &opts).unwrap_err();
        assert!(matches!(err, SqliteFnError::OutputLimit { rows: 3, limit: 2 }));
    }

    #[test]
    fn soft_advisory_attaches_warning_without_failing() {
        let mut opts = ShapeOptions::default();
        opts.soft_row_advisory = 2;
        let result = select_result(vec!["x"], vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]]);
        let tab = shape(result, &opts).unwrap();
        assert!(tab.warning.is_some());
    }
}
