//!
//! Owns the in-memory engine for one invocation: splits multi-statement
//! input, executes queries, and reports timings.
//!
use std::time::Instant;

use log::debug;
use rusqlite::Connection;

use crate::errors::Result;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Pragma,
    Explain,
    Other,
    Empty,
}

impl QueryType {
    pub fn is_row_producing(&self) -> bool {
        matches!(self, QueryType::Select | QueryType::Pragma | QueryType::Explain)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub query_type: QueryType,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub rowcount: usize,
    pub last_insert_id: Option<i64>,
    pub elapsed_ms: f64,
}

impl ExecutionResult {
    fn empty() -> Self {
        ExecutionResult {
            query_type: QueryType::Empty,
            columns: Vec::new(),
            rows: Vec::new(),
            rowcount: 0,
            last_insert_id: None,
            elapsed_ms: 0.0,
        }
    }
}

pub struct Executor {
    conn: Connection,
}

impl Executor {
    /// Open a fresh in-memory database with foreign-key enforcement enabled.
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Executor { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Split `sql` on `;`, tracking single/double-quote state (with doubled
    /// escapes), discarding empty statements between separators.
    pub fn split_statements(sql: &str) -> Vec<String> {
        let mut statements = Vec::new();
        let mut current = String::new();
        let chars: Vec<char> = sql.chars().collect();
        let mut i = 0;
        let n = chars.len();
        let mut in_single = false;
        let mut in_double = false;
        while i < n {
            let c = chars[i];
            current.push(c);
            match c {
                '\'' if !in_double => {
                    if in_single && i + 1 < n && chars[i + 1] == '\'' {
                        current.push(chars[i + 1]);
                        i += 1;
                    } else {
                        in_single = !in_single;
                    }
                }
                '"' if !in_single => {
                    if in_double && i + 1 < n && chars[i + 1] == '"' {
                        current.push(chars[i + 1]);
                        i += 1;
                    } else {
                        in_double = !in_double;
                    }
                }
                ';' if !in_single && !in_double => {
                    current.pop();
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        statements.push(trimmed.to_string());
                    }
                    current.clear();
                }
                _ => {}
            }
            i += 1;
        }
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            statements.push(trimmed.to_string());
        }
        statements
    }

    /// Uppercase-trim the first word; `WITH` defers to the first of
    /// `SELECT|INSERT|UPDATE|DELETE` appearing later in the statement.
    pub fn detect_query_type(sql: &str) -> QueryType {
        let trimmed = sql.trim_start();
        let first_word: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_uppercase();

        if first_word == "WITH" {
            let upper = trimmed.to_uppercase();
            let candidates = ["SELECT", "INSERT", "UPDATE", "DELETE"];
            let mut best: Option<(usize, &str)> = None;
            for kw in candidates {
                if let Some(pos) = upper.find(kw) {
                    if best.map(|(p, _)| pos < p).unwrap_or(true) {
                        best = Some((pos, kw));
                    }
                }
            }
            return match best.map(|(_, kw)| kw) {
                Some("SELECT") => QueryType::Select,
                Some("INSERT") => QueryType::Insert,
                Some("UPDATE") => QueryType::Update,
                Some("DELETE") => QueryType::Delete,
                _ => QueryType::Other,
            };
        }

        match first_word.as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            "CREATE" => QueryType::Create,
            "DROP" => QueryType::Drop,
            "PRAGMA" => QueryType::Pragma,
            "EXPLAIN" => QueryType::Explain,
            "" => QueryType::Empty,
            _ => QueryType::Other,
        }
    }

    /// Execute a single statement, binding `params` positionally.
    pub fn execute_query(&self, sql: &str, params: &[CellValue]) -> Result<ExecutionResult> {
        let start = Instant::now();
        let query_type = Self::detect_query_type(sql);
        let bound: Vec<rusqlite::types::Value> =
            params.iter().map(rusqlite::types::Value::from).collect();
        let bound_refs: Vec<&dyn rusqlite::ToSql> =
            bound.iter().map(|v| v as &dyn rusqlite::ToSql).collect();

        let result = if query_type.is_row_producing() {
            let mut stmt = self.conn.prepare(sql)?;
            let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
            let column_count = columns.len();
            let mut rows_out = Vec::new();
            let mut rows = stmt.query(bound_refs.as_slice())?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_count);
                for idx in 0..column_count {
                    let v: rusqlite::types::Value = row.get(idx)?;
                    values.push(CellValue::from(v));
                }
                rows_out.push(values);
            }
            let rowcount = rows_out.len();
            ExecutionResult {
                query_type,
                columns,
                rows: rows_out,
                rowcount,
                last_insert_id: None,
                elapsed_ms: 0.0,
            }
        } else {
            self.conn.execute(sql, bound_refs.as_slice())?;
            let rowcount = self.conn.changes() as usize;
            let last_insert_id =
                if query_type == QueryType::Insert { Some(self.conn.last_insert_rowid()) } else { None };
            ExecutionResult {
                query_type,
                columns: Vec::new(),
                rows: Vec::new(),
                rowcount,
                last_insert_id,
                elapsed_ms: 0.0,
            }
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "executed statement in {:.3}ms, rowcount={}, rows_returned={}",
            elapsed_ms,
            result.rowcount,
            result.rows.len()
        );
        Ok(ExecutionResult { elapsed_ms, ..result })
    }

    /// Run every split statement in order, accumulating elapsed time.
    /// Parameters are not accepted here — v1 forbids binding when `;` is
    /// present in the original query. Returns the most recent row-producing
    /// result, or the most recent result if none was row-producing, or an
    /// `Empty` result if nothing ran.
    pub fn execute_multi(&self, statements: &[String]) -> Result<ExecutionResult> {
        let mut total_elapsed = 0.0;
        let mut last_row_producing: Option<ExecutionResult> = None;
        let mut last: Option<ExecutionResult> = None;
        for stmt in statements {
            let result = self.execute_query(stmt, &[])?;
            total_elapsed += result.elapsed_ms;
            if result.query_type.is_row_producing() {
                last_row_producing = Some(result.clone());
            }
            last = Some(result);
        }
        let mut chosen = last_row_producing.or(last).unwrap_or_else(ExecutionResult::empty);
        chosen.elapsed_ms = total_elapsed;
        Ok(chosen)
    }

    /// Optional self-check for window functions, CTEs, UPSERT, and JSON1,
    /// used only by the ancillary `SQLITE_FEATURES()` helper.
    pub fn probe_features(&self) -> Vec<(&'static str, bool)> {
        let probes: &[(&'static str, &str)] = &[
            ("window_functions", "SELECT row_number() OVER (ORDER BY 1)"),
            ("cte", "WITH t(x) AS (SELECT 1) SELECT x FROM t"),
            (
                "upsert",
                "CREATE TEMP TABLE __feature_probe_upsert(id INTEGER PRIMARY KEY, v INTEGER); \
                 INSERT INTO __feature_probe_upsert VALUES (1, 1) ON CONFLICT(id) DO UPDATE SET v = 2",
            ),
            ("json1", "SELECT json_valid('{}')"),
        ];
        probes
            .iter()
            .map(|(name, sql)| (*name, self.conn.execute_batch(sql).is_ok()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolon_outside_literals() {
        let stmts = Executor::split_statements("SELECT 'a;b'; SELECT 1");
        assert_eq!(stmts, vec!["SELECT 'a;b'", "SELECT 1"]);
    }

    #[test]
    fn discards_empty_statements() {
        let stmts = Executor::split_statements("SELECT 1;;  ; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn detects_with_recursive_as_select() {
        let ty = Executor::detect_query_type(
            "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM cnt WHERE x < 5) SELECT x FROM cnt",
        );
        assert_eq!(ty, QueryType::Select);
    }

    #[test]
    fn executes_select_against_loaded_table() {
        let executor = Executor::new().unwrap();
        executor.connection().execute("CREATE TABLE t (id INTEGER, name TEXT)", []).unwrap();
        executor.connection().execute("INSERT INTO t VALUES (1, 'a'), (2, 'b')", []).unwrap();
        let result = executor.execute_query("SELECT * FROM t ORDER BY id", &[]).unwrap();
        assert_eq!(result.rowcount, 2);
        assert_eq!(result.columns, vec!["id", "name"]);
    }

    #[test]
    fn binds_positional_params() {
        let executor = Executor::new().unwrap();
        executor.connection().execute("CREATE TABLE t (id INTEGER)", []).unwrap();
        executor.connection().execute("INSERT INTO t VALUES (1), (2)", []).unwrap();
        let result = executor
            .execute_query("SELECT * FROM t WHERE id = ?", &[CellValue::Int(2)])
            .unwrap();
        assert_eq!(result.rowcount, 1);
    }
}
