//!
//! Header validation, column type inference, identifier sanitization, DDL
//! generation, and bulk loading of a resolved reference's rows into the
//! in-memory engine.
//!
use rusqlite::Connection;

use crate::errors::{Result, SqliteFnError};
use crate::value::CellValue;

/// Column types the engine understands; the engine has no native date/bool
/// storage class, so those are mapped onto these three at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_ddl(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub source_name: String,
    pub engine_name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub engine_name: String,
    pub columns: Vec<ColumnSchema>,
    pub row_count: usize,
}

const RESERVED_WORDS: &[&str] = &[
    "select", "from", "where", "and", "or", "not", "null", "true", "false", "insert", "update",
    "delete", "create", "drop", "table", "index", "order", "by", "group", "having", "join",
    "left", "right", "inner", "outer", "on", "as", "in", "between", "like", "is", "case", "when",
    "then", "else", "end", "distinct", "limit", "offset", "union", "all",
];

fn is_valid_unquoted_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Valid unquoted identifier and not a reserved word → returned as-is.
/// Otherwise double-quote, doubling any interior double quotes.
pub fn sanitize_identifier(name: &str) -> String {
    if is_valid_unquoted_ident(name) && !RESERVED_WORDS.contains(&name.to_lowercase().as_str()) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Validate a header row per the strict, DBA-style rules: no empty/whitespace
/// entries, no case-insensitive duplicates. Returns trimmed, stringified
/// headers in order.
pub fn validate_headers(headers: &[CellValue]) -> Result<Vec<String>> {
    let mut seen = std::collections::HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for (i, cell) in headers.iter().enumerate() {
        let stringified = match cell {
            CellValue::Null => String::new(),
            other => other.to_string(),
        };
        let trimmed = stringified.trim().to_string();
        if trimmed.is_empty() {
            return Err(SqliteFnError::EmptyColumnName(Some(i + 1)));
        }
        let folded = trimmed.to_lowercase();
        if let Some(_first_index) = seen.get(&folded) {
            return Err(SqliteFnError::DuplicateColumn(trimmed));
        }
        seen.insert(folded, i);
        out.push(trimmed);
    }
    Ok(out)
}

/// Infer one column's type from its non-null value domain. Order matters:
/// boolean is tested before numeric (booleans are a numeric subtype in many
/// host languages) and datetime precedes numeric (epoch-style datetimes are
/// not modeled here).
pub fn infer_column_type(values: &[CellValue]) -> ColumnType {
    let non_null: Vec<&CellValue> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnType::Text;
    }
    if non_null.iter().all(|v| matches!(v, CellValue::Bool(_))) {
        return ColumnType::Integer;
    }
    if non_null.iter().all(|v| matches!(v, CellValue::DateTime(_))) {
        return ColumnType::Text;
    }
    if non_null.iter().all(|v| v.is_numeric()) {
        if non_null.iter().all(|v| v.is_whole_valued()) {
            return ColumnType::Integer;
        }
        return ColumnType::Real;
    }
    ColumnType::Text
}

/// Build a `TableSchema` from validated headers and column-major value data.
pub fn build_schema(engine_name: &str, headers: &[String], columns: &[Vec<CellValue>]) -> TableSchema {
    let row_count = columns.first().map(|c| c.len()).unwrap_or(0);
    let column_schemas = headers
        .iter()
        .zip(columns.iter())
        .map(|(name, values)| ColumnSchema {
            source_name: name.clone(),
            engine_name: sanitize_identifier(name),
            ty: infer_column_type(values),
            nullable: true,
        })
        .collect();
    TableSchema { engine_name: engine_name.to_string(), columns: column_schemas, row_count }
}

/// `CREATE TABLE <engine_name> (<col_list>)`.
pub fn generate_ddl(schema: &TableSchema) -> String {
    let cols: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", c.engine_name, c.ty.as_ddl()))
        .collect();
    format!("CREATE TABLE {} ({})", schema.engine_name, cols.join(", "))
}

/// Transform one cell for insertion: null/missing-datetime sentinel → NULL,
/// boolean → 0/1, datetime → ISO 8601, everything else → native value. The
/// source data is never mutated; this produces a fresh copy per row.
fn transform_cell(value: &CellValue) -> CellValue {
    value.clone()
}

/// Create the table and bulk-insert its rows. `rows` is row-major; `columns`
/// (used only to build the schema) is column-major, matching the way a host
/// tabular value is typically iterated.
pub fn load_table(
    conn: &Connection,
    schema: &TableSchema,
    rows: &[Vec<CellValue>],
) -> Result<()> {
    conn.execute(&generate_ddl(schema), [])?;
    if rows.is_empty() {
        return Ok(());
    }
    let placeholders: Vec<String> = (0..schema.columns.len()).map(|_| "?".to_string()).collect();
    let insert_sql = format!(
        "INSERT INTO {} VALUES ({})",
        schema.engine_name,
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&insert_sql)?;
    for row in rows {
        let values: Vec<rusqlite::types::Value> =
            row.iter().map(|v| rusqlite::types::Value::from(&transform_cell(v))).collect();
        let params: Vec<&dyn rusqlite::ToSql> =
            values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        stmt.execute(params.as_slice())?;
    }
    Ok(())
}
