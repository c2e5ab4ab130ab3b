//!
//! One call = extract references → resolve → build schema → load → rewrite
//! → execute → shape. No state survives the call.
//!
use log::debug;

use crate::config::QueryOptions;
use crate::errors::{render, Result, SqliteFnError};
use crate::executor::Executor;
use crate::host::TableResolver;
use crate::reference::{count_parameters, extract_references};
use crate::rewrite::rewrite_query;
use crate::schema::{build_schema, load_table, validate_headers};
use crate::shaper::{shape, Tabular};
use crate::value::CellValue;

/// `SQLITE(query, params…) → tabular | error_string`. The public entry point
/// never raises — every failure is rendered to `Error: <body>` text.
pub fn sqlite(
    query: &str,
    params: &[CellValue],
    resolver: &dyn TableResolver,
    options: &QueryOptions,
) -> std::result::Result<Tabular, String> {
    run_query(query, params, resolver, options).map_err(|e| render(&e))
}

fn run_query(
    query: &str,
    params: &[CellValue],
    resolver: &dyn TableResolver,
    options: &QueryOptions,
) -> Result<Tabular> {
    if query.trim().is_empty() {
        return Err(SqliteFnError::QuerySyntax("empty query".to_string()));
    }

    let expected = count_parameters(query);
    if params.len() != expected {
        return Err(SqliteFnError::QuerySyntax(format!(
            "expected {expected}, got {}",
            params.len()
        )));
    }

    let references = extract_references(query);
    let executor = Executor::new()?;

    for reference in &references {
        let host_table = resolver.resolve(reference)?;
        if host_table.rows.is_empty() || host_table.column_count() == 0 {
            return Err(SqliteFnError::EmptyRange(reference.original.clone()));
        }
        let headers = validate_headers(&host_table.headers)?;

        let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(host_table.rows.len()); headers.len()];
        for row in &host_table.rows {
            for (i, cell) in row.iter().enumerate() {
                columns[i].push(cell.clone());
            }
        }

        let schema = build_schema(&reference.engine_name, &headers, &columns);
        load_table(executor.connection(), &schema, &host_table.rows)?;
    }

    let rewritten = rewrite_query(query, &references);
    debug!("rewritten query: {rewritten}");

    let has_semicolon_outside_literals = {
        let search = crate::reference::search_projection(query);
        search.contains(';')
    };

    let result = if has_semicolon_outside_literals {
        let statements = Executor::split_statements(&rewritten);
        executor.execute_multi(&statements)?
    } else {
        executor.execute_query(&rewritten, params)?
    };

    shape(result, &options.to_shape_options())
}

/// `SQLITE_VERSION() → string`.
pub fn sqlite_version() -> Result<String> {
    let executor = Executor::new()?;
    let version: String =
        executor.connection().query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
    Ok(version)
}

/// `SQLITE_FEATURES() → table`.
pub fn sqlite_features() -> Result<Tabular> {
    let executor = Executor::new()?;
    let probes = executor.probe_features();
    let rows = probes
        .into_iter()
        .map(|(name, supported)| vec![CellValue::Text(name.to_string()), CellValue::Bool(supported)])
        .collect();
    Ok(Tabular {
        columns: vec!["feature".to_string(), "supported".to_string()],
        rows,
        warning: None,
    })
}

/// `SQLITE_EXPLAIN(query) → table` — prepends `EXPLAIN QUERY PLAN` and
/// returns the rows, resolving references the same way a normal call would.
pub fn sqlite_explain(
    query: &str,
    resolver: &dyn TableResolver,
    options: &QueryOptions,
) -> std::result::Result<Tabular, String> {
    let explain_query = format!("EXPLAIN QUERY PLAN {query}");
    sqlite(&explain_query, &[], resolver, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fixture::FixtureResolver;
    use crate::host::HostTable;

    fn orders_fixture() -> FixtureResolver {
        let headers = vec![
            CellValue::Text("CustomerID".into()),
            CellValue::Text("Total".into()),
        ];
        let rows = vec![
            vec![CellValue::Int(101), CellValue::Real(50.0)],
            vec![CellValue::Int(101), CellValue::Real(75.0)],
            vec![CellValue::Int(103), CellValue::Real(325.75)],
            vec![CellValue::Int(102), CellValue::Real(10.0)],
            vec![CellValue::Int(103), CellValue::Real(0.0)],
        ];
        FixtureResolver::new().with_table("Orders", HostTable::new(headers, rows))
    }

    #[test]
    fn select_star_round_trips_row_count() {
        let resolver = orders_fixture();
        let result = sqlite("SELECT * FROM Orders", &[], &resolver, &QueryOptions::default()).unwrap();
        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.columns, vec!["CustomerID", "Total"]);
    }

    #[test]
    fn group_by_having_order_by() {
        let resolver = orders_fixture();
        let q = "SELECT CustomerID, SUM(Total) AS t FROM Orders GROUP BY CustomerID HAVING SUM(Total) > 200 ORDER BY CustomerID";
        let result = sqlite(q, &[], &resolver, &QueryOptions::default()).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], CellValue::Int(103));
        assert_eq!(result.rows[0][1], CellValue::Real(325.75));
    }

    #[test]
    fn recursive_cte_needs_no_references() {
        let resolver = FixtureResolver::new();
        let q = "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x+1 FROM cnt WHERE x < 5) SELECT x FROM cnt";
        let result = sqlite(q, &[], &resolver, &QueryOptions::default()).unwrap();
        assert_eq!(result.rows.len(), 5);
    }

    #[test]
    fn parameterized_select() {
        let resolver = orders_fixture();
        let q = "SELECT * FROM Orders WHERE CustomerID = ?";
        let result = sqlite(q, &[CellValue::Int(101)], &resolver, &QueryOptions::default()).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn unresolvable_reference_surfaces_as_error_text() {
        let resolver = FixtureResolver::new();
        let result = sqlite("SELECT * FROM NoSuchThing", &[], &resolver, &QueryOptions::default());
        let err = result.unwrap_err();
        assert!(err.starts_with("Error: cannot resolve range: NoSuchThing"));
    }

    #[test]
    fn duplicate_header_fails() {
        let headers = vec![
            CellValue::Text("id".into()),
            CellValue::Text("Name".into()),
            CellValue::Text("NAME".into()),
        ];
        let resolver =
            FixtureResolver::new().with_table("T", HostTable::new(headers, vec![vec![CellValue::Int(1), CellValue::Text("a".into()), CellValue::Text("b".into())]]));
        let result = sqlite("SELECT * FROM T", &[], &resolver, &QueryOptions::default());
        assert_eq!(result.unwrap_err(), "Error: duplicate column name: NAME");
    }

    #[test]
    fn boolean_column_round_trips_as_integer() {
        let headers = vec![CellValue::Text("flag".into())];
        let rows = vec![vec![CellValue::Bool(true)], vec![CellValue::Bool(false)], vec![CellValue::Bool(true)]];
        let resolver = FixtureResolver::new().with_table("Flags", HostTable::new(headers, rows));
        let result = sqlite("SELECT * FROM Flags", &[], &resolver, &QueryOptions::default()).unwrap();
        assert_eq!(result.rows[0][0], CellValue::Int(1));
        assert_eq!(result.rows[1][0], CellValue::Int(0));
        assert_eq!(result.rows[2][0], CellValue::Int(1));
    }

    #[test]
    fn parameter_count_mismatch_fails() {
        let resolver = orders_fixture();
        let result = sqlite("SELECT * FROM Orders WHERE CustomerID = ?", &[], &resolver, &QueryOptions::default());
        assert_eq!(result.unwrap_err(), "Error: expected 1, got 0");
    }

    #[test]
    fn empty_query_fails() {
        let resolver = FixtureResolver::new();
        let result = sqlite("   ", &[], &resolver, &QueryOptions::default());
        assert_eq!(result.unwrap_err(), "Error: empty query");
    }
}
