//!
//! `SQLITE(query, *params)` — treat spreadsheet tables and cell ranges as
//! relational tables and query them with the SQLite dialect.
//!
//! The pipeline for one call: extract spreadsheet-side references from the
//! SQL text, resolve each through a [`host::TableResolver`], infer a schema
//! and load the rows into a private in-memory engine, rewrite the query to
//! use the loaded tables' engine identifiers, execute it, and reshape the
//! result into a [`shaper::Tabular`] value. Every object created by a call
//! is destroyed when the call returns, including on error — see
//! [`query::sqlite`].

pub mod config;
pub mod errors;
pub mod executor;
pub mod host;
pub mod query;
pub mod reference;
pub mod rewrite;
pub mod schema;
pub mod shaper;
pub mod value;

pub use config::QueryOptions;
pub use errors::SqliteFnError;
pub use executor::{ExecutionResult, QueryType};
pub use host::{HostTable, TableResolver};
pub use query::{sqlite, sqlite_explain, sqlite_features, sqlite_version};
pub use reference::TableReference;
pub use schema::{ColumnSchema, ColumnType, TableSchema};
pub use shaper::Tabular;
pub use value::CellValue;
