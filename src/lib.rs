//! # wex: warehouse extraction
//!
//! > **Describe the views. Get the SQL. Get the files.**
//!
//! wex turns declarative view definitions into plain `SELECT` statements
//! against a warehouse, optionally split into one statement per calendar
//! year, and streams their rows into flat files.
//!
//! ## Quick Example
//!
//! ```
//! use wex::prelude::*;
//!
//! let schema = Schema::from_rows([
//!     ("DB", "T", "id", "integer"),
//!     ("DB", "T", "yr", "integer"),
//! ]);
//!
//! let mut builder = QueryBuilder::new(&schema);
//! builder
//!     .set_database("DB")
//!     .add_table("T")
//!     .add_column("T", "id")
//!     .set_year_slice(YearSlice::fixed("yr", 2020, 2021));
//!
//! let sql: Vec<String> = builder.build_queries().into_iter().map(|q| q.sql).collect();
//! assert_eq!(sql, [
//!     "select a.id from DB.T a where a.yr = 2020;",
//!     "select a.id from DB.T a where a.yr = 2021;",
//! ]);
//! ```
//!
//! ## Layers
//!
//! | Module       | Role                                              |
//! |--------------|---------------------------------------------------|
//! | [`schema`]   | Known databases, tables and column types          |
//! | [`ast`]      | Conditions, joins and year slices                 |
//! | [`builder`]  | Stateful per-view SQL builder                     |
//! | [`config`]   | Declarative config tree, planning and validation  |
//! | [`engine`]   | Warehouse connection, streaming and introspection |
//! | [`runner`]   | Bounded-concurrency extraction into files         |

pub mod alias;
pub mod ast;
pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod parser;
pub mod query;
pub mod runner;
pub mod schema;
pub mod settings;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::builder::QueryBuilder;
    pub use crate::config::{ExtractionConfig, plan, validate};
    pub use crate::engine::Warehouse;
    pub use crate::error::*;
    pub use crate::query::{Query, SelectedColumn};
    pub use crate::runner::{RunReport, Runner};
    pub use crate::schema::Schema;
    pub use crate::settings::Settings;
    pub use crate::transpiler::ToSql;
}

/// Plan every view of a config file against a schema file.
///
/// # Example
///
/// ```no_run
/// let queries = wex::plan_files("extract.toml", "schema.json").unwrap();
/// for q in &queries {
///     println!("{}", q.sql);
/// }
/// ```
pub fn plan_files(
    config: impl AsRef<std::path::Path>,
    schema: impl AsRef<std::path::Path>,
) -> error::WexResult<Vec<query::Query>> {
    let config = config::ExtractionConfig::from_file(config)?;
    let schema = schema::Schema::from_file(schema)?;
    config::plan(&config, &schema)
}
