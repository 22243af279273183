//! Schema snapshot of the warehouse.
//!
//! A [`Schema`] is built once (from a JSON snapshot, from introspection
//! rows, or by hand) and then only read. All lookups are case-insensitive
//! exact-name matches; column order inside a table is the insertion order,
//! which is the order used for wildcard expansion.
//!
//! # Example
//! ```
//! use wex::schema::Schema;
//!
//! let schema = Schema::from_rows([
//!     ("DB", "orders", "id", "integer"),
//!     ("DB", "orders", "total", "decimal"),
//! ]);
//!
//! let table = schema.find_table("db", "ORDERS").unwrap();
//! assert_eq!(table.columns.len(), 2);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WexError, WexResult};

/// One warehouse column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", alias = "typ")]
    pub data_type: String,
}

/// One warehouse table with its columns in declared order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// A named collection of tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// Registry of databases. Read-only once constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a column. A second column with the same name is ignored.
    pub fn add_column(&mut self, column: Column) {
        let k = key(&column.name);
        if self.index.contains_key(&k) {
            return;
        }
        self.index.insert(k, self.columns.len());
        self.columns.push(column);
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.index.get(&key(name)).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(&key(name))
    }

    fn reindex(&mut self) {
        self.index.clear();
        let mut kept = Vec::with_capacity(self.columns.len());
        for column in std::mem::take(&mut self.columns) {
            let k = key(&column.name);
            if !self.index.contains_key(&k) {
                self.index.insert(k, kept.len());
                kept.push(column);
            }
        }
        self.columns = kept;
    }
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.index.get(&key(name)).map(|&i| &self.tables[i])
    }

    /// Get the table with the given name, creating it if needed.
    pub fn table_mut(&mut self, name: &str) -> &mut Table {
        let k = key(name);
        let idx = match self.index.get(&k) {
            Some(&i) => i,
            None => {
                self.index.insert(k, self.tables.len());
                self.tables.push(Table::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, table) in self.tables.iter_mut().enumerate() {
            table.reindex();
            self.index.entry(key(&table.name)).or_insert(i);
        }
    }
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(database, table, column, type)` tuples.
    ///
    /// Columns keep their insertion order per table.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S, S)>,
        S: AsRef<str>,
    {
        let mut schema = Self::new();
        for (db, table, column, typ) in rows {
            schema.add_column(db.as_ref(), table.as_ref(), column.as_ref(), typ.as_ref());
        }
        schema
    }

    /// Register one column, creating its database and table on first sight.
    pub fn add_column(&mut self, database: &str, table: &str, column: &str, data_type: &str) {
        self.database_mut(database)
            .table_mut(table)
            .add_column(Column::new(column, data_type));
    }

    /// Get the database with the given name, creating it if needed.
    pub fn database_mut(&mut self, name: &str) -> &mut Database {
        let k = key(name);
        let idx = match self.index.get(&k) {
            Some(&i) => i,
            None => {
                self.index.insert(k, self.databases.len());
                self.databases.push(Database::new(name));
                self.databases.len() - 1
            }
        };
        &mut self.databases[idx]
    }

    pub fn find_database(&self, name: &str) -> Option<&Database> {
        self.index.get(&key(name)).map(|&i| &self.databases[i])
    }

    pub fn find_table(&self, database: &str, table: &str) -> Option<&Table> {
        self.find_database(database)?.find_table(table)
    }

    pub fn find_column(&self, database: &str, table: &str, column: &str) -> Option<&Column> {
        self.find_table(database, table)?.find_column(column)
    }

    /// Number of tables across all databases.
    pub fn table_count(&self) -> usize {
        self.databases.iter().map(|d| d.tables.len()).sum()
    }

    /// Load a schema snapshot from a JSON string.
    pub fn from_json(json: &str) -> WexResult<Self> {
        let mut schema: Schema = serde_json::from_str(json)?;
        schema.reindex();
        Ok(schema)
    }

    /// Load a schema snapshot from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WexResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WexError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| WexError::Schema(format!("{}: {}", path.display(), e)))
    }

    pub fn to_json(&self) -> WexResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the snapshot as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> WexResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, db) in self.databases.iter_mut().enumerate() {
            db.reindex();
            self.index.entry(key(&db.name)).or_insert(i);
        }
    }
}
