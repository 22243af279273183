//! The query builder.
//!
//! A [`QueryBuilder`] collects directives for one view (tables, columns,
//! joins, filter groups, an optional year slice) and renders them with
//! [`build_queries`](QueryBuilder::build_queries), which also clears every
//! piece of accumulated state so the same builder can serve the next view.
//!
//! The builder never fails. Unknown tables, missing registrations or an
//! empty select list produce SQL the server will reject; checking the
//! input against the schema beforehand is the caller's job (see
//! [`config::validate`](crate::config::validate)).
//!
//! Call [`add_table`](QueryBuilder::add_table) before referencing a table
//! from columns, joins or filters. A table referenced first by anything
//! else still gets an alias on first use, but it is not part of the FROM
//! clause.
//!
//! # Example
//! ```
//! use wex::prelude::*;
//!
//! let schema = Schema::from_rows([("DB", "orders", "id", "integer")]);
//! let mut builder = QueryBuilder::new(&schema);
//! builder.set_database("DB").add_table("orders").add_column("orders", "id");
//!
//! let queries = builder.build_queries();
//! assert_eq!(queries[0].sql, "select a.id from DB.orders a;");
//! ```

use crate::alias::{AliasAllocator, AliasMap, DEFAULT_ALIAS_CAPACITY};
use crate::ast::*;
use crate::query::{Query, SelectedColumn};
use crate::schema::Schema;
use crate::transpiler::{RenderContext, ToSql};

/// Stateful SQL builder for one view at a time.
pub struct QueryBuilder<'s> {
    schema: &'s Schema,
    alias_capacity: usize,
    state: BuildState,
}

#[derive(Debug)]
struct BuildState {
    database: String,
    dataset: String,
    tables: Vec<String>,
    columns: Vec<SelectedColumn>,
    joins: Vec<JoinInfo>,
    conditions: Conditions,
    open_group: Option<OrGroup>,
    year_slice: Option<YearSlice>,
    aliases: AliasMap,
    allocator: AliasAllocator,
}

impl BuildState {
    fn new(alias_capacity: usize) -> Self {
        Self {
            database: String::new(),
            dataset: String::new(),
            tables: Vec::new(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Conditions::default(),
            open_group: None,
            year_slice: None,
            aliases: AliasMap::default(),
            allocator: AliasAllocator::new(alias_capacity),
        }
    }

    fn alias(&mut self, table: &str) -> String {
        self.aliases.get_or_assign(table, &mut self.allocator)
    }

    fn is_idle(&self) -> bool {
        self.tables.is_empty()
            && self.columns.is_empty()
            && self.joins.is_empty()
            && self.conditions.is_empty()
            && self.open_group.is_none()
            && self.year_slice.is_none()
            && self.aliases.is_empty()
    }
}

impl<'s> QueryBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_alias_capacity(schema, DEFAULT_ALIAS_CAPACITY)
    }

    /// A builder whose per-view alias pool holds `capacity` aliases.
    pub fn with_alias_capacity(schema: &'s Schema, capacity: usize) -> Self {
        Self {
            schema,
            alias_capacity: capacity,
            state: BuildState::new(capacity),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// True when no directive has been applied since the last build or reset.
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Database every table of this view lives in. Call before `add_table`.
    pub fn set_database(&mut self, name: impl Into<String>) -> &mut Self {
        self.state.database = name.into();
        self
    }

    /// Label attached to every produced [`Query`].
    pub fn set_dataset_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.state.dataset = name.into();
        self
    }

    /// Register a table in the FROM clause. Registering it again is a no-op.
    pub fn add_table(&mut self, name: &str) -> &mut Self {
        if !self.state.tables.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            self.state.tables.push(name.to_string());
        }
        self.state.alias(name);
        self
    }

    /// Append `<alias>.<name>` to the select list. The column is not checked
    /// against the schema.
    pub fn add_column(&mut self, table: &str, name: &str) -> &mut Self {
        let alias = self.state.alias(table);
        let data_type = self
            .schema
            .find_column(&self.state.database, table, name)
            .map(|c| c.data_type.clone());
        self.state.columns.push(SelectedColumn {
            table: table.to_string(),
            alias,
            name: name.to_string(),
            data_type,
        });
        self
    }

    /// Append every column the schema knows for `table`, in schema order.
    ///
    /// Returns the number of columns added; zero when the table is unknown.
    pub fn add_all_known_columns(&mut self, table: &str) -> usize {
        self.add_all_known_columns_except(table, &[] as &[&str])
    }

    /// Like [`add_all_known_columns`](Self::add_all_known_columns), skipping
    /// the names in `exclude` (case-insensitive).
    pub fn add_all_known_columns_except<S: AsRef<str>>(&mut self, table: &str, exclude: &[S]) -> usize {
        let Some(known) = self.schema.find_table(&self.state.database, table) else {
            return 0;
        };
        let alias = self.state.alias(table);
        let before = self.state.columns.len();
        for column in &known.columns {
            if exclude.iter().any(|e| e.as_ref().eq_ignore_ascii_case(&column.name)) {
                continue;
            }
            self.state.columns.push(SelectedColumn {
                table: table.to_string(),
                alias: alias.clone(),
                name: column.name.clone(),
                data_type: Some(column.data_type.clone()),
            });
        }
        self.state.columns.len() - before
    }

    /// Join `right` to `left` on equality of every column in `on`.
    pub fn add_join<S: AsRef<str>>(&mut self, left: &str, right: &str, on: &[S], kind: JoinKind) -> &mut Self {
        self.state.alias(left);
        self.state.alias(right);
        self.state.joins.push(JoinInfo {
            kind,
            left: left.to_string(),
            right: right.to_string(),
            on: on.iter().map(|c| c.as_ref().to_string()).collect(),
        });
        self
    }

    /// Open an OR-group. An already open group is sealed first.
    pub fn start_or_group(&mut self) -> &mut Self {
        if self.state.open_group.is_some() {
            self.end_or_group();
        }
        self.state.open_group = Some(OrGroup::new());
        self
    }

    /// Add a term to the open OR-group. Without an open group the term is dropped.
    pub fn add_where<I, V>(
        &mut self,
        table: &str,
        column: &str,
        values: I,
        operator: Operator,
        kind: ValueKind,
    ) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let term = Where::new(table, column, values.into_iter().map(Into::into).collect(), operator, kind);
        self.add_where_term(term)
    }

    pub fn add_where_term(&mut self, term: Where) -> &mut Self {
        if self.state.open_group.is_none() {
            discard_ungrouped(term);
            return self;
        }
        self.state.alias(&term.table);
        if let Some(group) = self.state.open_group.as_mut() {
            group.push(term);
        }
        self
    }

    /// Seal the open OR-group into the condition list. Empty groups are dropped.
    pub fn end_or_group(&mut self) -> &mut Self {
        if let Some(group) = self.state.open_group.take() {
            if !group.is_empty() {
                self.state.conditions.groups.push(group);
            }
        }
        self
    }

    /// Add a single-term group that is AND-ed in after all view groups.
    pub fn add_global_where<I, V>(
        &mut self,
        table: &str,
        column: &str,
        values: I,
        operator: Operator,
        kind: ValueKind,
    ) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let term = Where::new(table, column, values.into_iter().map(Into::into).collect(), operator, kind);
        self.add_global_where_term(term)
    }

    pub fn add_global_where_term(&mut self, term: Where) -> &mut Self {
        self.state.alias(&term.table);
        self.state.conditions.globals.push(GlobalWhere(term));
        self
    }

    pub fn set_year_slice(&mut self, slice: YearSlice) -> &mut Self {
        self.state.year_slice = Some(slice);
        self
    }

    /// Drop everything accumulated so far.
    pub fn reset(&mut self) {
        self.state = BuildState::new(self.alias_capacity);
    }

    /// Render the accumulated view and reset the builder.
    ///
    /// Produces one query per sliced year when a year slice is set and the
    /// primary table has the slice column, otherwise exactly one query.
    pub fn build_queries(&mut self) -> Vec<Query> {
        let state = std::mem::replace(&mut self.state, BuildState::new(self.alias_capacity));
        render(state, self.schema)
    }
}

/// Terms added outside an OR-group are not kept.
fn discard_ungrouped(_term: Where) {}

fn render(state: BuildState, schema: &Schema) -> Vec<Query> {
    let ctx = RenderContext {
        database: &state.database,
        aliases: &state.aliases,
    };

    let select: Vec<String> = state.columns.iter().map(SelectedColumn::expr).collect();
    let from: Vec<String> = state
        .tables
        .iter()
        .map(|t| format!("{}.{} {}", state.database, t, ctx.aliases.resolve(t)))
        .collect();
    let joins: Vec<String> = state.joins.iter().map(|j| j.to_sql(&ctx)).collect();
    let where_clause = state.conditions.to_sql(&ctx);

    let base = [
        format!("select {}", select.join(", ")),
        format!("from {}", from.join(", ")),
        joins.join(" "),
        where_clause.clone(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    let primary = state.tables.first().cloned().unwrap_or_default();
    let query = |sql: String, slice: String| Query {
        sql,
        database: state.database.clone(),
        table: primary.clone(),
        dataset: state.dataset.clone(),
        slice,
        columns: state.columns.clone(),
    };

    let slice = state
        .year_slice
        .as_ref()
        .filter(|s| !primary.is_empty() && schema.find_column(&state.database, &primary, s.column()).is_some());

    match slice {
        Some(slice) => {
            let alias = ctx.aliases.resolve(&primary);
            let joiner = if where_clause.is_empty() { "where" } else { "and" };
            slice
                .calculate_year_range()
                .into_iter()
                .map(|year| {
                    query(
                        format!("{} {} {}.{} = {};", base, joiner, alias, slice.column(), year),
                        year.to_string(),
                    )
                })
                .collect()
        }
        None => vec![query(format!("{};", base), String::new())],
    }
}
