//! Drives a [`QueryBuilder`] through an [`ExtractionConfig`].

use tracing::{debug, info, instrument, warn};

use crate::alias::DEFAULT_ALIAS_CAPACITY;
use crate::builder::QueryBuilder;
use crate::config::{ALL_COLUMNS, ExtractionConfig, FilterGroup, SourceConfig, ViewConfig};
use crate::error::WexResult;
use crate::query::Query;
use crate::schema::Schema;

/// Render every view of `config` into queries, in config order.
pub fn plan(config: &ExtractionConfig, schema: &Schema) -> WexResult<Vec<Query>> {
    plan_with_alias_capacity(config, schema, DEFAULT_ALIAS_CAPACITY)
}

/// Like [`plan`] with an explicit per-view alias pool size.
pub fn plan_with_alias_capacity(
    config: &ExtractionConfig,
    schema: &Schema,
    alias_capacity: usize,
) -> WexResult<Vec<Query>> {
    let mut builder = QueryBuilder::with_alias_capacity(schema, alias_capacity);
    let mut queries = Vec::new();

    for source in &config.sources {
        for view in &source.views {
            let built = plan_view(&mut builder, source, view)?;
            queries.extend(built);
        }
    }

    info!(
        "Planned {} queries from {} views",
        queries.len(),
        config.view_count()
    );
    Ok(queries)
}

/// Apply one view's directives in traversal order and build it.
#[instrument(skip_all, fields(database = %source.database, table = %view.table))]
pub fn plan_view(
    builder: &mut QueryBuilder<'_>,
    source: &SourceConfig,
    view: &ViewConfig,
) -> WexResult<Vec<Query>> {
    if let Err(e) = apply_view(builder, source, view) {
        builder.reset();
        return Err(e);
    }
    let queries = builder.build_queries();
    debug!("View produced {} queries", queries.len());
    Ok(queries)
}

fn apply_view(builder: &mut QueryBuilder<'_>, source: &SourceConfig, view: &ViewConfig) -> WexResult<()> {
    builder.set_database(source.database.as_str());
    builder.add_table(&view.table);
    add_columns(builder, &source.database, &view.table, &view.columns, &view.exclude);

    for join in &view.joins {
        add_columns(builder, &source.database, &join.table, &join.columns, &join.exclude);
        add_groups(builder, &join.table, &join.filters)?;
        builder.add_join(join.left_table(view), &join.table, &join.on, join.kind);
    }

    add_groups(builder, &view.table, &view.filters)?;

    for global in &source.global_filters {
        let term = global.single_term()?;
        builder.add_global_where_term(term.to_where(&view.table));
    }

    if let Some(slice) = &view.year_slice {
        if builder.schema().find_column(&source.database, &view.table, slice.column()).is_none() {
            warn!(
                "Slice column '{}' not found on {}.{}; building unsliced",
                slice.column(),
                source.database,
                view.table
            );
        }
        builder.set_year_slice(slice.clone());
    }

    builder.set_dataset_name(view.dataset_name(source));
    Ok(())
}

fn add_columns(
    builder: &mut QueryBuilder<'_>,
    database: &str,
    table: &str,
    columns: &[String],
    exclude: &[String],
) {
    for column in columns {
        if column == ALL_COLUMNS {
            let added = builder.add_all_known_columns_except(table, exclude);
            if added == 0 {
                if builder.schema().find_table(database, table).is_none() {
                    warn!("Table {}.{} not found in schema; no columns expanded", database, table);
                } else {
                    warn!("Every column of {}.{} is excluded", database, table);
                }
            }
        } else {
            builder.add_column(table, column);
        }
    }
}

fn add_groups(builder: &mut QueryBuilder<'_>, table: &str, groups: &[FilterGroup]) -> WexResult<()> {
    for group in groups {
        let terms = group.terms()?;
        builder.start_or_group();
        for term in &terms {
            builder.add_where_term(term.to_where(table));
        }
        builder.end_or_group();
    }
    Ok(())
}
