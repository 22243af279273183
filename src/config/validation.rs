//! Schema checks for extraction configs, with "did you mean" suggestions.
//!
//! The builder renders whatever it is given, so this is where unknown
//! databases, tables and columns become visible before any SQL runs.

use std::fmt;

use strsim::levenshtein;

use crate::config::{ALL_COLUMNS, ExtractionConfig, FilterGroup, SourceConfig, ViewConfig};
use crate::schema::{Database, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One finding, located by a path like `DB/orders/joins/customers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", level, self.path, self.message)
    }
}

/// True when any issue is an error.
pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Check every source and view of `config` against `schema`.
pub fn validate(config: &ExtractionConfig, schema: &Schema) -> Vec<Issue> {
    let mut issues = Vec::new();
    for source in &config.sources {
        let Some(db) = schema.find_database(&source.database) else {
            let names: Vec<&str> = schema.databases.iter().map(|d| d.name.as_str()).collect();
            issues.push(error(
                &source.database,
                not_found("Database", &source.database, &names),
            ));
            continue;
        };
        for view in &source.views {
            validate_view(&mut issues, db, source, view);
        }
    }
    issues
}

fn validate_view(issues: &mut Vec<Issue>, db: &Database, source: &SourceConfig, view: &ViewConfig) {
    let path = format!("{}/{}", source.database, view.table);

    if !check_table(issues, db, &path, &view.table) {
        return;
    }
    check_columns(issues, db, &path, &view.table, &view.columns, &view.exclude);
    check_groups(issues, db, &path, &view.table, &view.filters);

    for (i, global) in source.global_filters.iter().enumerate() {
        let gpath = format!("{}/global_filters[{}]", path, i);
        match global.single_term() {
            Ok(term) => check_column(issues, db, &gpath, term.table_or(&view.table), &term.column),
            Err(e) => issues.push(error(&gpath, e.to_string())),
        }
    }

    for join in &view.joins {
        let jpath = format!("{}/joins/{}", path, join.table);
        if !check_table(issues, db, &jpath, &join.table) {
            continue;
        }
        let left = join.left_table(view);
        if join.on.is_empty() {
            issues.push(error(&jpath, "join has no `on` columns".to_string()));
        }
        for column in &join.on {
            check_column(issues, db, &jpath, left, column);
            check_column(issues, db, &jpath, &join.table, column);
        }
        check_columns(issues, db, &jpath, &join.table, &join.columns, &join.exclude);
        check_groups(issues, db, &jpath, &join.table, &join.filters);
    }

    if let Some(slice) = &view.year_slice {
        let has_column = db
            .find_table(&view.table)
            .is_some_and(|t| t.has_column(slice.column()));
        if !has_column {
            issues.push(warning(
                &path,
                format!(
                    "slice column '{}' not found on '{}'; the view will not be sliced",
                    slice.column(),
                    view.table
                ),
            ));
        }
    }
}

fn check_table(issues: &mut Vec<Issue>, db: &Database, path: &str, table: &str) -> bool {
    if db.find_table(table).is_some() {
        return true;
    }
    let names: Vec<&str> = db.tables.iter().map(|t| t.name.as_str()).collect();
    issues.push(error(path, not_found("Table", table, &names)));
    false
}

fn check_column(issues: &mut Vec<Issue>, db: &Database, path: &str, table: &str, column: &str) {
    let Some(t) = db.find_table(table) else {
        let names: Vec<&str> = db.tables.iter().map(|t| t.name.as_str()).collect();
        issues.push(error(path, not_found("Table", table, &names)));
        return;
    };
    if !t.has_column(column) {
        let names: Vec<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
        issues.push(error(
            path,
            format!("{} in table '{}'", not_found("Column", column, &names), table),
        ));
    }
}

fn check_columns(
    issues: &mut Vec<Issue>,
    db: &Database,
    path: &str,
    table: &str,
    columns: &[String],
    exclude: &[String],
) {
    let mut selected = 0;
    for column in columns {
        if column == ALL_COLUMNS {
            if let Some(t) = db.find_table(table) {
                selected += t
                    .columns
                    .iter()
                    .filter(|c| !exclude.iter().any(|e| e.eq_ignore_ascii_case(&c.name)))
                    .count();
            }
        } else {
            check_column(issues, db, path, table, column);
            selected += 1;
        }
    }
    for column in exclude {
        if db.find_table(table).is_some_and(|t| !t.has_column(column)) {
            issues.push(warning(
                path,
                format!("excluded column '{}' does not exist in '{}'", column, table),
            ));
        }
    }
    if !columns.is_empty() && selected == 0 {
        issues.push(error(path, format!("no columns selected from '{}'", table)));
    }
}

fn check_groups(issues: &mut Vec<Issue>, db: &Database, path: &str, table: &str, groups: &[FilterGroup]) {
    for (i, group) in groups.iter().enumerate() {
        let gpath = format!("{}/filters[{}]", path, i);
        match group.terms() {
            Ok(terms) if terms.is_empty() => {
                issues.push(warning(&gpath, "empty filter group is ignored".to_string()));
            }
            Ok(terms) => {
                for term in &terms {
                    check_column(issues, db, &gpath, term.table_or(table), &term.column);
                    if term.values.is_empty() {
                        issues.push(warning(
                            &gpath,
                            format!("filter on '{}' has no values and renders nothing", term.column),
                        ));
                    }
                }
            }
            Err(e) => issues.push(error(&gpath, e.to_string())),
        }
    }
}

fn error(path: &str, message: String) -> Issue {
    Issue {
        severity: Severity::Error,
        path: path.to_string(),
        message,
    }
}

fn warning(path: &str, message: String) -> Issue {
    Issue {
        severity: Severity::Warning,
        path: path.to_string(),
        message,
    }
}

fn not_found(what: &str, name: &str, candidates: &[&str]) -> String {
    match did_you_mean(name, candidates) {
        Some(sugg) => format!("{} '{}' not found. Did you mean '{}'?", what, name, sugg),
        None => format!("{} '{}' not found.", what, name),
    }
}

/// Closest candidate within a length-dependent Levenshtein distance.
fn did_you_mean(input: &str, candidates: &[&str]) -> Option<String> {
    let input_lower = input.to_lowercase();
    let threshold = match input.len() {
        0..=2 => 0,
        3..=5 => 2,
        _ => 3,
    };

    let mut best_match = None;
    let mut min_dist = usize::MAX;
    for cand in candidates {
        let dist = levenshtein(&input_lower, &cand.to_lowercase());
        if dist <= threshold && dist < min_dist {
            min_dist = dist;
            best_match = Some(cand.to_string());
        }
    }
    best_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_rows([
            ("DB", "orders", "id", "integer"),
            ("DB", "orders", "customer_id", "integer"),
            ("DB", "orders", "status", "varchar"),
            ("DB", "customers", "customer_id", "integer"),
            ("DB", "customers", "email", "varchar"),
        ])
    }

    fn config(json: &str) -> ExtractionConfig {
        ExtractionConfig::from_json(json).unwrap()
    }

    #[test]
    fn test_valid_config_has_no_issues() {
        let cfg = config(
            r#"{ "sources": [{ "database": "db", "views": [{
                "table": "ORDERS",
                "filters": ["status = 'open'"],
                "joins": [{ "table": "customers", "on": ["customer_id"], "columns": ["email"] }]
            }] }] }"#,
        );
        assert_eq!(validate(&cfg, &schema()), vec![]);
    }

    #[test]
    fn test_unknown_table_suggests() {
        let cfg = config(r#"{ "sources": [{ "database": "DB", "views": [{ "table": "ordres" }] }] }"#);
        let issues = validate(&cfg, &schema());
        assert_eq!(issues.len(), 1);
        assert!(has_errors(&issues));
        assert!(issues[0].message.contains("Did you mean 'orders'?"));
    }

    #[test]
    fn test_unknown_database() {
        let cfg = config(r#"{ "sources": [{ "database": "DW", "views": [{ "table": "orders" }] }] }"#);
        let issues = validate(&cfg, &schema());
        assert_eq!(issues[0].path, "DW");
        assert!(issues[0].message.starts_with("Database 'DW' not found."));
    }

    #[test]
    fn test_column_and_join_issues() {
        let cfg = config(
            r#"{ "sources": [{ "database": "DB", "views": [{
                "table": "orders",
                "columns": ["id", "statsu"],
                "joins": [{ "table": "customers", "on": ["status"] }]
            }] }] }"#,
        );
        let issues = validate(&cfg, &schema());
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("Column 'statsu' not found. Did you mean 'status'?")));
        assert!(messages.iter().any(|m| m.contains("DB/orders/joins/customers")
            && m.contains("Column 'status' not found")));
    }

    #[test]
    fn test_slice_column_missing_is_warning() {
        let cfg = config(
            r#"{ "sources": [{ "database": "DB", "views": [{
                "table": "orders",
                "year_slice": { "column": "yr", "previous_years": 1 }
            }] }] }"#,
        );
        let issues = validate(&cfg, &schema());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!has_errors(&issues));
    }

    #[test]
    fn test_everything_excluded_is_error() {
        let cfg = config(
            r#"{ "sources": [{ "database": "DB", "views": [{
                "table": "customers",
                "exclude": ["customer_id", "email"]
            }] }] }"#,
        );
        let issues = validate(&cfg, &schema());
        assert!(issues.iter().any(|i| i.message == "no columns selected from 'customers'"));
    }

    #[test]
    fn test_bad_filter_expression_reported() {
        let cfg = config(
            r#"{ "sources": [{ "database": "DB", "views": [{
                "table": "orders",
                "filters": ["status ="]
            }] }] }"#,
        );
        let issues = validate(&cfg, &schema());
        assert_eq!(issues[0].path, "DB/orders/filters[0]");
        assert!(issues[0].message.starts_with("Parse error"));
    }
}
