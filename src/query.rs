//! Finished, executable statements.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A column in the select list of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedColumn {
    pub table: String,
    pub alias: String,
    pub name: String,
    /// Declared type, when the column is known to the schema.
    pub data_type: Option<String>,
}

impl SelectedColumn {
    /// `<alias>.<name>` as it appears in the select list.
    pub fn expr(&self) -> String {
        format!("{}.{}", self.alias, self.name)
    }
}

/// One statement produced by [`QueryBuilder::build_queries`](crate::builder::QueryBuilder::build_queries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// SQL text terminated by `;`.
    pub sql: String,
    pub database: String,
    /// The primary (first registered) table.
    pub table: String,
    pub dataset: String,
    /// The year this statement is restricted to, empty when unsliced.
    pub slice: String,
    pub columns: Vec<SelectedColumn>,
}

impl Query {
    pub fn is_sliced(&self) -> bool {
        !self.slice.is_empty()
    }

    /// Human-readable identifier, e.g. `sales/orders[2021]`.
    pub fn label(&self) -> String {
        if self.is_sliced() {
            format!("{}/{}[{}]", self.dataset, self.table, self.slice)
        } else {
            format!("{}/{}", self.dataset, self.table)
        }
    }

    /// File name stem for this statement's output, e.g. `sales_orders_2021`.
    pub fn file_stem(&self) -> String {
        let mut parts = vec![self.dataset.as_str(), self.table.as_str()];
        if self.is_sliced() {
            parts.push(&self.slice);
        }
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .map(sanitize)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Output column names. A name selected from more than one table is
    /// qualified as `<table>.<name>`; exact repeats get a `_2`, `_3` suffix.
    pub fn column_names(&self) -> Vec<String> {
        let qualified: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let shared = self
                    .columns
                    .iter()
                    .any(|o| o.name.eq_ignore_ascii_case(&c.name) && !o.table.eq_ignore_ascii_case(&c.table));
                if shared {
                    format!("{}.{}", c.table, c.name)
                } else {
                    c.name.clone()
                }
            })
            .collect();
        unique_names(&qualified)
    }
}

/// Suffix repeated names (case-insensitive) with `_2`, `_3`, ... in order.
pub fn unique_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let mut candidate = name.to_string();
        let mut n = 1;
        while !taken.insert(candidate.to_lowercase()) {
            n += 1;
            candidate = format!("{}_{}", name, n);
        }
        out.push(candidate);
    }
    out
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(dataset: &str, slice: &str) -> Query {
        Query {
            sql: "select a.id from DB.orders a;".into(),
            database: "DB".into(),
            table: "orders".into(),
            dataset: dataset.into(),
            slice: slice.into(),
            columns: vec![],
        }
    }

    #[test]
    fn test_label_and_stem() {
        let q = query("sales", "2021");
        assert!(q.is_sliced());
        assert_eq!(q.label(), "sales/orders[2021]");
        assert_eq!(q.file_stem(), "sales_orders_2021");

        let q = query("sales", "");
        assert_eq!(q.label(), "sales/orders");
        assert_eq!(q.file_stem(), "sales_orders");
    }

    fn column(table: &str, alias: &str, name: &str) -> SelectedColumn {
        SelectedColumn {
            table: table.into(),
            alias: alias.into(),
            name: name.into(),
            data_type: None,
        }
    }

    #[test]
    fn test_shared_column_names_are_qualified() {
        let mut q = query("sales", "");
        q.columns = vec![
            column("orders", "a", "id"),
            column("orders", "a", "customer_id"),
            column("customers", "b", "customer_id"),
            column("orders", "a", "id"),
        ];
        assert_eq!(
            q.column_names(),
            vec!["id", "orders.customer_id", "customers.customer_id", "id_2"]
        );
    }

    #[test]
    fn test_unique_names_skips_taken_suffixes() {
        assert_eq!(unique_names(&["a", "a_2", "a", "A"]), vec!["a", "a_2", "a_3", "A_4"]);
    }

    #[test]
    fn test_stem_sanitizes_separators() {
        let q = query("eu sales/2", "");
        assert_eq!(q.file_stem(), "eu_sales_2_orders");
    }
}
