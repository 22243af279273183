//! SQL rendering for builder state.
//!
//! Rendering is total: a missing alias falls back to the bare table name and
//! an empty join column list renders an empty `on`, leaving the server to
//! reject the statement.

use crate::alias::AliasMap;
use crate::ast::*;

/// What a node needs to know to render itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub database: &'a str,
    pub aliases: &'a AliasMap,
}

/// Trait for converting builder nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL fragment.
    fn to_sql(&self, ctx: &RenderContext<'_>) -> String;
}

impl Where {
    /// One rendered term per value.
    pub fn render_terms(&self, ctx: &RenderContext<'_>) -> Vec<String> {
        let alias = ctx.aliases.resolve(&self.table);
        self.values
            .iter()
            .map(|v| {
                format!(
                    "{}.{} {} {}",
                    alias,
                    self.column,
                    self.operator.symbol(),
                    encode_value(v, self.kind)
                )
            })
            .collect()
    }
}

/// Quote string-kind values, doubling embedded quotes.
pub fn encode_value(value: &str, kind: ValueKind) -> String {
    match kind {
        ValueKind::String => format!("'{}'", value.replace('\'', "''")),
        ValueKind::Numeric => value.to_string(),
    }
}

fn or_join(terms: Vec<String>) -> String {
    format!("({})", terms.join(" or "))
}

impl ToSql for OrGroup {
    fn to_sql(&self, ctx: &RenderContext<'_>) -> String {
        or_join(self.terms.iter().flat_map(|w| w.render_terms(ctx)).collect())
    }
}

impl ToSql for GlobalWhere {
    fn to_sql(&self, ctx: &RenderContext<'_>) -> String {
        or_join(self.0.render_terms(ctx))
    }
}

impl ToSql for JoinInfo {
    fn to_sql(&self, ctx: &RenderContext<'_>) -> String {
        let left = ctx.aliases.resolve(&self.left);
        let right = ctx.aliases.resolve(&self.right);
        let on: Vec<String> = self
            .on
            .iter()
            .map(|c| format!("{left}.{c}={right}.{c}"))
            .collect();
        format!(
            "{} join {}.{} {} on {}",
            self.kind,
            ctx.database,
            self.right,
            right,
            on.join(" and ")
        )
    }
}

impl ToSql for Conditions {
    /// `where g1 and g2 ...`, groups before globals; empty when there are none.
    fn to_sql(&self, ctx: &RenderContext<'_>) -> String {
        if self.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|g| g.to_sql(ctx))
            .chain(self.globals.iter().map(|g| g.to_sql(ctx)))
            .collect();
        format!("where {}", parts.join(" and "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasAllocator;

    fn aliases(tables: &[&str]) -> AliasMap {
        let mut alloc = AliasAllocator::default();
        let mut map = AliasMap::default();
        for t in tables {
            map.get_or_assign(t, &mut alloc);
        }
        map
    }

    fn values(vs: &[&str]) -> Vec<String> {
        vs.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_where_fans_out_per_value() {
        let map = aliases(&["t"]);
        let ctx = RenderContext { database: "DB", aliases: &map };
        let w = Where::new("t", "code", values(&["A", "B", "C"]), Operator::Eq, ValueKind::String);
        assert_eq!(
            w.render_terms(&ctx),
            vec!["a.code = 'A'", "a.code = 'B'", "a.code = 'C'"]
        );
    }

    #[test]
    fn test_numeric_values_unquoted() {
        let map = aliases(&["t"]);
        let ctx = RenderContext { database: "DB", aliases: &map };
        let w = Where::new("t", "amount", values(&["10"]), Operator::Gt, ValueKind::Numeric);
        assert_eq!(w.render_terms(&ctx), vec!["a.amount > 10"]);
    }

    #[test]
    fn test_string_quotes_are_doubled() {
        assert_eq!(encode_value("O'Brien", ValueKind::String), "'O''Brien'");
    }

    #[test]
    fn test_or_group_render() {
        let map = aliases(&["t"]);
        let ctx = RenderContext { database: "DB", aliases: &map };
        let group = OrGroup {
            terms: vec![
                Where::new("t", "column", values(&["1"]), Operator::Eq, ValueKind::Numeric),
                Where::new("t", "column2", values(&["lol"]), Operator::Eq, ValueKind::String),
            ],
        };
        assert_eq!(group.to_sql(&ctx), "(a.column = 1 or a.column2 = 'lol')");
    }

    #[test]
    fn test_join_render() {
        let map = aliases(&["orders", "customers"]);
        let ctx = RenderContext { database: "DB", aliases: &map };
        let join = JoinInfo {
            kind: JoinKind::Left,
            left: "orders".into(),
            right: "customers".into(),
            on: values(&["customer_id", "region"]),
        };
        assert_eq!(
            join.to_sql(&ctx),
            "left join DB.customers b on a.customer_id=b.customer_id and a.region=b.region"
        );
    }

    #[test]
    fn test_conditions_groups_before_globals() {
        let map = aliases(&["t"]);
        let ctx = RenderContext { database: "DB", aliases: &map };
        let conditions = Conditions {
            groups: vec![OrGroup {
                terms: vec![Where::new("t", "x", values(&["1"]), Operator::Eq, ValueKind::Numeric)],
            }],
            globals: vec![GlobalWhere(Where::new(
                "t",
                "key",
                values(&["k1", "k2"]),
                Operator::Eq,
                ValueKind::String,
            ))],
        };
        assert_eq!(
            conditions.to_sql(&ctx),
            "where (a.x = 1) and (a.key = 'k1' or a.key = 'k2')"
        );
        assert_eq!(Conditions::default().to_sql(&ctx), "");
    }
}
