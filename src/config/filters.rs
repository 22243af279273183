//! Filter definitions as they appear in extraction configs.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::{Operator, ValueKind, Where};
use crate::error::{WexError, WexResult};
use crate::parser::parse_filter_group;

/// A literal filter value.
///
/// Numbers keep their source text so they render exactly as written. Integers
/// beyond 64 bits or decimals beyond `f64` precision are only exact when they
/// come from a filter expression, or from a string value with
/// `kind = "numeric"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(String),
    Text(String),
}

impl Literal {
    pub fn number(text: impl Into<String>) -> Self {
        Literal::Number(text.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Literal::Text(text.into())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Number(_))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(s) | Literal::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Literal::Number(s) => {
                if let Ok(n) = s.parse::<i64>() {
                    serializer.serialize_i64(n)
                } else if let Ok(n) = s.parse::<u64>() {
                    serializer.serialize_u64(n)
                } else {
                    serializer.serialize_str(s)
                }
            }
            Literal::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Literal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LiteralVisitor)
    }
}

struct LiteralVisitor;

impl<'de> Visitor<'de> for LiteralVisitor {
    type Value = Literal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Literal, E> {
        Ok(Literal::Number(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Literal, E> {
        Ok(Literal::Number(v.to_string()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Literal, E> {
        Ok(Literal::Number(v.to_string()))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Literal, E> {
        Ok(Literal::Number(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Literal, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("filter value {} is not a finite number", v)));
        }
        Ok(Literal::Number(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Literal, E> {
        Ok(Literal::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Literal, E> {
        Ok(Literal::Text(v))
    }
}

/// One comparison before its table is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTerm {
    /// Defaults to the table the filter is attached to.
    #[serde(default)]
    pub table: Option<String>,
    pub column: String,
    #[serde(default)]
    pub operator: Operator,
    pub values: Vec<Literal>,
    /// Inferred when absent: numeric if every value is a number.
    #[serde(default)]
    pub kind: Option<ValueKind>,
}

impl FilterTerm {
    pub fn value_kind(&self) -> ValueKind {
        self.kind.unwrap_or_else(|| {
            if !self.values.is_empty() && self.values.iter().all(Literal::is_numeric) {
                ValueKind::Numeric
            } else {
                ValueKind::String
            }
        })
    }

    pub fn table_or<'a>(&'a self, default_table: &'a str) -> &'a str {
        self.table.as_deref().unwrap_or(default_table)
    }

    pub fn to_where(&self, default_table: &str) -> Where {
        Where::new(
            self.table_or(default_table),
            self.column.clone(),
            self.values.iter().map(|v| v.to_string()).collect(),
            self.operator,
            self.value_kind(),
        )
    }
}

/// A term given either as a filter expression or as a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    Expr(String),
    Term(FilterTerm),
}

impl FilterSpec {
    pub fn terms(&self) -> WexResult<Vec<FilterTerm>> {
        match self {
            FilterSpec::Expr(expr) => parse_filter_group(expr),
            FilterSpec::Term(term) => Ok(vec![term.clone()]),
        }
    }

    /// The single term of a global filter. Expressions with `|` are rejected
    /// since every global filter is its own AND-ed group.
    pub fn single_term(&self) -> WexResult<FilterTerm> {
        let mut terms = self.terms()?;
        if terms.len() != 1 {
            return Err(WexError::config(format!(
                "global filter must be a single term, found {}",
                terms.len()
            )));
        }
        Ok(terms.remove(0))
    }
}

/// An OR-group: one expression string or a list of terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterGroup {
    Expr(String),
    Terms(Vec<FilterSpec>),
}

impl FilterGroup {
    pub fn terms(&self) -> WexResult<Vec<FilterTerm>> {
        match self {
            FilterGroup::Expr(expr) => parse_filter_group(expr),
            FilterGroup::Terms(specs) => {
                let mut terms = Vec::new();
                for spec in specs {
                    terms.extend(spec.terms()?);
                }
                Ok(terms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference() {
        let term: FilterTerm =
            serde_json::from_str(r#"{"column":"amount","operator":">","values":[10, 2.5]}"#).unwrap();
        assert_eq!(term.value_kind(), ValueKind::Numeric);
        assert_eq!(term.operator, Operator::Gt);

        let term: FilterTerm =
            serde_json::from_str(r#"{"column":"code","values":["A", 1]}"#).unwrap();
        assert_eq!(term.value_kind(), ValueKind::String);
        assert_eq!(term.operator, Operator::Eq);

        let term: FilterTerm =
            serde_json::from_str(r#"{"column":"code","values":[7],"kind":"string"}"#).unwrap();
        assert_eq!(term.value_kind(), ValueKind::String);
    }

    #[test]
    fn test_structured_numbers_render_as_written() {
        let term: FilterTerm = serde_json::from_str(
            r#"{"column":"id","values":[12345678901234567891, -7, 0.1]}"#,
        )
        .unwrap();
        assert_eq!(
            term.to_where("t").values,
            vec!["12345678901234567891", "-7", "0.1"]
        );

        let term: FilterTerm = serde_json::from_str(
            r#"{"column":"amt","values":["0.12345678901234567891"],"kind":"numeric"}"#,
        )
        .unwrap();
        let w = term.to_where("t");
        assert_eq!(w.values, vec!["0.12345678901234567891"]);
        assert_eq!(w.kind, ValueKind::Numeric);

        let term: FilterTerm = toml::from_str("column = \"n\"\nvalues = [42, 1.5]").unwrap();
        assert_eq!(term.values, vec![Literal::number("42"), Literal::number("1.5")]);
    }

    #[test]
    fn test_to_where_uses_default_table() {
        let term: FilterTerm =
            serde_json::from_str(r#"{"column":"code","values":["A","B"]}"#).unwrap();
        let w = term.to_where("orders");
        assert_eq!(w.table, "orders");
        assert_eq!(w.values, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_group_shapes() {
        let expr: FilterGroup = serde_json::from_str(r#""x = 1 | y = 'a'""#).unwrap();
        assert_eq!(expr.terms().unwrap().len(), 2);

        let list: FilterGroup = serde_json::from_str(
            r#"["x = 1", {"table":"other","column":"y","values":["a"]}]"#,
        )
        .unwrap();
        let terms = list.terms().unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].table.as_deref(), Some("other"));
    }

    #[test]
    fn test_single_term_rejects_disjunction() {
        let spec = FilterSpec::Expr("x = 1 | y = 2".to_string());
        assert!(spec.single_term().is_err());
        let spec = FilterSpec::Expr("x in (1, 2)".to_string());
        assert_eq!(spec.single_term().unwrap().values.len(), 2);
    }
}
