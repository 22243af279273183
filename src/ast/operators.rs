use serde::{Deserialize, Serialize};

/// Comparison operator of a filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "=", alias = "eq", alias = "equal")]
    Eq,
    #[serde(rename = "<>", alias = "!=", alias = "ne")]
    Ne,
    #[serde(rename = "<", alias = "lt", alias = "less")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Lte,
    #[serde(rename = ">", alias = "gt", alias = "greater")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Gte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "not like", alias = "not_like")]
    NotLike,
}

impl Operator {
    /// The literal SQL symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How the literal values of a filter term are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Single-quoted.
    #[default]
    String,
    /// Rendered as-is.
    Numeric,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => f.write_str("inner"),
            JoinKind::Left => f.write_str("left"),
        }
    }
}
