use serde::{Deserialize, Serialize};

use crate::ast::{Operator, ValueKind};

/// A single comparison: `<table>.<column> <op> <value>` for every value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Where {
    pub table: String,
    pub column: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub kind: ValueKind,
}

impl Where {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<String>,
        operator: Operator,
        kind: ValueKind,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            values,
            operator,
            kind,
        }
    }
}

/// Disjunction of [`Where`] terms, rendered as `(t1 or t2 or ...)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrGroup {
    pub terms: Vec<Where>,
}

impl OrGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, term: Where) {
        self.terms.push(term);
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// A condition applied to every query of a build cycle, independent of the
/// view's own OR-groups. Always AND-ed after them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalWhere(pub Where);

/// The WHERE-side state of one build cycle.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    pub groups: Vec<OrGroup>,
    pub globals: Vec<GlobalWhere>,
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.globals.is_empty()
    }
}
