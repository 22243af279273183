use serde::{Deserialize, Serialize};

use crate::ast::JoinKind;

/// One equi-join clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinInfo {
    pub kind: JoinKind,
    pub left: String,
    pub right: String,
    /// Columns compared pairwise, `left.c = right.c`.
    pub on: Vec<String>,
}
