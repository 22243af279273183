//! Building blocks the query builder accumulates: filter terms and their
//! groups, joins, operators and year slices.

pub mod conditions;
pub mod joins;
pub mod operators;
pub mod slice;

pub use self::conditions::*;
pub use self::joins::*;
pub use self::operators::*;
pub use self::slice::*;
