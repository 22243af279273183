use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

/// Strategy for splitting one view into per-year queries.
///
/// Deserializes from either `{ column, start, end }` or
/// `{ column, previous_years }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearSlice {
    /// Explicit inclusive range.
    Fixed { column: String, start: i32, end: i32 },
    /// The current year and the `previous_years` before it.
    Dynamic { column: String, previous_years: u32 },
}

impl YearSlice {
    pub fn fixed(column: impl Into<String>, start: i32, end: i32) -> Self {
        YearSlice::Fixed {
            column: column.into(),
            start,
            end,
        }
    }

    pub fn dynamic(column: impl Into<String>, previous_years: u32) -> Self {
        YearSlice::Dynamic {
            column: column.into(),
            previous_years,
        }
    }

    /// The column compared against each year.
    pub fn column(&self) -> &str {
        match self {
            YearSlice::Fixed { column, .. } | YearSlice::Dynamic { column, .. } => column,
        }
    }

    /// Ascending, inclusive list of years, relative to the local calendar year.
    pub fn calculate_year_range(&self) -> Vec<i32> {
        self.calculate_year_range_at(Local::now().year())
    }

    /// Same as [`calculate_year_range`](Self::calculate_year_range) with an
    /// explicit current year. A fixed range with `start > end` is empty.
    pub fn calculate_year_range_at(&self, current_year: i32) -> Vec<i32> {
        match self {
            YearSlice::Fixed { start, end, .. } => (*start..=*end).collect(),
            YearSlice::Dynamic { previous_years, .. } => {
                let start = current_year.saturating_sub_unsigned(*previous_years);
                (start..=current_year).collect()
            }
        }
    }
}
