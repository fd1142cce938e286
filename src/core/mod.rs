pub mod day_range;
pub mod query_outcome;
pub mod query_result;

pub use day_range::DayRange;
pub use query_outcome::QueryOutcome;
pub use query_result::{Column, ColumnKind, QueryResult, Value};
