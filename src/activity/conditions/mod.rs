//! Built-in conditions

pub mod coordinate;
pub mod time_of_day;
pub mod variable;
pub mod vicinity;

pub use coordinate::CoordinateCondition;
pub use time_of_day::TimeOfDayCondition;
pub use variable::{Comparison, VariableCondition};
pub use vicinity::PositionVicinityCondition;
