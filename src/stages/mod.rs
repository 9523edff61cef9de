//! Table-to-table transforms, in pipeline order. Each stage takes a table by
//! reference and returns a new one plus whatever it fitted or measured.

pub mod repair;
pub mod dedup;
pub mod label;
pub mod outliers;
pub mod encoding;
pub mod scaling;
pub mod correlation;
pub mod selection;

pub use correlation::{ColumnOrder, CorrelationMatrix};
pub use encoding::CategoryEncoder;
pub use label::ClassCounts;
pub use scaling::MinMaxScaler;
