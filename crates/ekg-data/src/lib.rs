//! EKG Data Library
//!
//! Turns raw event-log CSVs into prepared tables whose columns match the
//! attribute names declared in the dataset configuration.

pub mod prepare;
pub mod table;

pub use prepare::TablePreparer;
pub use table::{is_missing, Table};
