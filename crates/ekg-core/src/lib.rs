//! EKG Core Library
//!
//! Configuration models for the event knowledge graph builder: the semantic
//! header (graph shape) and the data structures (raw-table shape), plus
//! validation and the step performance recorder.

pub mod datasets;
pub mod error;
pub mod header;
pub mod perf;
pub mod validate;

pub use error::{EkgError, EkgResult};
