//! Spec layer: dataset description (JSON) + resolution against a loaded
//! table's headers.
//!
//! Column names are resolved once, right after loading. A required column
//! that cannot be found, or a candidate list that matches more than one
//! header, is a hard error instead of a silent first pick.

pub mod column;
pub mod dataset;

pub use column::ColumnRefSpec;
pub use dataset::{DatasetSpec, ResolvedSpec};
