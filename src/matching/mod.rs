//! Nearest-representative lookup.
//!
//! Used by admission (is a candidate already covered?) and by classification
//! of new proteins against persisted sets.

pub mod nearest;

pub use nearest::{query_nearest, NearestRepresentativeQuery, Representation};
