// Attribute Micro-Clustering
//
// This module implements the priority-ordered combinatorial grouping
// of contact records: every subset of the configured field list is
// tried from most to least specific, each over the shrinking pool of
// unassigned records, with a minimum-size constraint and a single
// catch-all cluster for leftovers.
//
// The field list itself is TOML configuration, not code, so new
// grouping attributes ship without touching the search.

mod engine;
mod fields;

pub use engine::{partition, Cluster, EngineError, Partition, ANY_VALUE, LEFTOVER_TAG};
pub use fields::{Field, FieldBinding, FieldSpec};
