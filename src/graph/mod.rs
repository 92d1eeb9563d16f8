//! Domain relation graph.
//!
//! The [`DomainGraph`] is built from a validated
//! [`OverlaySchema`](crate::dsl::OverlaySchema) by [`build_graph`]. Its nodes
//! are domains and its edges run host → remote, one per relation target.
//! [`validate_graph`] runs the cross-domain resource checks.

pub mod builder;
pub mod types;
pub mod validator;

pub use builder::*;
pub use types::*;
pub use validator::validate_graph;
