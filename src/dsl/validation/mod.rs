mod coerce;
mod layer1_structure;
mod types;

use crate::config::ResolverConfig;
use crate::dsl::node::Node;
use crate::dsl::schema::OverlaySchema;

pub use types::{Diagnostic, DiagnosticKind, DiagnosticLevel, ValidationReport};

/// Check a resolved tree against the domain schema.
///
/// Returns the typed overlay together with every structural diagnostic. The
/// overlay is partial when error diagnostics are present.
pub fn validate_overlay(root: &Node, config: &ResolverConfig) -> (OverlaySchema, Vec<Diagnostic>) {
    layer1_structure::validate(root, config.strict_unknown_keys)
}
