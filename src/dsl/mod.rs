//! Overlay DSL: node model, parsing, anchor resolution and schema checks.

pub mod node;
pub mod parser;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use node::{MergeMode, MergeRef, Node, NodeKind, NodePath, Scalar};
pub use parser::{parse_overlay, DslFormat};
pub use resolver::{merge_documents, resolve_document, AnchorRegistry, ResolvedDocument};
pub use schema::*;
pub use validation::{validate_overlay, Diagnostic, DiagnosticKind, DiagnosticLevel, ValidationReport};
