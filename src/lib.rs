//! # domain-overlay: AMP domain overlay resolver
//!
//! `domain_overlay` reads hardware-partitioning overlays written in YAML (or
//! JSON/TOML), expands anchors together with the `<<` and `<<+` merge keys,
//! and checks the resulting domains against each other:
//!
//! - **Anchor resolution**: aliases, overwrite merges (`<<`) and append
//!   merges (`<<+`) in mappings and sequences, with cycle detection.
//! - **Schema validation**: CPUs, device access, reserved memory, memory and
//!   SRAM ranges, and `domain-to-domain` relations. Unknown keys are passed
//!   through or rejected, depending on configuration.
//! - **Relation graph**: a `petgraph` graph of domains with one host → remote
//!   edge per relation target.
//! - **Resource checks**: exclusive device grants, CPU cluster claims,
//!   carveout and mailbox references, rpmsg pairing.
//! - **Canonical output**: a deterministic JSON form of the resolved overlay.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use domain_overlay::{emit, DslFormat, OverlayCompiler};
//!
//! let yaml = std::fs::read_to_string("overlay.yaml").unwrap();
//! let compiler = OverlayCompiler::default();
//! let resolved = compiler.compile(&yaml, DslFormat::Yaml).unwrap();
//! println!("{:?}", resolved.summary());
//! println!("{}", emit(&resolved, &compiler.config().emit).unwrap());
//! ```

pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod graph;

pub use crate::compiler::{emit, OverlayCompiler, OverlaySource, ResolvedOverlay};
pub use crate::config::{EmitConfig, ResolverConfig};
pub use crate::dsl::{
    parse_overlay, resolve_document, validate_overlay, Diagnostic, DiagnosticKind,
    DiagnosticLevel, DslFormat, Node, OverlaySchema, ValidationReport,
};
pub use crate::error::{OverlayError, OverlayResult};
pub use crate::graph::{build_graph, validate_graph, DomainGraph, GraphSummary};
