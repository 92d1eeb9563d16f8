//! Canonical JSON form of a resolved overlay.
//!
//! Domains are sorted by name, access entries by device, carveouts by start
//! address; relations and edges keep declaration order. Integers are written
//! as hex strings. The same overlay always produces the same bytes.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::EmitConfig;
use crate::dsl::node::Node;
use crate::dsl::schema::{DomainSpec, MemoryRange};
use crate::dsl::validation::Diagnostic;
use crate::error::OverlayError;
use crate::graph::GraphSummary;

use super::compiled_overlay::ResolvedOverlay;

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct EmittedOverlay<'a> {
    domains: BTreeMap<&'a str, EmittedDomain<'a>>,
    relations: Vec<EmittedRelation<'a>>,
    edges: Vec<EmittedEdge<'a>>,
    summary: GraphSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    passthrough: Option<&'a IndexMap<String, Node>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a [Diagnostic]>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct EmittedDomain<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    compatible: &'a BTreeSet<String>,
    cpus: Vec<EmittedCpu<'a>>,
    access: Vec<EmittedGrant<'a>>,
    reserved_memory: EmittedReservedMemory<'a>,
    memory: Vec<EmittedRange>,
    sram: Vec<EmittedRange>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    relation_compatible: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passthrough: Option<&'a IndexMap<String, Node>>,
}

#[derive(Serialize)]
struct EmittedCpu<'a> {
    cluster: &'a str,
    cpumask: String,
    secure: bool,
    el: u8,
    lockstep: bool,
}

#[derive(Serialize)]
struct EmittedGrant<'a> {
    dev: &'a str,
    flags: String,
}

#[derive(Serialize)]
struct EmittedReservedMemory<'a> {
    attributes: &'a IndexMap<String, Node>,
    carveouts: Vec<EmittedCarveout<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct EmittedCarveout<'a> {
    name: &'a str,
    start: String,
    size: String,
    no_map: bool,
}

#[derive(Serialize)]
struct EmittedRange {
    start: String,
    size: String,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct EmittedRelation<'a> {
    kind: &'static str,
    declared_by: &'a str,
    direction: &'static str,
    targets: &'a [String],
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    compatible: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    carveouts: &'a [Vec<String>],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    mbox: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    elfload: &'a [Vec<String>],
}

#[derive(Serialize)]
struct EmittedEdge<'a> {
    kind: &'static str,
    host: &'a str,
    remote: &'a str,
    carveouts: &'a [String],
    mbox: &'a [String],
    elfload: &'a [String],
}

fn hex(value: u64) -> String {
    format!("{:#x}", value)
}

fn emit_ranges(ranges: &[MemoryRange]) -> Vec<EmittedRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| (r.start, r.size));
    sorted
        .into_iter()
        .map(|r| EmittedRange {
            start: hex(r.start),
            size: hex(r.size),
        })
        .collect()
}

fn emit_domain<'a>(domain: &'a DomainSpec, config: &EmitConfig) -> EmittedDomain<'a> {
    let mut access: Vec<_> = domain
        .access
        .iter()
        .map(|g| EmittedGrant {
            dev: g.dev.as_str(),
            flags: format!("{:#x}", g.flags.bits()),
        })
        .collect();
    access.sort_by(|a, b| a.dev.cmp(b.dev));

    let mut carveouts: Vec<_> = domain.reserved_memory.carveouts.iter().collect();
    carveouts.sort_by(|a, b| (a.start, a.size, &a.name).cmp(&(b.start, b.size, &b.name)));

    EmittedDomain {
        id: domain.id.map(hex),
        compatible: &domain.compatible,
        cpus: domain
            .cpus
            .iter()
            .map(|c| EmittedCpu {
                cluster: c.cluster.as_str(),
                cpumask: hex(c.cpumask),
                secure: c.mode.secure,
                el: c.mode.el,
                lockstep: c.mode.lockstep,
            })
            .collect(),
        access,
        reserved_memory: EmittedReservedMemory {
            attributes: &domain.reserved_memory.attributes,
            carveouts: carveouts
                .into_iter()
                .map(|c| EmittedCarveout {
                    name: c.name.as_str(),
                    start: hex(c.start),
                    size: hex(c.size),
                    no_map: c.no_map,
                })
                .collect(),
        },
        memory: emit_ranges(&domain.memory),
        sram: emit_ranges(&domain.sram),
        relation_compatible: &domain.relation_compatible,
        passthrough: (config.include_passthrough && !domain.passthrough.is_empty())
            .then_some(&domain.passthrough),
    }
}

/// Serialize a resolved overlay to canonical JSON.
pub fn emit(overlay: &ResolvedOverlay, config: &EmitConfig) -> Result<String, OverlayError> {
    let graph = &overlay.graph;
    let schema = &graph.schema;

    let domains = graph
        .domains()
        .map(|d| (d.name.as_str(), emit_domain(d, config)))
        .collect();

    let relations = graph
        .relations()
        .iter()
        .map(|r| EmittedRelation {
            kind: r.spec.kind.as_str(),
            declared_by: r.declared_by.as_str(),
            direction: r.spec.direction.as_str(),
            targets: &r.spec.targets,
            compatible: &r.spec.compatible,
            carveouts: &r.spec.carveouts,
            mbox: &r.spec.mbox,
            elfload: &r.spec.elfload,
        })
        .collect();

    let edges = graph
        .graph
        .edge_indices()
        .filter_map(|idx| graph.graph.edge_weight(idx))
        .map(|e| EmittedEdge {
            kind: e.kind.as_str(),
            host: e.host.as_str(),
            remote: e.remote.as_str(),
            carveouts: &e.carveouts,
            mbox: &e.mbox,
            elfload: &e.elfload,
        })
        .collect();

    let document = EmittedOverlay {
        domains,
        relations,
        edges,
        summary: graph.summary(),
        passthrough: (config.include_passthrough && !schema.passthrough.is_empty())
            .then_some(&schema.passthrough),
        diagnostics: (config.include_diagnostics && !overlay.report.diagnostics.is_empty())
            .then_some(overlay.report.diagnostics.as_slice()),
    };

    let result = if config.pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };
    result.map_err(|e| OverlayError::EmitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::OverlayCompiler;
    use crate::dsl::parser::DslFormat;

    const OVERLAY: &str = r#"
vendor-note: keep me
domains:
  zeta:
    id: 2
    access:
      - {dev: uart1, flags: 0}
      - {dev: ipi@ff310000, flags: 0}
    reserved-memory:
      high: {start: 0x3ef00000, size: 0x1000, no-map: 1}
      low: {start: 0x3ed00000, size: 0x1000, no-map: 1}
    board-extras: {led: 3}
  alpha:
    cpus:
      - {cluster: cpus_a53, cpumask: 0xf, mode: {el: 1}}
"#;

    fn compile() -> ResolvedOverlay {
        OverlayCompiler::default().compile(OVERLAY, DslFormat::Yaml).unwrap()
    }

    #[test]
    fn test_canonical_ordering_and_hex() {
        let config = EmitConfig {
            pretty: false,
            ..EmitConfig::default()
        };
        let json = emit(&compile(), &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let zeta = &value["domains"]["zeta"];
        assert_eq!(zeta["id"], "0x2");
        assert_eq!(zeta["access"][0]["dev"], "ipi@ff310000");
        assert_eq!(zeta["access"][1]["flags"], "0x0");
        assert_eq!(zeta["reserved-memory"]["carveouts"][0]["name"], "low");
        assert_eq!(zeta["reserved-memory"]["carveouts"][0]["no-map"], true);
        assert_eq!(zeta["passthrough"]["board-extras"]["led"], 3);
        assert_eq!(value["domains"]["alpha"]["cpus"][0]["cpumask"], "0xf");
        assert_eq!(value["passthrough"]["vendor-note"], "keep me");
        assert!(json.find("\"alpha\"").unwrap() < json.find("\"zeta\"").unwrap());
        assert!(value.get("diagnostics").is_none());
    }

    #[test]
    fn test_emit_is_byte_stable() {
        let config = EmitConfig::default();
        assert_eq!(emit(&compile(), &config).unwrap(), emit(&compile(), &config).unwrap());
    }

    #[test]
    fn test_optional_sections() {
        let config = EmitConfig {
            pretty: true,
            include_diagnostics: true,
            include_passthrough: false,
        };
        let json = emit(&compile(), &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("passthrough").is_none());
        assert!(value["domains"]["zeta"].get("passthrough").is_none());
        let diags = value["diagnostics"].as_array().unwrap();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0]["kind"], "UnknownKeyInfo");
    }
}
