use std::collections::BTreeMap;

use crate::config::ResolverConfig;
use crate::dsl::node::NodePath;
use crate::dsl::schema::{AccessFlags, CpuMode, Direction, OverlaySchema, RelationKind};
use crate::dsl::validation::{Diagnostic, DiagnosticKind};

use super::builder::DomainGraph;

/// 校验域之间的资源一致性
pub fn validate_graph(graph: &DomainGraph, config: &ResolverConfig) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    // 1. 独占设备冲突
    diags.extend(check_exclusive_devices(&graph.schema));

    // 2. CPU 集群冲突
    diags.extend(check_cpu_clusters(&graph.schema));

    // 3. rpmsg 关系配对
    if config.check_relation_pairing {
        diags.extend(check_relation_pairing(graph));
    }

    diags
}

/// A device claimed by several domains conflicts when any claim is exclusive
/// and writable.
pub fn check_exclusive_devices(schema: &OverlaySchema) -> Vec<Diagnostic> {
    let mut claims: BTreeMap<&str, Vec<(&str, AccessFlags)>> = BTreeMap::new();
    for domain in schema.domains.values().filter(|d| !d.rejected) {
        for grant in &domain.access {
            claims
                .entry(grant.dev.as_str())
                .or_default()
                .push((domain.name.as_str(), grant.flags));
        }
    }

    let mut diags = Vec::new();
    for (dev, holders) in &claims {
        for (i, (first, first_flags)) in holders.iter().enumerate() {
            for (second, second_flags) in &holders[i + 1..] {
                if first_flags.conflicts_with(*second_flags) {
                    diags.push(
                        Diagnostic::new(
                            DiagnosticKind::ResourceConflictError,
                            format!(
                                "device `{}` is claimed by `{}` (flags {:#x}) and `{}` (flags {:#x}) with an exclusive writable grant",
                                dev,
                                first,
                                first_flags.bits(),
                                second,
                                second_flags.bits()
                            ),
                        )
                        .with_domain(*second)
                        .at(&access_path(second)),
                    );
                }
            }
        }
    }
    diags
}

/// Lockstep claims own the whole cluster; split claims by different domains
/// need disjoint masks.
pub fn check_cpu_clusters(schema: &OverlaySchema) -> Vec<Diagnostic> {
    let mut claims: BTreeMap<&str, Vec<(&str, u64, CpuMode)>> = BTreeMap::new();
    for domain in schema.domains.values().filter(|d| !d.rejected) {
        for cpu in &domain.cpus {
            claims
                .entry(cpu.cluster.as_str())
                .or_default()
                .push((domain.name.as_str(), cpu.cpumask, cpu.mode));
        }
    }

    let mut diags = Vec::new();
    for (cluster, holders) in &claims {
        for (i, (first, first_mask, first_mode)) in holders.iter().enumerate() {
            for (second, second_mask, second_mode) in &holders[i + 1..] {
                if first == second {
                    continue;
                }
                let reason = if first_mode.lockstep || second_mode.lockstep {
                    "a lockstep claim"
                } else if first_mask & second_mask != 0 {
                    "overlapping cpumasks"
                } else {
                    continue;
                };
                diags.push(
                    Diagnostic::new(
                        DiagnosticKind::ResourceConflictError,
                        format!(
                            "cluster `{}` is claimed by `{}` ({:#x}) and `{}` ({:#x}) with {}",
                            cluster, first, first_mask, second, second_mask, reason
                        ),
                    )
                    .with_domain(*second)
                    .at(&NodePath::root().key("domains").key(second).key("cpus")),
                );
            }
        }
    }
    diags
}

/// An rpmsg relation whose peer does not declare the reverse relation.
pub fn check_relation_pairing(graph: &DomainGraph) -> Vec<Diagnostic> {
    let declares = |domain: &str, direction: Direction, peer: &str| {
        graph.relations().iter().any(|r| {
            r.declared_by == domain
                && r.spec.kind == RelationKind::Rpmsg
                && r.spec.direction == direction
                && r.spec.targets.iter().any(|t| t == peer)
        })
    };

    let mut diags = Vec::new();
    for relation in graph.relations() {
        if relation.spec.kind != RelationKind::Rpmsg {
            continue;
        }
        let reverse = match relation.spec.direction {
            Direction::Remote => Direction::Host,
            Direction::Host => Direction::Remote,
        };
        for target in &relation.spec.targets {
            match graph.schema.domain(target) {
                Some(peer) if !peer.rejected => {}
                _ => continue,
            }
            if !declares(target, reverse, &relation.declared_by) {
                diags.push(
                    Diagnostic::new(
                        DiagnosticKind::UnpairedRelationInfo,
                        format!(
                            "`{}` does not declare an rpmsg relation with `{}: {}`",
                            target,
                            reverse.as_str(),
                            relation.declared_by
                        ),
                    )
                    .with_domain(relation.declared_by.clone())
                    .at(&relation.spec.path),
                );
            }
        }
    }
    diags
}

fn access_path(domain: &str) -> NodePath {
    NodePath::root().key("domains").key(domain).key("access")
}
