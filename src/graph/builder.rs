use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;

use crate::dsl::schema::{Direction, DomainSpec, OverlaySchema, RelationKind};
use crate::dsl::validation::{Diagnostic, DiagnosticKind};
use crate::error::OverlayError;

use super::types::*;

/// 域关系图 - 从已校验的 overlay 构建的不可变图结构
#[derive(Debug, Clone)]
pub struct DomainGraph {
    /// 图结构
    pub graph: StableDiGraph<DomainNode, RelationEdge>,

    /// 域名到 NodeIndex 的映射
    pub domain_index_map: DomainIndexMap,

    /// 所有关系，按声明顺序
    pub relations: Vec<DeclaredRelation>,

    /// 各域的类型化数据
    pub schema: OverlaySchema,
}

impl DomainGraph {
    /// 按文档顺序遍历所有域
    pub fn domains(&self) -> impl Iterator<Item = &DomainSpec> {
        self.schema.domains.values()
    }

    /// 根据域名获取域
    pub fn domain(&self, name: &str) -> Result<&DomainSpec, OverlayError> {
        self.schema
            .domain(name)
            .ok_or_else(|| OverlayError::DomainNotFound(name.to_string()))
    }

    /// 所有关系，按声明顺序
    pub fn relations(&self) -> &[DeclaredRelation] {
        &self.relations
    }

    /// 由该域声明或指向该域的关系
    pub fn relations_of(&self, name: &str) -> Result<Vec<&DeclaredRelation>, OverlayError> {
        self.index_of(name)?;
        Ok(self.relations.iter().filter(|r| r.involves(name)).collect())
    }

    /// 两个域之间的所有边（双向）
    pub fn edges_between(&self, a: &str, b: &str) -> Result<Vec<&RelationEdge>, OverlayError> {
        let a_idx = self.index_of(a)?;
        let b_idx = self.index_of(b)?;
        let forward = self
            .graph
            .edges_directed(a_idx, petgraph::Direction::Outgoing)
            .filter(|e| e.target() == b_idx);
        let backward = self
            .graph
            .edges_directed(b_idx, petgraph::Direction::Outgoing)
            .filter(|e| e.target() == a_idx && a_idx != b_idx);
        Ok(forward.chain(backward).map(|e| e.weight()).collect())
    }

    /// 获取 host 的所有 remote 域名
    pub fn remotes_of(&self, name: &str) -> Result<Vec<String>, OverlayError> {
        self.neighbors(name, petgraph::Direction::Outgoing)
    }

    /// 获取 remote 的所有 host 域名
    pub fn hosts_of(&self, name: &str) -> Result<Vec<String>, OverlayError> {
        self.neighbors(name, petgraph::Direction::Incoming)
    }

    pub fn summary(&self) -> GraphSummary {
        let count = |kind: RelationKind| self.relations.iter().filter(|r| r.spec.kind == kind).count();
        GraphSummary {
            domains: self.graph.node_count(),
            relations: self.relations.len(),
            remoteproc_relations: count(RelationKind::Remoteproc),
            rpmsg_relations: count(RelationKind::Rpmsg),
            edges: self.graph.edge_count(),
        }
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, OverlayError> {
        self.domain_index_map
            .get(name)
            .copied()
            .ok_or_else(|| OverlayError::DomainNotFound(name.to_string()))
    }

    fn neighbors(&self, name: &str, dir: petgraph::Direction) -> Result<Vec<String>, OverlayError> {
        let idx = self.index_of(name)?;
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(idx, dir)
            .filter_map(|n| self.graph.node_weight(n).map(|node| node.name.clone()))
            .collect();
        // 同一对域之间可能有多条边
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// 从已校验的 overlay 构建域关系图，同时检查关系中的引用
pub fn build_graph(schema: OverlaySchema) -> (DomainGraph, Vec<Diagnostic>) {
    let mut graph = StableDiGraph::<DomainNode, RelationEdge>::new();
    let mut domain_index_map: HashMap<String, NodeIndex> = HashMap::new();
    let mut relations = Vec::new();
    let mut diags = Vec::new();

    // 1. 添加所有域
    for domain in schema.domains.values() {
        let idx = graph.add_node(DomainNode {
            name: domain.name.clone(),
            id: domain.id,
        });
        domain_index_map.insert(domain.name.clone(), idx);
    }

    // 2. 按声明顺序添加关系边
    for domain in schema.domains.values() {
        // 结构校验失败的域不参与引用检查
        if domain.rejected {
            continue;
        }
        for spec in &domain.relations {
            let relation = relations.len();
            let error = |kind, message: String| {
                Diagnostic::new(kind, message)
                    .with_domain(domain.name.clone())
                    .at(&spec.path)
            };

            if !spec.elfload.is_empty() && spec.elfload.len() != spec.targets.len() {
                diags.push(error(
                    DiagnosticKind::SchemaViolationError,
                    format!(
                        "{} elfload group(s) for {} remote(s)",
                        spec.elfload.len(),
                        spec.targets.len()
                    ),
                ));
            }

            for dev in &spec.mbox {
                if !domain.has_access(dev) {
                    diags.push(error(
                        DiagnosticKind::UngrantedMailboxError,
                        format!("mailbox `{}` is not in the access list of `{}`", dev, domain.name),
                    ));
                }
            }

            for (index, target) in spec.targets.iter().enumerate() {
                if target == &domain.name {
                    diags.push(error(
                        DiagnosticKind::SchemaViolationError,
                        format!("{} names its own domain `{}`", spec.kind, target),
                    ));
                    continue;
                }
                let Some(peer) = schema.domain(target) else {
                    diags.push(error(
                        DiagnosticKind::UnknownDomainReferenceError,
                        format!("{} references unknown domain `{}`", spec.kind, target),
                    ));
                    continue;
                };

                // host 声明的关系只查本域；remote 声明的关系还可以用 host 的 carveout
                for name in spec.carveouts_for(index) {
                    let found = domain.carveout(name).is_some()
                        || (spec.direction == Direction::Host
                            && (peer.rejected || peer.carveout(name).is_some()));
                    if !found {
                        diags.push(error(
                            DiagnosticKind::UnknownCarveoutReferenceError,
                            format!("carveout `{}` is not reserved for `{}` -> `{}`", name, domain.name, target),
                        ));
                    }
                }

                let (host, remote) = match spec.direction {
                    Direction::Remote => (domain, peer),
                    Direction::Host => (peer, domain),
                };
                for dev in spec.elfload_for(index) {
                    if !host.has_access(dev) && host.carveout(dev).is_none() {
                        diags.push(error(
                            DiagnosticKind::ElfLoadWarning,
                            format!(
                                "elfload `{}` is neither granted to nor reserved by `{}`",
                                dev, host.name
                            ),
                        ));
                    }
                }

                let edge = RelationEdge {
                    kind: spec.kind,
                    relation,
                    host: host.name.clone(),
                    remote: remote.name.clone(),
                    carveouts: spec.carveouts_for(index).to_vec(),
                    mbox: spec.mbox.clone(),
                    elfload: spec.elfload_for(index).to_vec(),
                };
                let source_idx = domain_index_map[&host.name];
                let target_idx = domain_index_map[&remote.name];
                graph.add_edge(source_idx, target_idx, edge);
            }

            relations.push(DeclaredRelation {
                declared_by: domain.name.clone(),
                spec: spec.clone(),
            });
        }
    }

    tracing::debug!(
        domains = graph.node_count(),
        edges = graph.edge_count(),
        relations = relations.len(),
        "domain graph built"
    );

    let graph = DomainGraph {
        graph,
        domain_index_map,
        relations,
        schema,
    };
    (graph, diags)
}
