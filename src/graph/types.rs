use petgraph::stable_graph::NodeIndex;
use serde::Serialize;

use crate::dsl::schema::{RelationKind, RelationSpec};

/// 图节点：一个域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainNode {
    /// 域名（对应 overlay 中 `domains` 下的键）
    pub name: String,

    /// 子系统 ID
    pub id: Option<u64>,
}

/// 图边：host → remote，每个 (关系, 目标) 一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    /// 关系类型
    pub kind: RelationKind,

    /// 所属关系在 [`DomainGraph::relations`](super::DomainGraph::relations) 中的下标
    pub relation: usize,

    pub host: String,
    pub remote: String,

    /// 该目标使用的 carveout 名称
    pub carveouts: Vec<String>,

    /// 邮箱设备
    pub mbox: Vec<String>,

    /// ELF 加载设备
    pub elfload: Vec<String>,
}

/// 带声明域的关系
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredRelation {
    /// 声明该关系的域
    pub declared_by: String,
    pub spec: RelationSpec,
}

impl DeclaredRelation {
    /// Whether `domain` declares or is named by this relation.
    pub fn involves(&self, domain: &str) -> bool {
        self.declared_by == domain || self.spec.targets.iter().any(|t| t == domain)
    }
}

/// 图统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GraphSummary {
    pub domains: usize,
    pub relations: usize,
    pub remoteproc_relations: usize,
    pub rpmsg_relations: usize,
    pub edges: usize,
}

/// 域名到 petgraph NodeIndex 的映射
pub type DomainIndexMap = std::collections::HashMap<String, NodeIndex>;
