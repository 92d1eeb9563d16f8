//! Anchor resolution and merge-key expansion.
//!
//! Walks a parsed document in document order. Every `&name` subtree is
//! resolved first and then recorded in the [`AnchorRegistry`]; aliases and
//! merge directives are replaced by copies of the recorded values. The result
//! contains only scalars, sequences and mappings.

use indexmap::IndexMap;

use super::node::{Mapping, MergeMode, MergeRef, Node, NodePath};
use super::validation::{Diagnostic, DiagnosticKind};

/// Resolved anchor values of a single document, in definition order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorRegistry {
    definitions: IndexMap<String, Node>,
}

impl AnchorRegistry {
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn define(&mut self, name: &str, value: Node) {
        // Later definitions shadow earlier ones with the same name.
        self.definitions.insert(name.to_string(), value);
    }
}

/// A document with every anchor, alias and merge directive expanded.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub root: Node,
    pub registry: AnchorRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedDocument {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Resolve one parsed document.
pub fn resolve_document(document: &Node) -> ResolvedDocument {
    let mut resolver = Resolver::default();
    let root = resolver.resolve(document, &NodePath::root());
    tracing::debug!(
        anchors = resolver.registry.len(),
        diagnostics = resolver.diagnostics.len(),
        "document resolved"
    );
    ResolvedDocument {
        root,
        registry: resolver.registry,
        diagnostics: resolver.diagnostics,
    }
}

#[derive(Default)]
struct Resolver {
    registry: AnchorRegistry,
    visiting: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolver {
    fn resolve(&mut self, node: &Node, path: &NodePath) -> Node {
        match node {
            Node::Scalar(_) => node.clone(),
            Node::Anchor(name, inner) => {
                self.visiting.push(name.clone());
                let value = self.resolve(inner, path);
                self.visiting.pop();
                self.registry.define(name, value.clone());
                value
            }
            Node::Alias(name) => self.lookup(name, path).unwrap_or_else(Node::null),
            Node::Sequence(items) => Node::Sequence(self.resolve_sequence(items, path)),
            Node::Mapping(entries) => Node::Mapping(self.resolve_mapping(entries, path)),
            Node::MergeRef(merge) => {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::SchemaViolationError,
                        format!("`{}` is only allowed as a mapping key", merge.mode.key()),
                    )
                    .at(path),
                );
                Node::null()
            }
        }
    }

    /// Copy of a previously defined anchor.
    fn lookup(&mut self, name: &str, path: &NodePath) -> Option<Node> {
        if let Some(pos) = self.visiting.iter().position(|n| n == name) {
            let mut chain: Vec<&str> = self.visiting[pos..].iter().map(String::as_str).collect();
            chain.push(name);
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::CyclicReferenceError,
                    format!("anchor references itself: {}", chain.join(" -> ")),
                )
                .at(path),
            );
            return None;
        }
        match self.registry.get(name) {
            Some(value) => Some(value.clone()),
            None => {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UndefinedAnchorError,
                        format!("alias *{} has no matching anchor", name),
                    )
                    .at(path),
                );
                None
            }
        }
    }

    fn resolve_mapping(&mut self, entries: &Mapping, path: &NodePath) -> Mapping {
        let mut out = Mapping::new();
        for (key, value) in entries {
            match value {
                Node::MergeRef(merge) => self.apply_merge(&mut out, merge, &path.key(key)),
                other => {
                    let child = path.key(key);
                    let resolved = self.resolve(other, &child);
                    self.set_entry(&mut out, key, resolved, &child);
                }
            }
        }
        out
    }

    fn apply_merge(&mut self, out: &mut Mapping, merge: &MergeRef, path: &NodePath) {
        for anchor in &merge.anchors {
            let Some(target) = self.lookup(anchor, path) else {
                continue;
            };
            match (target, merge.mode) {
                (Node::Mapping(source), MergeMode::Overwrite) => {
                    for (key, value) in source {
                        self.set_entry(out, &key, value, path);
                    }
                }
                (Node::Mapping(source), MergeMode::Append) => {
                    for (key, value) in source {
                        self.append_entry(out, &key, value, path);
                    }
                }
                // Sequences and scalars land under the anchor's own name.
                (other, MergeMode::Overwrite) => self.set_entry(out, anchor, other, path),
                (other, MergeMode::Append) => self.append_entry(out, anchor, other, path),
            }
        }
    }

    fn set_entry(&mut self, out: &mut Mapping, key: &str, value: Node, path: &NodePath) {
        if let (Some(Node::Scalar(old)), Node::Scalar(new)) = (out.get(key), &value) {
            if old != new {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::MergeConflictWarning,
                        format!("`{}` overwritten: {} -> {}", key, old, new),
                    )
                    .at(path),
                );
            }
        }
        out.insert(key.to_string(), value);
    }

    /// `<<+` into a key that is already present. Unlike `<<`, a present
    /// sequence is extended and a present mapping is merged key by key; only
    /// other values are overwritten.
    fn append_entry(&mut self, out: &mut Mapping, key: &str, value: Node, path: &NodePath) {
        match (out.get_mut(key), value) {
            // keep existing items, then the merged ones
            (Some(Node::Sequence(existing)), Node::Sequence(items)) => existing.extend(items),
            // recurse instead of replacing the whole mapping
            (Some(Node::Mapping(existing)), Node::Mapping(source)) => {
                let child = path.key(key);
                for (k, v) in source {
                    self.append_entry(existing, &k, v, &child);
                }
            }
            (_, value) => self.set_entry(out, key, value, path),
        }
    }

    fn resolve_sequence(&mut self, items: &[Node], path: &NodePath) -> Vec<Node> {
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let item_path = path.index(index);
            match splice_directives(item) {
                Some(directives) => {
                    for merge in directives {
                        self.splice(&mut out, merge, &item_path);
                    }
                }
                None => out.push(self.resolve(item, &item_path)),
            }
        }
        out
    }

    fn splice(&mut self, out: &mut Vec<Node>, merge: &MergeRef, path: &NodePath) {
        for anchor in &merge.anchors {
            let Some(target) = self.lookup(anchor, path) else {
                continue;
            };
            let elements = match target {
                Node::Sequence(items) => items,
                other => vec![other],
            };
            if merge.mode == MergeMode::Overwrite {
                out.clear();
            }
            out.extend(elements);
        }
    }
}

/// A sequence item made only of merge directives, like `- <<+: [*a, *b]`.
fn splice_directives(item: &Node) -> Option<Vec<&MergeRef>> {
    let entries = item.as_mapping()?;
    if entries.is_empty() {
        return None;
    }
    entries
        .values()
        .map(|value| match value {
            Node::MergeRef(merge) => Some(merge),
            _ => None,
        })
        .collect()
}

/// Deep-merge resolved documents in load order.
///
/// Mappings merge key by key; any other value is replaced by the later one.
pub fn merge_documents(documents: Vec<Node>) -> (Node, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut iter = documents.into_iter();
    let Some(mut merged) = iter.next() else {
        return (Node::Mapping(Mapping::new()), diagnostics);
    };
    for document in iter {
        deep_merge(&mut merged, document, &NodePath::root(), &mut diagnostics);
    }
    (merged, diagnostics)
}

fn deep_merge(base: &mut Node, overlay: Node, path: &NodePath, diagnostics: &mut Vec<Diagnostic>) {
    match (base, overlay) {
        (Node::Mapping(target), Node::Mapping(source)) => {
            for (key, value) in source {
                let child = path.key(&key);
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value, &child, diagnostics),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => {
            if let (Node::Scalar(old), Node::Scalar(new)) = (&*base, &overlay) {
                if old != new {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::MergeConflictWarning,
                            format!("later document replaces {} with {}", old, new),
                        )
                        .at(path),
                    );
                }
            }
            *base = overlay;
        }
    }
}
