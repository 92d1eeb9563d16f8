//! Node-to-value conversions shared by the structure checks.
//!
//! Each helper returns the message of a schema violation on failure; the
//! caller attaches domain and path.

use std::collections::BTreeSet;

use crate::dsl::node::Node;

pub(crate) fn to_u64(node: &Node, what: &str) -> Result<u64, String> {
    let value = node
        .as_int()
        .ok_or_else(|| format!("`{}` must be an integer, found {}", what, describe(node)))?;
    u64::try_from(value).map_err(|_| format!("`{}` must be a non-negative integer, found {}", what, value))
}

pub(crate) fn to_bool(node: &Node, what: &str) -> Result<bool, String> {
    node.as_scalar()
        .and_then(|s| s.as_bool_like())
        .ok_or_else(|| format!("`{}` must be a boolean or 0/1, found {}", what, describe(node)))
}

pub(crate) fn to_name(node: &Node, what: &str) -> Result<String, String> {
    match node.as_str() {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        Some(_) => Err(format!("`{}` must not be empty", what)),
        None => Err(format!("`{}` must be a name, found {}", what, describe(node))),
    }
}

/// A single name or a sequence of names.
pub(crate) fn to_names(node: &Node, what: &str) -> Result<Vec<String>, String> {
    match node {
        Node::Sequence(items) => items.iter().map(|item| to_name(item, what)).collect(),
        other => Ok(vec![to_name(other, what)?]),
    }
}

pub(crate) fn to_string_set(node: &Node, what: &str) -> Result<BTreeSet<String>, String> {
    Ok(to_names(node, what)?.into_iter().collect())
}

/// Either a flat list of names (one group) or a list of name lists.
pub(crate) fn to_name_groups(node: &Node, what: &str) -> Result<Vec<Vec<String>>, String> {
    let Node::Sequence(items) = node else {
        return Ok(vec![to_names(node, what)?]);
    };
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let nested = items.iter().filter(|item| item.as_sequence().is_some()).count();
    if nested == 0 {
        return Ok(vec![to_names(node, what)?]);
    }
    if nested != items.len() {
        return Err(format!("`{}` mixes names and name groups", what));
    }
    items.iter().map(|group| to_names(group, what)).collect()
}

pub(crate) fn describe(node: &Node) -> String {
    match node {
        Node::Scalar(scalar) => scalar.to_string(),
        other => other.kind().to_string(),
    }
}
