//! DSL parser: converts raw overlay text into [`Node`] trees.
//!
//! YAML input is read through the `yaml-rust2` event stream so that anchors,
//! aliases and the `<<` / `<<+` merge keys survive as explicit nodes instead
//! of being expanded by the parser. JSON and TOML input have no anchors and
//! map directly onto plain nodes.

use std::collections::HashSet;
use std::path::Path;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, Scanner, TScalarStyle, Token, TokenType};

use super::node::{Mapping, MergeMode, MergeRef, Node, Scalar};
use crate::error::OverlayError;

/// Supported overlay input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DslFormat {
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
    /// JSON format (`.json`).
    Json,
    /// TOML format (`.toml`).
    Toml,
}

impl DslFormat {
    pub fn from_path(path: &Path) -> Result<Self, OverlayError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(DslFormat::Yaml),
            Some("json") => Ok(DslFormat::Json),
            Some("toml") => Ok(DslFormat::Toml),
            other => Err(OverlayError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Parse overlay content into one node tree per document.
pub fn parse_overlay(content: &str, format: DslFormat) -> Result<Vec<Node>, OverlayError> {
    let documents = match format {
        DslFormat::Yaml => parse_yaml(content)?,
        DslFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(content)
                .map_err(|e| OverlayError::DslParseError(e.to_string()))?;
            vec![Node::from(&value)]
        }
        DslFormat::Toml => {
            let value: toml::Value = toml::from_str(content)
                .map_err(|e| OverlayError::DslParseError(e.to_string()))?;
            vec![toml_value_to_node(value)]
        }
    };
    if documents.is_empty() {
        return Err(OverlayError::DslParseError("no document found".to_string()));
    }
    Ok(documents)
}

fn parse_yaml(content: &str) -> Result<Vec<Node>, OverlayError> {
    let mut builder = TreeBuilder::new(anchor_names(content));
    let mut parser = Parser::new_from_str(content);
    if let Err(err) = parser.load(&mut builder, true) {
        let message = err.to_string();
        if message.contains("unknown anchor") {
            if let Some(name) = first_undefined_alias(content) {
                return Err(OverlayError::UndefinedAnchor(name));
            }
        }
        return Err(OverlayError::DslParseError(message));
    }
    builder.finish()
}

/// Convert a [`toml::Value`] into a [`Node`].
///
/// TOML has no null type; datetimes are stringified.
fn toml_value_to_node(value: toml::Value) -> Node {
    match value {
        toml::Value::String(s) => Node::string(s),
        toml::Value::Integer(i) => Node::int(i128::from(i)),
        toml::Value::Float(f) => Node::Scalar(Scalar::Float(f)),
        toml::Value::Boolean(b) => Node::bool(b),
        toml::Value::Array(items) => Node::Sequence(items.into_iter().map(toml_value_to_node).collect()),
        toml::Value::Table(table) => Node::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_value_to_node(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Node::string(dt.to_string()),
    }
}

enum Frame {
    Sequence {
        anchor: Option<String>,
        items: Vec<Node>,
    },
    Mapping {
        anchor: Option<String>,
        entries: Mapping,
        pending_key: Option<String>,
    },
}

/// Event receiver assembling nodes bottom-up.
///
/// The event stream only carries numeric anchor ids. The parser hands out
/// ids from 1 upwards, one per `&name` token, so id `n` names the n-th anchor
/// token of the scanner.
struct TreeBuilder {
    stack: Vec<Frame>,
    documents: Vec<Node>,
    anchors: Vec<String>,
    error: Option<String>,
}

impl TreeBuilder {
    fn new(anchors: Vec<String>) -> Self {
        Self {
            stack: Vec::new(),
            documents: Vec::new(),
            anchors,
            error: None,
        }
    }

    fn finish(self) -> Result<Vec<Node>, OverlayError> {
        if let Some(err) = self.error {
            return Err(OverlayError::DslParseError(err));
        }
        Ok(self.documents)
    }

    fn anchor_name(&self, id: usize) -> String {
        id.checked_sub(1)
            .and_then(|index| self.anchors.get(index))
            .cloned()
            .unwrap_or_else(|| format!("anchor{}", id))
    }

    fn define_anchor(&self, id: usize) -> Option<String> {
        (id != 0).then(|| self.anchor_name(id))
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    fn push_value(&mut self, node: Node) {
        let Some(frame) = self.stack.last_mut() else {
            self.documents.push(node);
            return;
        };
        match frame {
            Frame::Sequence { items, .. } => items.push(node),
            Frame::Mapping {
                entries,
                pending_key,
                ..
            } => match pending_key.take() {
                None => match node {
                    Node::Scalar(scalar) => *pending_key = Some(scalar.render()),
                    other => {
                        let kind = other.kind();
                        self.fail(format!("unsupported {} used as a mapping key", kind));
                    }
                },
                Some(key) => {
                    if let Err(message) = insert_entry(entries, key, node) {
                        self.fail(message);
                    }
                }
            },
        }
    }
}

fn insert_entry(entries: &mut Mapping, key: String, value: Node) -> Result<(), String> {
    if let Some(mode) = MergeMode::from_key(&key) {
        let anchors = merge_targets(&value)
            .ok_or_else(|| format!("`{}` expects an alias or a list of aliases", key))?;
        match entries.get_mut(&key) {
            Some(Node::MergeRef(existing)) => existing.anchors.extend(anchors),
            _ => {
                entries.insert(key, Node::MergeRef(MergeRef { anchors, mode }));
            }
        }
        return Ok(());
    }
    if entries.contains_key(&key) {
        return Err(format!("duplicate mapping key `{}`", key));
    }
    entries.insert(key, value);
    Ok(())
}

fn merge_targets(value: &Node) -> Option<Vec<String>> {
    match value {
        Node::Alias(name) => Some(vec![name.clone()]),
        Node::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Node::Alias(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn wrap_anchor(anchor: Option<String>, node: Node) -> Node {
    match anchor {
        Some(name) => Node::Anchor(name, Box::new(node)),
        None => node,
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, _mark: Marker) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Scalar(value, style, anchor_id, _) => {
                let scalar = if matches!(style, TScalarStyle::Plain) {
                    Scalar::from_plain(&value)
                } else {
                    Scalar::Str(value)
                };
                let anchor = self.define_anchor(anchor_id);
                self.push_value(wrap_anchor(anchor, Node::Scalar(scalar)));
            }
            Event::Alias(id) => {
                let name = self.anchor_name(id);
                self.push_value(Node::Alias(name));
            }
            Event::SequenceStart(anchor_id, _) => {
                let anchor = self.define_anchor(anchor_id);
                self.stack.push(Frame::Sequence {
                    anchor,
                    items: Vec::new(),
                });
            }
            Event::MappingStart(anchor_id, _) => {
                let anchor = self.define_anchor(anchor_id);
                self.stack.push(Frame::Mapping {
                    anchor,
                    entries: Mapping::new(),
                    pending_key: None,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence { anchor, items }) => {
                    self.push_value(wrap_anchor(anchor, Node::Sequence(items)));
                }
                Some(Frame::Mapping {
                    anchor, entries, ..
                }) => {
                    self.push_value(wrap_anchor(anchor, Node::Mapping(entries)));
                }
                None => self.fail("unbalanced collection end".to_string()),
            },
            _ => {}
        }
    }
}

enum AnchorToken {
    Define(String),
    Use(String),
    Document,
}

/// Anchor definitions, aliases and document starts in source order, as the
/// YAML scanner tokenizes them. Stops at the first scan error.
fn anchor_tokens(src: &str) -> Vec<AnchorToken> {
    Scanner::new(src.chars())
        .filter_map(|Token(_, token)| match token {
            TokenType::Anchor(name) => Some(AnchorToken::Define(name)),
            TokenType::Alias(name) => Some(AnchorToken::Use(name)),
            TokenType::DocumentStart => Some(AnchorToken::Document),
            _ => None,
        })
        .collect()
}

fn anchor_names(src: &str) -> Vec<String> {
    anchor_tokens(src)
        .into_iter()
        .filter_map(|token| match token {
            AnchorToken::Define(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// First `*name` with no `&name` earlier in the same document.
fn first_undefined_alias(src: &str) -> Option<String> {
    let mut defined = HashSet::new();
    for token in anchor_tokens(src) {
        match token {
            AnchorToken::Define(name) => {
                defined.insert(name);
            }
            AnchorToken::Use(name) if !defined.contains(&name) => return Some(name),
            AnchorToken::Use(_) => {}
            AnchorToken::Document => defined.clear(),
        }
    }
    None
}
