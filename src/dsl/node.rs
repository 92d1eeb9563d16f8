//! Generic document tree.
//!
//! The parser produces [`Node`] trees that still contain anchors, aliases and
//! merge directives; the [resolver](crate::dsl::resolver) turns them into
//! plain trees made of scalars, sequences and mappings only.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Key of the overwrite-merge directive.
pub const MERGE_KEY: &str = "<<";
/// Key of the append-merge directive.
pub const APPEND_MERGE_KEY: &str = "<<+";

/// Ordered mapping with unique keys.
pub type Mapping = IndexMap<String, Node>;

/// Scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Resolve an unquoted scalar using the YAML core schema.
    pub fn from_plain(text: &str) -> Scalar {
        match text {
            "" | "~" | "null" | "Null" | "NULL" => return Scalar::Null,
            "true" | "True" | "TRUE" => return Scalar::Bool(true),
            "false" | "False" | "FALSE" => return Scalar::Bool(false),
            ".inf" | ".Inf" | ".INF" | "+.inf" => return Scalar::Float(f64::INFINITY),
            "-.inf" | "-.Inf" | "-.INF" => return Scalar::Float(f64::NEG_INFINITY),
            ".nan" | ".NaN" | ".NAN" => return Scalar::Float(f64::NAN),
            _ => {}
        }
        if let Some(value) = parse_int_literal(text) {
            return Scalar::Int(value);
        }
        if looks_like_float(text) {
            if let Ok(value) = text.parse::<f64>() {
                return Scalar::Float(value);
            }
        }
        Scalar::Str(text.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; numeric strings such as `"0x3"` are accepted too.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::Str(s) => parse_int_literal(s.trim()),
            _ => None,
        }
    }

    /// Boolean-like value: booleans, `0`/`1` and their string forms.
    pub fn as_bool_like(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(0) => Some(false),
            Scalar::Int(1) => Some(true),
            Scalar::Str(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Text used when a scalar appears as a mapping key or a name.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) => v.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Int(v) if *v >= 0 => write!(f, "{:#x}", v),
            other => f.write_str(&other.render()),
        }
    }
}

/// Parse decimal, `0x`, `0o` and `0b` integer literals with an optional sign.
pub fn parse_int_literal(text: &str) -> Option<i128> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let (radix, body) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = i128::from_str_radix(body, radix).ok()?;
    Some(if negative { -value } else { value })
}

fn looks_like_float(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

/// Which merge directive a [`MergeRef`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// `<<`: referenced content replaces what is already there.
    Overwrite,
    /// `<<+`: referenced content is appended to what is already there.
    Append,
}

impl MergeMode {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            MERGE_KEY => Some(MergeMode::Overwrite),
            APPEND_MERGE_KEY => Some(MergeMode::Append),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            MergeMode::Overwrite => MERGE_KEY,
            MergeMode::Append => APPEND_MERGE_KEY,
        }
    }
}

/// Merge directive: the anchors it pulls in, in written order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRef {
    pub anchors: Vec<String>,
    pub mode: MergeMode,
}

impl MergeRef {
    pub fn new(mode: MergeMode, anchors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            anchors: anchors.into_iter().map(Into::into).collect(),
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Mapping),
    /// `&name` attached to a subtree.
    Anchor(String, Box<Node>),
    /// `*name` used as a plain value.
    Alias(String),
    /// Value of a `<<` / `<<+` key.
    MergeRef(MergeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
    Anchor,
    Alias,
    MergeRef,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
            NodeKind::Anchor => "anchor",
            NodeKind::Alias => "alias",
            NodeKind::MergeRef => "merge reference",
        };
        f.write_str(name)
    }
}

impl Node {
    pub fn string(value: impl Into<String>) -> Node {
        Node::Scalar(Scalar::Str(value.into()))
    }

    pub fn int(value: i128) -> Node {
        Node::Scalar(Scalar::Int(value))
    }

    pub fn bool(value: bool) -> Node {
        Node::Scalar(Scalar::Bool(value))
    }

    pub fn null() -> Node {
        Node::Scalar(Scalar::Null)
    }

    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Node {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Scalar(_) => NodeKind::Scalar,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
            Node::Anchor(..) => NodeKind::Anchor,
            Node::Alias(_) => NodeKind::Alias,
            Node::MergeRef(_) => NodeKind::MergeRef,
        }
    }

    /// Mapping lookup. Anchors are transparent.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(key),
            Node::Anchor(_, inner) => inner.get(key),
            _ => None,
        }
    }

    /// Children of a sequence or mapping, each with its path segment.
    pub fn iter(&self) -> Children<'_> {
        let inner = match self {
            Node::Sequence(items) => ChildrenInner::Sequence(items.iter().enumerate()),
            Node::Mapping(map) => ChildrenInner::Mapping(map.iter()),
            Node::Anchor(_, inner) => return inner.iter(),
            _ => ChildrenInner::Empty,
        };
        Children { inner }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_int(&self) -> Option<i128> {
        self.as_scalar().and_then(Scalar::as_int)
    }

    /// True when no anchor, alias or merge directive is left in the tree.
    pub fn is_resolved(&self) -> bool {
        match self {
            Node::Scalar(_) => true,
            Node::Sequence(items) => items.iter().all(Node::is_resolved),
            Node::Mapping(map) => map.values().all(Node::is_resolved),
            Node::Anchor(..) | Node::Alias(_) | Node::MergeRef(_) => false,
        }
    }
}

/// Position of a child inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

pub struct Children<'a> {
    inner: ChildrenInner<'a>,
}

enum ChildrenInner<'a> {
    Empty,
    Sequence(std::iter::Enumerate<std::slice::Iter<'a, Node>>),
    Mapping(indexmap::map::Iter<'a, String, Node>),
}

impl<'a> Iterator for Children<'a> {
    type Item = (Segment<'a>, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ChildrenInner::Empty => None,
            ChildrenInner::Sequence(iter) => iter.next().map(|(i, n)| (Segment::Index(i), n)),
            ChildrenInner::Mapping(iter) => iter.next().map(|(k, n)| (Segment::Key(k), n)),
        }
    }
}

/// Location inside a document, rendered as `domains.a53.access[2].flags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<PathSegment>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PathSegment {
    Key(String),
    Index(usize),
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Key(key.to_string()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Index(index));
        next
    }

    pub fn child(&self, segment: Segment<'_>) -> Self {
        match segment {
            Segment::Key(k) => self.key(k),
            Segment::Index(i) => self.index(i),
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(v) => {
                if let Ok(v) = i64::try_from(*v) {
                    serializer.serialize_i64(v)
                } else if let Ok(v) = u64::try_from(*v) {
                    serializer.serialize_u64(v)
                } else {
                    serializer.collect_str(v)
                }
            }
            Scalar::Float(v) => serializer.serialize_f64(*v),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(s) => s.serialize(serializer),
            Node::Sequence(items) => serializer.collect_seq(items),
            Node::Mapping(map) => serializer.collect_map(map),
            Node::Anchor(_, inner) => inner.serialize(serializer),
            Node::Alias(name) => serializer.collect_str(&format_args!("*{}", name)),
            Node::MergeRef(merge) => {
                let mut map = serializer.serialize_map(Some(1))?;
                let refs: Vec<String> = merge.anchors.iter().map(|a| format!("*{}", a)).collect();
                map.serialize_entry(merge.mode.key(), &refs)?;
                map.end()
            }
        }
    }
}

impl From<&serde_json::Value> for Node {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::null(),
            Value::Bool(b) => Node::bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    Node::int(u as i128)
                } else {
                    Node::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => Node::string(s.clone()),
            Value::Array(items) => Node::Sequence(items.iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Mapping(map.iter().map(|(k, v)| (k.clone(), Node::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_scalar_resolution() {
        assert_eq!(Scalar::from_plain("~"), Scalar::Null);
        assert_eq!(Scalar::from_plain("true"), Scalar::Bool(true));
        assert_eq!(Scalar::from_plain("0x3ed40000"), Scalar::Int(0x3ed4_0000));
        assert_eq!(Scalar::from_plain("-12"), Scalar::Int(-12));
        assert_eq!(Scalar::from_plain("0o17"), Scalar::Int(15));
        assert_eq!(Scalar::from_plain("1.5"), Scalar::Float(1.5));
        assert_eq!(
            Scalar::from_plain("ipi@ff340000"),
            Scalar::Str("ipi@ff340000".into())
        );
        assert_eq!(Scalar::from_plain("inf"), Scalar::Str("inf".into()));
        assert_eq!(Scalar::from_plain("0xzz"), Scalar::Str("0xzz".into()));
    }

    #[test]
    fn test_int_and_bool_coercion() {
        assert_eq!(Scalar::Str("0x10".into()).as_int(), Some(16));
        assert_eq!(Scalar::Str("cpus".into()).as_int(), None);
        assert_eq!(Scalar::Int(1).as_bool_like(), Some(true));
        assert_eq!(Scalar::Int(2).as_bool_like(), None);
        assert_eq!(Scalar::Str("false".into()).as_bool_like(), Some(false));
    }

    #[test]
    fn test_get_and_iter() {
        let node = Node::mapping([
            ("a", Node::int(1)),
            ("b", Node::Sequence(vec![Node::string("x"), Node::string("y")])),
        ]);
        assert_eq!(node.kind(), NodeKind::Mapping);
        assert_eq!(node.get("a"), Some(&Node::int(1)));
        assert!(node.get("missing").is_none());

        let keys: Vec<_> = node.iter().map(|(seg, _)| seg).collect();
        assert_eq!(keys, vec![Segment::Key("a"), Segment::Key("b")]);

        let seq = node.get("b").unwrap();
        let idx: Vec<_> = seq.iter().map(|(seg, _)| seg).collect();
        assert_eq!(idx, vec![Segment::Index(0), Segment::Index(1)]);
        assert_eq!(Node::int(3).iter().count(), 0);
    }

    #[test]
    fn test_anchor_is_transparent() {
        let inner = Node::mapping([("dev", Node::string("ocm"))]);
        let anchored = Node::Anchor("srams".into(), Box::new(inner));
        assert_eq!(anchored.get("dev"), Some(&Node::string("ocm")));
        assert_eq!(anchored.iter().count(), 1);
        assert!(!anchored.is_resolved());
    }

    #[test]
    fn test_node_path_display() {
        let path = NodePath::root()
            .key("domains")
            .key("a53")
            .key("access")
            .index(2)
            .key("flags");
        assert_eq!(path.to_string(), "domains.a53.access[2].flags");
        assert_eq!(NodePath::root().to_string(), "<root>");
    }

    #[test]
    fn test_serialize_preserves_order() {
        let node = Node::mapping([
            ("z", Node::int(0x10)),
            ("a", Node::Sequence(vec![Node::bool(true), Node::null()])),
        ]);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"z":16,"a":[true,null]}"#);
    }

    #[test]
    fn test_merge_mode_keys() {
        assert_eq!(MergeMode::from_key("<<"), Some(MergeMode::Overwrite));
        assert_eq!(MergeMode::from_key("<<+"), Some(MergeMode::Append));
        assert_eq!(MergeMode::from_key("dev"), None);
        assert_eq!(MergeMode::Append.key(), "<<+");
    }
}
