//! Concrete syntax tree for the subset of YAML found in GitHub Actions files.
//!
//! Every node parsed from source remembers its byte span, so rendering an
//! unedited tree reproduces the input exactly. Edits mutate nodes in the
//! arena: a scalar can be given a replacement token, and a mapping can gain
//! appended entries. Appended entries are *synthetic* (they have no span) and
//! are the only text the renderer has to produce itself.

mod parser;
mod render;

use crate::error::{DpcError, Result};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStyle {
    Block,
    Flow,
}

#[derive(Debug, Clone)]
pub struct Node {
    /// `None` for nodes created by an edit.
    pub span: Option<Span>,
    pub anchor: Option<String>,
    pub tag: Option<String>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An empty value, e.g. `with:` followed by nothing.
    Null,
    Scalar(Scalar),
    Alias(String),
    Mapping(Mapping),
    Sequence(Sequence),
}

#[derive(Debug, Clone)]
pub struct Scalar {
    pub style: ScalarStyle,
    /// Decoded value, quotes and escapes resolved.
    pub value: String,
    /// Token written in place of the source span when rendering.
    replacement: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Mapping {
    pub style: CollectionStyle,
    /// Column of the keys; meaningful for block mappings only.
    pub column: usize,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub key: NodeId,
    pub value: NodeId,
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub style: CollectionStyle,
    pub items: Vec<NodeId>,
}

/// Type a scalar resolves to under the YAML 1.2 core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Null,
    Bool(bool),
    Int,
    Float,
    Str,
}

static INT_RE: OnceLock<Regex> = OnceLock::new();
static FLOAT_RE: OnceLock<Regex> = OnceLock::new();

fn int_re() -> &'static Regex {
    INT_RE.get_or_init(|| Regex::new(r"^([-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").unwrap())
}

fn float_re() -> &'static Regex {
    FLOAT_RE.get_or_init(|| {
        Regex::new(
            r"^([-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(inf|Inf|INF)|\.(nan|NaN|NAN))$",
        )
        .unwrap()
    })
}

impl Scalar {
    pub fn resolve(&self, tag: Option<&str>) -> Resolved {
        match tag {
            Some("!!str") => return Resolved::Str,
            Some("!!bool") => return resolve_bool(&self.value).unwrap_or(Resolved::Str),
            Some("!!null") => return Resolved::Null,
            Some("!!int") => return Resolved::Int,
            Some("!!float") => return Resolved::Float,
            _ => {}
        }
        if self.style != ScalarStyle::Plain {
            return Resolved::Str;
        }
        let v = self.value.as_str();
        if matches!(v, "" | "~" | "null" | "Null" | "NULL") {
            return Resolved::Null;
        }
        if let Some(b) = resolve_bool(v) {
            return b;
        }
        if int_re().is_match(v) {
            return Resolved::Int;
        }
        if float_re().is_match(v) {
            return Resolved::Float;
        }
        Resolved::Str
    }

    /// The text this scalar renders as, if it was replaced or synthesized.
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }
}

fn resolve_bool(v: &str) -> Option<Resolved> {
    match v {
        "true" | "True" | "TRUE" => Some(Resolved::Bool(true)),
        "false" | "False" | "FALSE" => Some(Resolved::Bool(false)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Tree {
    src: String,
    nodes: Vec<Node>,
    /// One slot per document; `None` for documents with no content.
    documents: Vec<Option<NodeId>>,
    indent_unit: usize,
    newline: &'static str,
}

impl Tree {
    pub fn parse(src: &str) -> Result<Tree> {
        let parsed = parser::Parser::new(src).parse()?;
        Ok(Tree {
            src: src.to_string(),
            nodes: parsed.nodes,
            documents: parsed.documents,
            indent_unit: parsed.indent_unit.unwrap_or(2),
            newline: if src.contains("\r\n") { "\r\n" } else { "\n" },
        })
    }

    /// Root nodes of the non-empty documents, in source order.
    pub fn documents(&self) -> Vec<NodeId> {
        self.documents.iter().flatten().copied().collect()
    }

    /// Spaces per nesting level, taken from the first nested block mapping.
    pub fn indent_unit(&self) -> usize {
        self.indent_unit
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn is_synthetic(&self, id: NodeId) -> bool {
        self.node(id).span.is_none()
    }

    pub fn mapping(&self, id: NodeId) -> Option<&Mapping> {
        match &self.node(id).kind {
            NodeKind::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn sequence(&self, id: NodeId) -> Option<&Sequence> {
        match &self.node(id).kind {
            NodeKind::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn scalar(&self, id: NodeId) -> Option<&Scalar> {
        match &self.node(id).kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Null)
    }

    /// Resolved type of a scalar node, `None` for anything else.
    pub fn resolve(&self, id: NodeId) -> Option<Resolved> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Scalar(s) => Some(s.resolve(node.tag.as_deref())),
            _ => None,
        }
    }

    /// Key text of a mapping entry when the key is a scalar.
    pub fn key_str(&self, entry: &Entry) -> Option<&str> {
        self.scalar(entry.key).map(|s| s.value.as_str())
    }

    /// Value of the first entry of `mapping` whose key equals `key`.
    pub fn get(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        self.mapping(mapping)?
            .entries
            .iter()
            .find(|e| self.key_str(e) == Some(key))
            .map(|e| e.value)
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Create a detached scalar rendered as `token`.
    pub fn new_scalar(&mut self, style: ScalarStyle, value: &str, token: &str) -> NodeId {
        self.push(Node {
            span: None,
            anchor: None,
            tag: None,
            kind: NodeKind::Scalar(Scalar {
                style,
                value: value.to_string(),
                replacement: Some(token.to_string()),
            }),
        })
    }

    /// Create a detached, empty mapping.
    pub fn new_mapping(&mut self, style: CollectionStyle) -> NodeId {
        self.push(Node {
            span: None,
            anchor: None,
            tag: None,
            kind: NodeKind::Mapping(Mapping {
                style,
                column: 0,
                entries: Vec::new(),
            }),
        })
    }

    /// Append `key: value` to `mapping`. The key is a plain scalar.
    pub fn push_entry(&mut self, mapping: NodeId, key: &str, value: NodeId) -> Result<()> {
        if self.mapping(mapping).is_none() {
            return Err(DpcError::structure(format!(
                "cannot add '{key}' to a node that is not a mapping"
            )));
        }
        let key = self.new_scalar(ScalarStyle::Plain, key, key);
        if let NodeKind::Mapping(m) = &mut self.nodes[mapping.0].kind {
            m.entries.push(Entry { key, value });
        }
        Ok(())
    }

    /// Replace a scalar's value, rendering `token` where the source token was.
    pub fn set_scalar(&mut self, id: NodeId, value: &str, token: &str) -> Result<()> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Scalar(s) => {
                s.value = value.to_string();
                s.replacement = Some(token.to_string());
                Ok(())
            }
            _ => Err(DpcError::structure("cannot replace a node that is not a scalar")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(v: &str) -> Scalar {
        Scalar {
            style: ScalarStyle::Plain,
            value: v.to_string(),
            replacement: None,
        }
    }

    #[test]
    fn resolves_core_schema_plain_scalars() {
        assert_eq!(plain("true").resolve(None), Resolved::Bool(true));
        assert_eq!(plain("FALSE").resolve(None), Resolved::Bool(false));
        assert_eq!(plain("~").resolve(None), Resolved::Null);
        assert_eq!(plain("1").resolve(None), Resolved::Int);
        assert_eq!(plain("0x1F").resolve(None), Resolved::Int);
        assert_eq!(plain("1.5").resolve(None), Resolved::Float);
        assert_eq!(plain(".inf").resolve(None), Resolved::Float);
        assert_eq!(plain("yes").resolve(None), Resolved::Str);
        assert_eq!(plain("actions/checkout@v4").resolve(None), Resolved::Str);
    }

    #[test]
    fn quoted_and_tagged_scalars() {
        let quoted = Scalar {
            style: ScalarStyle::DoubleQuoted,
            value: "true".to_string(),
            replacement: None,
        };
        assert_eq!(quoted.resolve(None), Resolved::Str);
        assert_eq!(plain("true").resolve(Some("!!str")), Resolved::Str);
        assert_eq!(plain("true").resolve(Some("!!bool")), Resolved::Bool(true));
    }

    #[test]
    fn get_finds_first_matching_key() {
        let tree = Tree::parse("a: 1\nb: 2\na: 3\n").unwrap();
        let root = tree.documents()[0];
        let a = tree.get(root, "a").unwrap();
        assert_eq!(tree.scalar(a).unwrap().value, "1");
        assert!(tree.get(root, "c").is_none());
    }

    #[test]
    fn indent_unit_follows_document() {
        let tree = Tree::parse("jobs:\n    build:\n        runs-on: x\n").unwrap();
        assert_eq!(tree.indent_unit(), 4);
        let tree = Tree::parse("name: x\n").unwrap();
        assert_eq!(tree.indent_unit(), 2);
    }

    #[test]
    fn edits_require_matching_node_kind() {
        let mut tree = Tree::parse("a: 1\n").unwrap();
        let root = tree.documents()[0];
        let a = tree.get(root, "a").unwrap();
        let v = tree.new_scalar(ScalarStyle::Plain, "x", "x");
        assert!(tree.push_entry(a, "k", v).is_err());
        assert!(tree.set_scalar(root, "x", "x").is_err());
    }
}
