//! An owned syntax tree that can be read from JSON.
//!
//! Producers that live in another process hand their tree over in this
//! shape; tests build it directly.
//!
//! ```json
//! {
//!   "source": "let x = \"hi\"",
//!   "root": {
//!     "kind": 1, "pos": 0, "end": 12,
//!     "children": [
//!       { "node": { "kind": 80, "pos": 3, "end": 5, "text": "x" } },
//!       { "list": { "pos": 7, "end": 12, "items": [
//!         { "kind": 11, "pos": 7, "end": 12, "text": "hi", "closing_delimiter": 1 }
//!       ] } }
//!     ]
//!   }
//! }
//! ```
//!
//! A node with both `extended` and `text` uses its extended entry.

use serde::{Deserialize, Serialize};

use crate::error::EncodeResult;
use crate::kind::SyntaxKind;
use crate::node::{Child, ExtendedField, NodeFlags, NodePayload, SourceNode, TextRange};

/// A source text together with its parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    /// The full source text.
    pub source: String,
    /// The root node, normally spanning the whole source.
    pub root: TreeNode,
}

impl TreeDocument {
    /// Create a document.
    pub fn new(source: impl Into<String>, root: TreeNode) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One field of an extended data entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeField {
    /// Text stored through the string table.
    Text(String),
    /// A plain value.
    Word(u32),
}

/// A child slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeChild {
    /// A single node.
    Node(TreeNode),
    /// A list of nodes filling one slot.
    List(TreeList),
}

impl TreeChild {
    /// Create a list slot.
    pub fn list(range: TextRange, items: Vec<TreeNode>) -> Self {
        TreeChild::List(TreeList {
            pos: range.pos,
            end: range.end,
            items,
        })
    }
}

/// A list of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeList {
    /// Start of the list.
    pub pos: u32,
    /// End of the list.
    pub end: u32,
    /// The list items.
    #[serde(default)]
    pub items: Vec<TreeNode>,
}

/// A syntax node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Syntax kind.
    pub kind: SyntaxKind,
    /// Start of the node.
    pub pos: u32,
    /// End of the node.
    pub end: u32,
    /// Literal text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extended data entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<Vec<TreeField>>,
    /// Kind-specific flag bits (six at most).
    #[serde(default, skip_serializing_if = "is_zero_u8")]
    pub flags: u8,
    /// Width of a closing delimiter after the text.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub closing_delimiter: u32,
    /// Child slots in visitor order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeChild>,
}

fn is_zero_u8(v: &u8) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

impl TreeNode {
    /// Create a node without text or children.
    pub fn new(kind: SyntaxKind, range: TextRange) -> Self {
        Self {
            kind,
            pos: range.pos,
            end: range.end,
            text: None,
            extended: None,
            flags: 0,
            closing_delimiter: 0,
            children: Vec::new(),
        }
    }

    /// Set the node's literal text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the node's extended entry.
    pub fn with_extended(mut self, fields: Vec<TreeField>) -> Self {
        self.extended = Some(fields);
        self
    }

    /// Set the node's flags.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Set the closing delimiter width.
    pub fn with_closing_delimiter(mut self, width: u32) -> Self {
        self.closing_delimiter = width;
        self
    }

    /// Append a child slot.
    pub fn with_child(mut self, child: TreeChild) -> Self {
        self.children.push(child);
        self
    }
}

impl SourceNode for TreeNode {
    fn kind(&self) -> SyntaxKind {
        self.kind
    }

    fn range(&self) -> TextRange {
        TextRange::new(self.pos, self.end)
    }

    fn payload(&self) -> NodePayload<'_> {
        if let Some(fields) = &self.extended {
            let fields = fields
                .iter()
                .map(|field| match field {
                    TreeField::Text(text) => ExtendedField::Text(text),
                    TreeField::Word(word) => ExtendedField::Word(*word),
                })
                .collect();
            return NodePayload::Extended(fields);
        }
        match &self.text {
            Some(text) => NodePayload::Text(text),
            None => NodePayload::Children,
        }
    }

    fn flags(&self) -> EncodeResult<NodeFlags> {
        NodeFlags::new(self.flags)
    }

    fn closing_delimiter(&self) -> u32 {
        self.closing_delimiter
    }

    fn children(&self) -> Vec<Child<'_, Self>> {
        self.children
            .iter()
            .map(|child| match child {
                TreeChild::Node(node) => Child::Node(node),
                TreeChild::List(list) => Child::List {
                    range: TextRange::new(list.pos, list.end),
                    items: list.items.iter().collect(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let json = r#"{
            "source": "let x = \"hi\"",
            "root": {
                "kind": 1, "pos": 0, "end": 12,
                "children": [
                    { "node": { "kind": 80, "pos": 3, "end": 5, "text": "x" } },
                    { "list": { "pos": 7, "end": 12, "items": [
                        { "kind": 11, "pos": 7, "end": 12, "text": "hi", "closing_delimiter": 1 }
                    ] } }
                ]
            }
        }"#;
        let doc = TreeDocument::from_json(json).unwrap();
        assert_eq!(doc.source.len(), 12);
        assert_eq!(doc.root.children.len(), 2);

        let children = doc.root.children();
        assert!(matches!(
            children[0],
            Child::Node(node) if node.payload() == NodePayload::Text("x")
        ));
        match &children[1] {
            Child::List { range, items } => {
                assert_eq!(*range, TextRange::new(7, 12));
                assert_eq!(items[0].closing_delimiter(), 1);
            }
            Child::Node(_) => panic!("expected a list"),
        }
    }

    #[test]
    fn test_reserved_kind_is_rejected() {
        let json = r#"{ "kind": 4294967295, "pos": 0, "end": 0 }"#;
        assert!(serde_json::from_str::<TreeNode>(json).is_err());
    }

    #[test]
    fn test_extended_wins_over_text() {
        let kind = SyntaxKind::new(16).unwrap();
        let node = TreeNode::new(kind, TextRange::new(0, 3))
            .with_text("ab")
            .with_extended(vec![TreeField::Text("ab".into()), TreeField::Word(2)]);
        assert_eq!(
            node.payload(),
            NodePayload::Extended(vec![ExtendedField::Text("ab"), ExtendedField::Word(2)])
        );
    }

    #[test]
    fn test_serialize_skips_defaults() {
        let node = TreeNode::new(SyntaxKind::new(3).unwrap(), TextRange::new(1, 2));
        assert_eq!(serde_json::to_string(&node).unwrap(), r#"{"kind":3,"pos":1,"end":2}"#);
    }
}
