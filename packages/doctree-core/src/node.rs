//! Detached, owned node values.
//!
//! These are the plain-data shapes that travel inside operations and snapshots. Nodes that live
//! in a document are stored in the [`crate::Tree`] arena instead; [`crate::Tree::export`] turns
//! them back into these values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ids::NodeId;

/// Attribute map of an element or a text node. Ordered so snapshots compare and serialize
/// deterministically.
pub type Attributes = BTreeMap<String, Value>;

/// Number of offset units occupied by a string (Unicode scalar values).
pub fn text_len(data: &str) -> usize {
    data.chars().count()
}

/// Byte index of the `offset`-th scalar value in `data` (or `data.len()` at the end).
pub(crate) fn byte_index(data: &str, offset: usize) -> usize {
    data.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(data.len())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "NodeList::is_empty")]
    pub children: NodeList,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            children: NodeList::default(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        for child in children {
            self.children.push(child.into());
        }
        self
    }

    pub fn max_offset(&self) -> usize {
        self.children.max_offset()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub data: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        text_len(&self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A detached document node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn element(name: impl Into<String>) -> Self {
        Node::Element(Element::new(name))
    }

    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(Text::new(data))
    }

    /// 1 for an element, the character count for a text node.
    pub fn offset_size(&self) -> usize {
        match self {
            Node::Element(_) => 1,
            Node::Text(text) => text.len(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Node::Text(text) if text.is_empty() => {
                Err(Error::InvalidOperation("text nodes must not be empty".into()))
            }
            Node::Text(_) => Ok(()),
            Node::Element(element) => element.children.validate(),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl From<&str> for Node {
    fn from(data: &str) -> Self {
        Node::text(data)
    }
}

/// Ordered sequence of detached nodes addressed either by index (child ordinal) or by offset
/// (cumulative offset units).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeList(Vec<Node>);

impl NodeList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, node: Node) {
        self.0.push(node);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.0.iter()
    }

    /// Sum of the children's offset sizes.
    pub fn max_offset(&self) -> usize {
        self.0.iter().map(Node::offset_size).sum()
    }

    /// Index of the node that contains `offset`; `len()` when `offset == max_offset()`.
    pub fn offset_to_index(&self, offset: usize) -> Result<usize> {
        let mut acc = 0;
        for (index, node) in self.0.iter().enumerate() {
            let size = node.offset_size();
            if offset < acc + size {
                return Ok(index);
            }
            acc += size;
        }
        if offset == acc {
            Ok(self.0.len())
        } else {
            Err(Error::InvalidPosition(format!(
                "offset {offset} is past the end of a node list of size {acc}"
            )))
        }
    }

    /// Offset at which the node at `index` starts; `max_offset()` for `index >= len()`.
    pub fn index_to_offset(&self, index: usize) -> usize {
        self.0.iter().take(index).map(Node::offset_size).sum()
    }

    pub fn into_vec(self) -> Vec<Node> {
        self.0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.0.iter().try_for_each(Node::validate)
    }
}

impl From<Vec<Node>> for NodeList {
    fn from(nodes: Vec<Node>) -> Self {
        Self(nodes)
    }
}

impl From<Node> for NodeList {
    fn from(node: Node) -> Self {
        Self(vec![node])
    }
}

impl From<Element> for NodeList {
    fn from(element: Element) -> Self {
        Self(vec![Node::Element(element)])
    }
}

impl From<Text> for NodeList {
    fn from(text: Text) -> Self {
        Self(vec![Node::Text(text)])
    }
}

impl FromIterator<Node> for NodeList {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for NodeList {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Borrowed view of part of a text node living in a [`crate::Tree`].
#[derive(Clone, Copy, Debug)]
pub struct TextProxy<'a> {
    node: NodeId,
    data: &'a str,
    offset_in_text: usize,
    attributes: &'a Attributes,
    whole_len: usize,
}

impl<'a> TextProxy<'a> {
    pub(crate) fn new(
        node: NodeId,
        whole: &'a str,
        attributes: &'a Attributes,
        offset_in_text: usize,
        len: usize,
    ) -> Self {
        let start = byte_index(whole, offset_in_text);
        let end = byte_index(whole, offset_in_text + len);
        Self {
            node,
            data: &whole[start..end],
            offset_in_text,
            attributes,
            whole_len: text_len(whole),
        }
    }

    /// The text node this proxy looks into.
    pub fn text_node(&self) -> NodeId {
        self.node
    }

    pub fn data(&self) -> &'a str {
        self.data
    }

    pub fn offset_in_text(&self) -> usize {
        self.offset_in_text
    }

    pub fn offset_size(&self) -> usize {
        text_len(self.data)
    }

    /// Whether the proxy covers only part of its text node.
    pub fn is_partial(&self) -> bool {
        self.offset_size() != self.whole_len
    }

    pub fn attributes(&self) -> &'a Attributes {
        self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&'a Value> {
        self.attributes.get(key)
    }
}
