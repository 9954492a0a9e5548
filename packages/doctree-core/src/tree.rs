use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::node::{byte_index, text_len, Attributes, Element, Node, NodeList, Text, TextProxy};
use crate::position::Position;

#[derive(Clone, Debug)]
struct NodeState {
    parent: Option<NodeId>,
    attributes: Attributes,
    content: Content,
}

#[derive(Clone, Debug)]
enum Content {
    Element { name: String, children: Vec<NodeId> },
    Text { data: String, len: usize },
}

#[derive(Clone, Copy, Debug)]
struct RootEntry {
    node: NodeId,
    attached: bool,
}

/// One step of a walk over a flat range: a whole element or (part of) a text node.
#[derive(Clone, Copy, Debug)]
pub enum Item<'a> {
    Element {
        node: NodeId,
        attributes: &'a Attributes,
    },
    Text(TextProxy<'a>),
}

impl<'a> Item<'a> {
    pub fn attributes(&self) -> &'a Attributes {
        match self {
            Item::Element { attributes, .. } => attributes,
            Item::Text(proxy) => proxy.attributes(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&'a Value> {
        self.attributes().get(key)
    }

    pub fn offset_size(&self) -> usize {
        match self {
            Item::Element { .. } => 1,
            Item::Text(proxy) => proxy.offset_size(),
        }
    }
}

/// Arena holding the content of every root of a document.
///
/// Each node keeps a non-owning `parent` handle; ownership is expressed only by the parent's
/// ordered child list. Structural mutation is crate-private so that every change goes through
/// operation execution.
#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, NodeState>,
    roots: BTreeMap<String, RootEntry>,
    next_id: u64,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attached root element by name.
    pub fn root(&self, name: &str) -> Result<NodeId> {
        match self.roots.get(name) {
            Some(entry) if entry.attached => Ok(entry.node),
            _ => Err(Error::RootNotFound(name.to_string())),
        }
    }

    pub fn has_root(&self, name: &str) -> bool {
        self.root(name).is_ok()
    }

    /// Names of the attached roots, in name order.
    pub fn root_names(&self) -> Vec<&str> {
        self.roots
            .iter()
            .filter(|(_, entry)| entry.attached)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether a root with this name exists, attached or not.
    pub(crate) fn root_attached(&self, name: &str) -> Option<bool> {
        self.roots.get(name).map(|entry| entry.attached)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// Children of an element; empty for text nodes and unknown handles.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match self.nodes.get(&node).map(|n| &n.content) {
            Some(Content::Element { children, .. }) => children,
            _ => &[],
        }
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(&node).map(|n| &n.content),
            Some(Content::Text { .. })
        )
    }

    /// Element name; `None` for text nodes.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(&node).map(|n| &n.content) {
            Some(Content::Element { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Text payload; `None` for elements.
    pub fn data(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(&node).map(|n| &n.content) {
            Some(Content::Text { data, .. }) => Some(data),
            _ => None,
        }
    }

    pub fn attributes(&self, node: NodeId) -> Option<&Attributes> {
        self.nodes.get(&node).map(|n| &n.attributes)
    }

    pub fn attribute(&self, node: NodeId, key: &str) -> Option<&Value> {
        self.attributes(node).and_then(|attrs| attrs.get(key))
    }

    pub fn offset_size(&self, node: NodeId) -> usize {
        match self.nodes.get(&node).map(|n| &n.content) {
            Some(Content::Element { .. }) => 1,
            Some(Content::Text { len, .. }) => *len,
            None => 0,
        }
    }

    pub fn max_offset(&self, node: NodeId) -> usize {
        self.children(node)
            .iter()
            .map(|child| self.offset_size(*child))
            .sum()
    }

    /// Index of `node` in its parent's child list.
    pub fn index_in_parent(&self, node: NodeId) -> Result<usize> {
        let parent = self
            .parent(node)
            .ok_or_else(|| Error::InvalidPosition(format!("node {node:?} has no parent")))?;
        self.children(parent)
            .iter()
            .position(|child| *child == node)
            .ok_or(Error::NodeNotFoundInParent(node))
    }

    /// Offset at which `node` starts inside its parent.
    pub fn start_offset(&self, node: NodeId) -> Result<usize> {
        let index = self.index_in_parent(node)?;
        let parent = self.parent(node).ok_or(Error::NodeNotFoundInParent(node))?;
        Ok(self.index_to_offset(parent, index))
    }

    /// Root name and offset path of `node`.
    pub fn path_of(&self, node: NodeId) -> Result<(String, Vec<usize>)> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(self.start_offset(current)?);
            current = parent;
        }
        let root = self
            .roots
            .iter()
            .find(|(_, entry)| entry.node == current && entry.attached)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| {
                Error::InvalidPosition(format!("node {node:?} is not attached to a root"))
            })?;
        path.reverse();
        Ok((root, path))
    }

    /// Index of the child containing `offset`; the child count when `offset == max_offset`.
    pub fn offset_to_index(&self, parent: NodeId, offset: usize) -> Result<usize> {
        self.locate(parent, offset).map(|(index, _)| index)
    }

    pub fn index_to_offset(&self, parent: NodeId, index: usize) -> usize {
        self.children(parent)
            .iter()
            .take(index)
            .map(|child| self.offset_size(*child))
            .sum()
    }

    /// Element starting exactly at `offset` inside `parent`.
    pub(crate) fn child_at_offset(&self, parent: NodeId, offset: usize) -> Result<NodeId> {
        let (index, inner) = self.locate(parent, offset)?;
        match self.children(parent).get(index) {
            Some(child) if inner == 0 && !self.is_text(*child) => Ok(*child),
            _ => Err(Error::InvalidPosition(format!(
                "no element starts at offset {offset}"
            ))),
        }
    }

    /// Parent element of `position`, validating every step of its path.
    pub fn resolve(&self, position: &Position) -> Result<NodeId> {
        let mut current = self.root(position.root())?;
        for &offset in position.parent_path() {
            current = self.child_at_offset(current, offset)?;
        }
        let max = self.max_offset(current);
        if position.offset() > max {
            return Err(Error::InvalidPosition(format!(
                "offset {} is past the end of its parent ({max})",
                position.offset()
            )));
        }
        Ok(current)
    }

    pub fn node_after(&self, position: &Position) -> Result<Option<NodeId>> {
        let parent = self.resolve(position)?;
        let (index, inner) = self.locate(parent, position.offset())?;
        if inner != 0 {
            return Ok(None);
        }
        Ok(self.children(parent).get(index).copied())
    }

    pub fn node_before(&self, position: &Position) -> Result<Option<NodeId>> {
        let parent = self.resolve(position)?;
        let (index, inner) = self.locate(parent, position.offset())?;
        if inner != 0 || index == 0 {
            return Ok(None);
        }
        Ok(self.children(parent).get(index - 1).copied())
    }

    /// Text node that `position` lies strictly inside of.
    pub fn text_node_at(&self, position: &Position) -> Result<Option<NodeId>> {
        let parent = self.resolve(position)?;
        let (index, inner) = self.locate(parent, position.offset())?;
        if inner == 0 {
            return Ok(None);
        }
        Ok(self.children(parent).get(index).copied())
    }

    /// Items between two offsets of `parent`; text nodes cut by the bounds become partial proxies.
    pub fn items(&self, parent: NodeId, start: usize, end: usize) -> Result<Vec<Item<'_>>> {
        if end > self.max_offset(parent) {
            return Err(Error::InvalidPosition(format!(
                "offset {end} is past the end of its parent"
            )));
        }
        let mut items = Vec::new();
        let mut acc = 0;
        for &child in self.children_of(parent)? {
            let state = self.state(child)?;
            let size = self.offset_size(child);
            let (node_start, node_end) = (acc, acc + size);
            acc = node_end;
            if node_end <= start {
                continue;
            }
            if node_start >= end {
                break;
            }
            match &state.content {
                Content::Element { .. } => items.push(Item::Element {
                    node: child,
                    attributes: &state.attributes,
                }),
                Content::Text { data, .. } => {
                    let from = start.max(node_start) - node_start;
                    let to = end.min(node_end) - node_start;
                    items.push(Item::Text(TextProxy::new(
                        child,
                        data,
                        &state.attributes,
                        from,
                        to - from,
                    )));
                }
            }
        }
        Ok(items)
    }

    /// Detached copy of a node and its subtree.
    pub fn export(&self, node: NodeId) -> Option<Node> {
        let state = self.nodes.get(&node)?;
        match &state.content {
            Content::Text { data, .. } => Some(Node::Text(Text {
                data: data.clone(),
                attributes: state.attributes.clone(),
            })),
            Content::Element { name, children } => Some(Node::Element(Element {
                name: name.clone(),
                attributes: state.attributes.clone(),
                children: children.iter().filter_map(|c| self.export(*c)).collect(),
            })),
        }
    }

    pub fn export_root(&self, name: &str) -> Result<Element> {
        let root = self.root(name)?;
        match self.export(root) {
            Some(Node::Element(element)) => Ok(element),
            _ => Err(Error::InconsistentState(format!("root {name} is not an element"))),
        }
    }

    /// Validate invariants: parent back-references agree with child lists, no duplicate
    /// children, no cycles, no empty text and no mergeable neighbouring text nodes.
    /// Intended for tests and debugging.
    pub fn validate_invariants(&self) -> Result<()> {
        for (id, state) in &self.nodes {
            if let Content::Element { children, .. } = &state.content {
                let mut seen = HashSet::new();
                let mut previous_text: Option<&Attributes> = None;
                for child in children {
                    if !seen.insert(child) {
                        return Err(Error::InconsistentState("duplicate child entry".into()));
                    }
                    let Some(child_state) = self.nodes.get(child) else {
                        return Err(Error::InconsistentState("child not present in nodes".into()));
                    };
                    if child_state.parent != Some(*id) {
                        return Err(Error::InconsistentState("child parent mismatch".into()));
                    }
                    match &child_state.content {
                        Content::Text { len, .. } => {
                            if *len == 0 {
                                return Err(Error::InconsistentState("empty text node".into()));
                            }
                            if previous_text == Some(&child_state.attributes) {
                                return Err(Error::InconsistentState(
                                    "adjacent text nodes with equal attributes".into(),
                                ));
                            }
                            previous_text = Some(&child_state.attributes);
                        }
                        Content::Element { .. } => previous_text = None,
                    }
                }
            }
            if let Some(parent) = state.parent {
                if !self.children(parent).contains(id) {
                    return Err(Error::NodeNotFoundInParent(*id));
                }
            }
        }

        for entry in self.roots.values() {
            if self.parent(entry.node).is_some() {
                return Err(Error::InconsistentState("root has a parent".into()));
            }
        }

        // acyclic check
        for node in self.nodes.keys() {
            if self.has_cycle_from(*node) {
                return Err(Error::InconsistentState("cycle detected".into()));
            }
        }
        Ok(())
    }

    fn has_cycle_from(&self, start: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start);
        while let Some(n) = current {
            if !visited.insert(n) {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn state(&self, node: NodeId) -> Result<&NodeState> {
        self.nodes
            .get(&node)
            .ok_or_else(|| Error::InconsistentState(format!("unknown node {node:?}")))
    }

    fn children_of(&self, parent: NodeId) -> Result<&Vec<NodeId>> {
        match &self.state(parent)?.content {
            Content::Element { children, .. } => Ok(children),
            Content::Text { .. } => Err(Error::InvalidPosition(
                "text nodes cannot contain positions".into(),
            )),
        }
    }

    /// Child index containing `offset` and the offset inside that child.
    fn locate(&self, parent: NodeId, offset: usize) -> Result<(usize, usize)> {
        let children = self.children_of(parent)?;
        let mut acc = 0;
        for (index, child) in children.iter().enumerate() {
            let size = self.offset_size(*child);
            if offset < acc + size {
                return Ok((index, offset - acc));
            }
            acc += size;
        }
        if offset == acc {
            Ok((children.len(), 0))
        } else {
            Err(Error::InvalidPosition(format!(
                "offset {offset} is past the end of its parent ({acc})"
            )))
        }
    }
}

/// Mutation primitives used by operation execution.
impl Tree {
    pub(crate) fn create_root(&mut self, name: &str, element_name: &str) -> Result<NodeId> {
        if self.roots.contains_key(name) {
            return Err(Error::InvalidOperation(format!("root {name} already exists")));
        }
        let node = self.alloc(NodeState {
            parent: None,
            attributes: Attributes::new(),
            content: Content::Element {
                name: element_name.to_string(),
                children: Vec::new(),
            },
        });
        self.roots.insert(
            name.to_string(),
            RootEntry {
                node,
                attached: true,
            },
        );
        Ok(node)
    }

    pub(crate) fn set_root_attached(&mut self, name: &str, attached: bool) -> Result<()> {
        let entry = self
            .roots
            .get_mut(name)
            .ok_or_else(|| Error::RootNotFound(name.to_string()))?;
        entry.attached = attached;
        Ok(())
    }

    pub(crate) fn insert_nodes(&mut self, parent: NodeId, offset: usize, nodes: &NodeList) -> Result<()> {
        nodes.validate()?;
        self.locate(parent, offset)?;
        let index = self.split_at(parent, offset)?;
        let ids = nodes
            .iter()
            .map(|node| self.build(node, parent))
            .collect::<Result<Vec<NodeId>>>()?;
        let count = ids.len();
        self.children_mut(parent)?.splice(index..index, ids);
        self.merge_span(parent, index, index + count)
    }

    /// Detaches `how_many` offset units at `offset` and returns them as detached values.
    pub(crate) fn remove_nodes(&mut self, parent: NodeId, offset: usize, how_many: usize) -> Result<NodeList> {
        let ids = self.detach_nodes(parent, offset, how_many)?;
        let mut removed = NodeList::new();
        for id in ids {
            if let Some(node) = self.export(id) {
                removed.push(node);
            }
            self.free(id);
        }
        Ok(removed)
    }

    /// Unlinks `how_many` offset units at `offset` from `parent`, keeping the nodes in the arena.
    pub(crate) fn detach_nodes(&mut self, parent: NodeId, offset: usize, how_many: usize) -> Result<Vec<NodeId>> {
        let end = offset
            .checked_add(how_many)
            .filter(|end| *end <= self.max_offset(parent))
            .ok_or_else(|| {
                Error::InvalidPosition(format!(
                    "range of {how_many} at {offset} is past the end of its parent"
                ))
            })?;
        let start_index = self.split_at(parent, offset)?;
        let end_index = self.split_at(parent, end)?;
        let ids: Vec<NodeId> = self.children_mut(parent)?.drain(start_index..end_index).collect();
        for id in &ids {
            if let Some(state) = self.nodes.get_mut(id) {
                state.parent = None;
            }
        }
        self.merge_at(parent, start_index)?;
        Ok(ids)
    }

    pub(crate) fn attach_nodes(&mut self, parent: NodeId, offset: usize, ids: &[NodeId]) -> Result<()> {
        self.locate(parent, offset)?;
        if ids.iter().any(|id| self.introduces_cycle(*id, parent)) {
            return Err(Error::InconsistentState(
                "attaching nodes would create a cycle".into(),
            ));
        }
        let index = self.split_at(parent, offset)?;
        for id in ids {
            let state = self
                .nodes
                .get_mut(id)
                .ok_or_else(|| Error::InconsistentState(format!("unknown node {id:?}")))?;
            state.parent = Some(parent);
        }
        self.children_mut(parent)?.splice(index..index, ids.iter().copied());
        self.merge_span(parent, index, index + ids.len())
    }

    /// Renames an element and returns its previous name.
    pub(crate) fn rename(&mut self, element: NodeId, new_name: &str) -> Result<String> {
        let state = self
            .nodes
            .get_mut(&element)
            .ok_or_else(|| Error::InconsistentState(format!("unknown node {element:?}")))?;
        match &mut state.content {
            Content::Element { name, .. } => Ok(std::mem::replace(name, new_name.to_string())),
            Content::Text { .. } => Err(Error::InvalidOperation("cannot rename a text node".into())),
        }
    }

    /// Sets (`Some`) or removes (`None`) an attribute on every item between two offsets.
    pub(crate) fn set_attribute_in(
        &mut self,
        parent: NodeId,
        start: usize,
        end: usize,
        key: &str,
        value: Option<&Value>,
    ) -> Result<()> {
        if end > self.max_offset(parent) {
            return Err(Error::InvalidPosition(format!(
                "offset {end} is past the end of its parent"
            )));
        }
        if start >= end {
            return Ok(());
        }
        let start_index = self.split_at(parent, start)?;
        let end_index = self.split_at(parent, end)?;
        let targets: Vec<NodeId> = self.children(parent)[start_index..end_index].to_vec();
        for node in targets {
            self.set_node_attribute(node, key, value)?;
        }
        self.merge_span(parent, start_index, end_index)
    }

    pub(crate) fn set_node_attribute(&mut self, node: NodeId, key: &str, value: Option<&Value>) -> Result<()> {
        let state = self
            .nodes
            .get_mut(&node)
            .ok_or_else(|| Error::InconsistentState(format!("unknown node {node:?}")))?;
        match value {
            Some(value) => {
                state.attributes.insert(key.to_string(), value.clone());
            }
            None => {
                state.attributes.remove(key);
            }
        }
        Ok(())
    }

    fn alloc(&mut self, state: NodeState) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, state);
        id
    }

    fn build(&mut self, node: &Node, parent: NodeId) -> Result<NodeId> {
        match node {
            Node::Text(text) => Ok(self.alloc(NodeState {
                parent: Some(parent),
                attributes: text.attributes.clone(),
                content: Content::Text {
                    data: text.data.clone(),
                    len: text.len(),
                },
            })),
            Node::Element(element) => {
                let id = self.alloc(NodeState {
                    parent: Some(parent),
                    attributes: element.attributes.clone(),
                    content: Content::Element {
                        name: element.name.clone(),
                        children: Vec::new(),
                    },
                });
                let children = element
                    .children
                    .iter()
                    .map(|child| self.build(child, id))
                    .collect::<Result<Vec<NodeId>>>()?;
                let count = children.len();
                if let Some(NodeState {
                    content: Content::Element { children: slot, .. },
                    ..
                }) = self.nodes.get_mut(&id)
                {
                    *slot = children;
                }
                // Freshly built children may contain mergeable neighbours.
                self.merge_span(id, 0, count)?;
                Ok(id)
            }
        }
    }

    fn free(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.remove(&node) {
            if let Content::Element { children, .. } = state.content {
                for child in children {
                    self.free(child);
                }
            }
        }
    }

    fn children_mut(&mut self, parent: NodeId) -> Result<&mut Vec<NodeId>> {
        match self.nodes.get_mut(&parent).map(|n| &mut n.content) {
            Some(Content::Element { children, .. }) => Ok(children),
            Some(Content::Text { .. }) => Err(Error::InvalidPosition(
                "text nodes cannot contain positions".into(),
            )),
            None => Err(Error::InconsistentState(format!("unknown node {parent:?}"))),
        }
    }

    /// Makes `offset` a child boundary of `parent`, splitting a text node if needed, and
    /// returns the index of the first child at or after it.
    fn split_at(&mut self, parent: NodeId, offset: usize) -> Result<usize> {
        let (index, inner) = self.locate(parent, offset)?;
        if inner == 0 {
            return Ok(index);
        }
        let child = self.children(parent)[index];
        let state = self
            .nodes
            .get_mut(&child)
            .ok_or(Error::NodeNotFoundInParent(child))?;
        let (tail, tail_len) = match &mut state.content {
            Content::Text { data, len } => {
                let tail = data.split_off(byte_index(data, inner));
                let tail_len = *len - inner;
                *len = inner;
                (tail, tail_len)
            }
            Content::Element { .. } => {
                return Err(Error::InconsistentState("offset inside an element".into()))
            }
        };
        let attributes = state.attributes.clone();
        let id = self.alloc(NodeState {
            parent: Some(parent),
            attributes,
            content: Content::Text {
                data: tail,
                len: tail_len,
            },
        });
        self.children_mut(parent)?.insert(index + 1, id);
        Ok(index + 1)
    }

    /// Merges text neighbours across every child boundary from `from` to `to` (inclusive).
    fn merge_span(&mut self, parent: NodeId, from: usize, to: usize) -> Result<()> {
        for index in (from..=to).rev() {
            self.merge_at(parent, index)?;
        }
        Ok(())
    }

    /// Merges the children at `index - 1` and `index` when both are text with equal attributes.
    fn merge_at(&mut self, parent: NodeId, index: usize) -> Result<()> {
        let children = self.children_of(parent)?;
        if index == 0 || index >= children.len() {
            return Ok(());
        }
        let (left, right) = (children[index - 1], children[index]);
        let mergeable = match (self.nodes.get(&left), self.nodes.get(&right)) {
            (Some(l), Some(r)) => {
                matches!(
                    (&l.content, &r.content),
                    (Content::Text { .. }, Content::Text { .. })
                ) && l.attributes == r.attributes
            }
            _ => false,
        };
        if !mergeable {
            return Ok(());
        }
        let removed = self
            .nodes
            .remove(&right)
            .ok_or(Error::NodeNotFoundInParent(right))?;
        if let (
            Content::Text { data, len },
            Some(NodeState {
                content:
                    Content::Text {
                        data: left_data,
                        len: left_len,
                    },
                ..
            }),
        ) = (removed.content, self.nodes.get_mut(&left))
        {
            left_data.push_str(&data);
            *left_len += len;
        }
        self.children_mut(parent)?.remove(index);
        Ok(())
    }

    fn introduces_cycle(&self, node: NodeId, potential_parent: NodeId) -> bool {
        let mut current = Some(potential_parent);
        while let Some(n) = current {
            if n == node {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Text;
    use serde_json::json;

    fn sample() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let root = tree.create_root("main", "$root").unwrap();
        let nodes = NodeList::from(vec![
            Node::text("foo"),
            Node::Text(Text::new("bar").with_attribute("bold", true)),
            Node::element("image"),
            Node::text("xyz"),
        ]);
        tree.insert_nodes(root, 0, &nodes).unwrap();
        (tree, root)
    }

    fn texts(tree: &Tree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .iter()
            .map(|c| tree.data(*c).map(str::to_string).unwrap_or_else(|| "<el>".into()))
            .collect()
    }

    #[test]
    fn insert_merges_only_equal_attributes() {
        let (mut tree, root) = sample();
        tree.insert_nodes(root, 3, &NodeList::from(Node::text("xxx"))).unwrap();
        assert_eq!(texts(&tree, root), vec!["fooxxx", "bar", "<el>", "xyz"]);
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn inserted_elements_merge_their_own_children() {
        let (mut tree, root) = sample();
        let paragraph = Element::new("paragraph").with_children(vec![
            Node::text("ab"),
            Node::text("cd"),
            Node::Text(Text::new("ef").with_attribute("bold", true)),
        ]);
        tree.insert_nodes(root, 0, &NodeList::from(paragraph)).unwrap();
        let inserted = tree.children(root)[0];
        assert_eq!(texts(&tree, inserted), vec!["abcd", "ef"]);
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn insert_inside_text_splits_it() {
        let (mut tree, root) = sample();
        tree.insert_nodes(root, 1, &NodeList::from(Node::element("br"))).unwrap();
        assert_eq!(texts(&tree, root), vec!["f", "<el>", "oo", "bar", "<el>", "xyz"]);
        assert_eq!(tree.max_offset(root), 11);
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn remove_returns_detached_nodes_and_merges_neighbours() {
        let (mut tree, root) = sample();
        let removed = tree.remove_nodes(root, 2, 5).unwrap();
        assert_eq!(
            removed,
            NodeList::from(vec![
                Node::text("o"),
                Node::Text(Text::new("bar").with_attribute("bold", true)),
                Node::element("image"),
            ])
        );
        assert_eq!(texts(&tree, root), vec!["foxyz"]);
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn attribute_changes_split_and_remerge_text() {
        let (mut tree, root) = sample();
        tree.set_attribute_in(root, 1, 2, "bold", Some(&json!(true))).unwrap();
        assert_eq!(texts(&tree, root), vec!["f", "o", "o", "bar", "<el>", "xyz"]);
        tree.set_attribute_in(root, 1, 2, "bold", None).unwrap();
        assert_eq!(texts(&tree, root), vec!["foo", "bar", "<el>", "xyz"]);
        tree.set_attribute_in(root, 0, 3, "bold", Some(&json!(true))).unwrap();
        assert_eq!(texts(&tree, root), vec!["foobar", "<el>", "xyz"]);
        tree.validate_invariants().unwrap();
    }

    #[test]
    fn items_cut_partial_text() {
        let (tree, root) = sample();
        let items = tree.items(root, 2, 8).unwrap();
        assert_eq!(items.len(), 4);
        match items[0] {
            Item::Text(proxy) => {
                assert_eq!(proxy.data(), "o");
                assert_eq!(proxy.offset_in_text(), 2);
                assert!(proxy.is_partial());
            }
            Item::Element { .. } => panic!("expected text"),
        }
        assert!(matches!(items[2], Item::Element { .. }));
        match items[3] {
            Item::Text(proxy) => assert_eq!(proxy.data(), "x"),
            Item::Element { .. } => panic!("expected text"),
        }
    }

    #[test]
    fn paths_and_offsets_round_trip() {
        let (tree, root) = sample();
        let image = tree.children(root)[2];
        assert_eq!(tree.start_offset(image).unwrap(), 6);
        assert_eq!(tree.path_of(image).unwrap(), ("main".to_string(), vec![6]));
        assert_eq!(tree.offset_to_index(root, 4).unwrap(), 1);
        assert_eq!(tree.index_to_offset(root, 3), 7);
    }

    #[test]
    fn detects_corrupted_parent_links() {
        let (mut tree, root) = sample();
        let image = tree.children(root)[2];
        tree.children_mut(root).unwrap().retain(|c| *c != image);
        assert!(matches!(
            tree.index_in_parent(image),
            Err(Error::NodeNotFoundInParent(_))
        ));
        let err = tree.validate_invariants().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn attaching_into_own_subtree_is_rejected() {
        let mut tree = Tree::new();
        let root = tree.create_root("main", "$root").unwrap();
        let nested = Element::new("quote").with_child(Element::new("paragraph"));
        tree.insert_nodes(root, 0, &NodeList::from(nested)).unwrap();
        let quote = tree.children(root)[0];
        let paragraph = tree.children(quote)[0];
        let ids = tree.detach_nodes(root, 0, 1).unwrap();
        assert!(tree.attach_nodes(paragraph, 0, &ids).is_err());
    }

    #[test]
    fn text_offsets_count_characters() {
        let mut tree = Tree::new();
        let root = tree.create_root("main", "$root").unwrap();
        tree.insert_nodes(root, 0, &NodeList::from(Node::text("żółw"))).unwrap();
        assert_eq!(tree.max_offset(root), text_len("żółw"));
        tree.insert_nodes(root, 2, &NodeList::from(Node::element("br"))).unwrap();
        assert_eq!(texts(&tree, root), vec!["żó", "<el>", "łw"]);
    }
}
