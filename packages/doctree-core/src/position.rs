//! Addressable points in a document tree.
//!
//! A [`Position`] is a root name plus a path of offsets: every entry but the last is the offset
//! of an ancestor element inside its parent, the last one is the offset inside the innermost
//! parent. Text nodes occupy one offset unit per character, so a position may point into the
//! middle of a text node.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::NodeId;
use crate::tree::Tree;

/// Which side of an insertion a position binds to when content is inserted exactly at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stickiness {
    /// Follows content inserted at the position (the position ends up after it).
    #[default]
    ToNone,
    /// Binds to the content that follows.
    ToNext,
    /// Binds to the content that precedes; insertions at the position do not move it.
    ToPrevious,
}

/// Result of [`Position::compare_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionRelation {
    Before,
    After,
    Same,
    /// The positions are in different roots and cannot be ordered.
    Different,
}

/// Relation between two offset paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PathRelation {
    Same,
    /// The first path is a proper prefix of the second.
    Prefix,
    /// The first path extends the second.
    Extension,
    /// The paths differ first at this index.
    Differ(usize),
}

pub(crate) fn compare_paths(a: &[usize], b: &[usize]) -> PathRelation {
    if let Some(index) = a.iter().zip(b).position(|(x, y)| x != y) {
        return PathRelation::Differ(index);
    }
    match a.len().cmp(&b.len()) {
        Ordering::Equal => PathRelation::Same,
        Ordering::Less => PathRelation::Prefix,
        Ordering::Greater => PathRelation::Extension,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PositionData")]
pub struct Position {
    root: String,
    path: Vec<usize>,
    stickiness: Stickiness,
}

#[derive(Deserialize)]
struct PositionData {
    root: String,
    path: Vec<usize>,
    #[serde(default)]
    stickiness: Stickiness,
}

impl TryFrom<PositionData> for Position {
    type Error = Error;

    fn try_from(data: PositionData) -> Result<Self> {
        Ok(Position::new(data.root, data.path)?.with_stickiness(data.stickiness))
    }
}

impl Position {
    pub fn new(root: impl Into<String>, path: Vec<usize>) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidPosition("position path must not be empty".into()));
        }
        Ok(Self {
            root: root.into(),
            path,
            stickiness: Stickiness::default(),
        })
    }

    pub fn with_stickiness(mut self, stickiness: Stickiness) -> Self {
        self.stickiness = stickiness;
        self
    }

    /// Position before `node`, which must be attached to a root of `tree`.
    pub fn before(tree: &Tree, node: NodeId) -> Result<Self> {
        let (root, path) = tree.path_of(node)?;
        Position::new(root, path)
    }

    /// Position after `node`, which must be attached to a root of `tree`.
    pub fn after(tree: &Tree, node: NodeId) -> Result<Self> {
        let before = Position::before(tree, node)?;
        Ok(before.shifted_by(tree.offset_size(node) as isize))
    }

    /// Position at offset 0 inside `element`.
    pub fn at_start(tree: &Tree, element: NodeId) -> Result<Self> {
        let (root, mut path) = tree.path_of(element)?;
        path.push(0);
        Position::new(root, path)
    }

    /// Position after the last child of `element`.
    pub fn at_end(tree: &Tree, element: NodeId) -> Result<Self> {
        let (root, mut path) = tree.path_of(element)?;
        path.push(tree.max_offset(element));
        Position::new(root, path)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn stickiness(&self) -> Stickiness {
        self.stickiness
    }

    /// Offset inside the parent element.
    pub fn offset(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    pub fn with_offset(&self, offset: usize) -> Position {
        let mut moved = self.clone();
        let last = moved.path.len() - 1;
        moved.path[last] = offset;
        moved
    }

    pub fn shifted_by(&self, shift: isize) -> Position {
        let offset = self.offset() as isize + shift;
        self.with_offset(offset.max(0) as usize)
    }

    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len() - 1]
    }

    /// Whether both positions are in the same parent element.
    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.root == other.root
            && compare_paths(self.parent_path(), other.parent_path()) == PathRelation::Same
    }

    /// Longest common prefix of both paths (empty for different roots).
    pub fn common_path(&self, other: &Position) -> Vec<usize> {
        if self.root != other.root {
            return Vec::new();
        }
        self.path
            .iter()
            .zip(&other.path)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    }

    pub fn compare_with(&self, other: &Position) -> PositionRelation {
        if self.root != other.root {
            return PositionRelation::Different;
        }
        match compare_paths(&self.path, &other.path) {
            PathRelation::Same => PositionRelation::Same,
            PathRelation::Prefix => PositionRelation::Before,
            PathRelation::Extension => PositionRelation::After,
            PathRelation::Differ(i) => {
                if self.path[i] < other.path[i] {
                    PositionRelation::Before
                } else {
                    PositionRelation::After
                }
            }
        }
    }

    pub fn is_before(&self, other: &Position) -> Result<bool> {
        self.ensure_same_root(other)?;
        Ok(self.compare_with(other) == PositionRelation::Before)
    }

    pub fn is_after(&self, other: &Position) -> Result<bool> {
        self.ensure_same_root(other)?;
        Ok(self.compare_with(other) == PositionRelation::After)
    }

    /// Path equality; stickiness is not compared.
    pub fn is_equal(&self, other: &Position) -> Result<bool> {
        self.ensure_same_root(other)?;
        Ok(self.compare_with(other) == PositionRelation::Same)
    }

    pub(crate) fn same_point(&self, other: &Position) -> bool {
        self.compare_with(other) == PositionRelation::Same
    }

    fn ensure_same_root(&self, other: &Position) -> Result<()> {
        if self.root == other.root {
            Ok(())
        } else {
            Err(Error::DifferentRoots(self.root.clone(), other.root.clone()))
        }
    }

    /// Parent element of this position in `tree`.
    pub fn parent(&self, tree: &Tree) -> Result<NodeId> {
        tree.resolve(self)
    }

    /// Index of the child this position points at (or into).
    pub fn index(&self, tree: &Tree) -> Result<usize> {
        let parent = tree.resolve(self)?;
        tree.offset_to_index(parent, self.offset())
    }

    pub fn node_after(&self, tree: &Tree) -> Result<Option<NodeId>> {
        tree.node_after(self)
    }

    pub fn node_before(&self, tree: &Tree) -> Result<Option<NodeId>> {
        tree.node_before(self)
    }

    /// Text node the position is strictly inside of, if any.
    pub fn text_node(&self, tree: &Tree) -> Result<Option<NodeId>> {
        tree.text_node_at(self)
    }

    /// Elements from the root down to the parent of this position.
    pub fn ancestors(&self, tree: &Tree) -> Result<Vec<NodeId>> {
        let mut current = tree.root(&self.root)?;
        let mut ancestors = vec![current];
        for &offset in self.parent_path() {
            current = tree.child_at_offset(current, offset)?;
            ancestors.push(current);
        }
        Ok(ancestors)
    }

    /// Deepest element containing both positions; `None` when they are in different roots.
    pub fn common_ancestor(&self, other: &Position, tree: &Tree) -> Result<Option<NodeId>> {
        if self.root != other.root {
            return Ok(None);
        }
        let ours = self.ancestors(tree)?;
        let theirs = other.ancestors(tree)?;
        Ok(ours
            .iter()
            .zip(&theirs)
            .take_while(|(a, b)| a == b)
            .last()
            .map(|(a, _)| *a))
    }

    /// This position after `how_many` offset units were inserted at `insert_position`.
    pub fn transformed_by_insertion(&self, insert_position: &Position, how_many: usize) -> Position {
        let mut transformed = self.clone();
        if self.root != insert_position.root {
            return transformed;
        }
        match compare_paths(insert_position.parent_path(), self.parent_path()) {
            PathRelation::Same => {
                let shifts = insert_position.offset() < self.offset()
                    || (insert_position.offset() == self.offset()
                        && self.stickiness != Stickiness::ToPrevious);
                if shifts {
                    let last = transformed.path.len() - 1;
                    transformed.path[last] += how_many;
                }
            }
            PathRelation::Prefix => {
                let i = insert_position.path.len() - 1;
                if insert_position.offset() <= self.path[i] {
                    transformed.path[i] += how_many;
                }
            }
            _ => {}
        }
        transformed
    }

    /// This position after `how_many` offset units were removed at `delete_position`.
    ///
    /// Returns `None` when the position was inside the removed content.
    pub fn transformed_by_deletion(
        &self,
        delete_position: &Position,
        how_many: usize,
    ) -> Option<Position> {
        let mut transformed = self.clone();
        if self.root != delete_position.root {
            return Some(transformed);
        }
        match compare_paths(delete_position.parent_path(), self.parent_path()) {
            PathRelation::Same => {
                if delete_position.offset() < self.offset() {
                    if delete_position.offset().saturating_add(how_many) > self.offset() {
                        return None;
                    }
                    let last = transformed.path.len() - 1;
                    transformed.path[last] -= how_many;
                }
            }
            PathRelation::Prefix => {
                let i = delete_position.path.len() - 1;
                if delete_position.offset() <= self.path[i] {
                    if delete_position.offset().saturating_add(how_many) > self.path[i] {
                        return None;
                    }
                    transformed.path[i] -= how_many;
                }
            }
            _ => {}
        }
        Some(transformed)
    }

    /// This position after `how_many` offset units moved from `source` to `target`.
    ///
    /// `target` is expressed before the move, as in a move operation. Positions inside the
    /// moved content follow it; positions on its boundaries follow it only when their
    /// stickiness binds them to the moved side.
    pub fn transformed_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Position {
        let target = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());
        if source.same_point(&target) {
            return self.clone();
        }
        let transformed = self.transformed_by_deletion(source, how_many);
        let is_moved = match &transformed {
            None => true,
            Some(_) => {
                (source.same_point(self) && self.stickiness == Stickiness::ToNext)
                    || (source.shifted_by(how_many as isize).same_point(self)
                        && self.stickiness == Stickiness::ToPrevious)
            }
        };
        match transformed {
            Some(position) if !is_moved => position.transformed_by_insertion(&target, how_many),
            _ => self.combined(source, &target),
        }
    }

    /// Rebases a position from inside content starting at `source` onto the same content placed
    /// at `target`.
    pub fn combined(&self, source: &Position, target: &Position) -> Position {
        let i = source.path.len() - 1;
        let mut path = target.path.clone();
        let last = path.len() - 1;
        let relative = self.path.get(i).copied().unwrap_or(0).saturating_sub(source.offset());
        path[last] += relative;
        if self.path.len() > i + 1 {
            path.extend_from_slice(&self.path[i + 1..]);
        }
        Position {
            root: target.root.clone(),
            path,
            stickiness: self.stickiness,
        }
    }
}
