use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::ids::{NodeId, Version};
use crate::node::{Element, NodeList, Text};
use crate::ops::{Operation, OperationKind};
use crate::position::Position;
use crate::range::Range;
use crate::traits::{MemoryOperationLog, OperationLog};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchType {
    /// Recorded for undo.
    #[default]
    Regular,
    /// Ignored by undo.
    Transparent,
}

/// Operations applied together, in application order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    kind: BatchType,
    operations: Vec<Operation>,
}

impl Batch {
    pub fn new(kind: BatchType) -> Self {
        Self {
            kind,
            operations: Vec::new(),
        }
    }

    pub fn kind(&self) -> BatchType {
        self.kind
    }

    pub fn is_undoable(&self) -> bool {
        self.kind == BatchType::Regular
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    /// Base version of the first document operation.
    pub fn base_version(&self) -> Option<Version> {
        self.operations.iter().find_map(|op| op.base_version)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builds operations against the current document version, applies them immediately and
/// collects the executed copies into a [`Batch`].
pub struct Writer<'a, S: OperationLog = MemoryOperationLog> {
    document: &'a mut Document<S>,
    batch: Batch,
}

impl<'a, S: OperationLog> Writer<'a, S> {
    pub(crate) fn new(document: &'a mut Document<S>, kind: BatchType) -> Self {
        Self {
            document,
            batch: Batch::new(kind),
        }
    }

    pub fn document(&self) -> &Document<S> {
        self.document
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn finish(self) -> Batch {
        self.batch
    }

    fn apply(&mut self, kind: OperationKind) -> Result<()> {
        let op = Operation::new(Some(self.document.version()), kind);
        let executed = self.document.apply(&op)?;
        self.batch.push(executed);
        Ok(())
    }

    pub fn insert(&mut self, position: &Position, nodes: impl Into<NodeList>) -> Result<()> {
        let nodes = nodes.into();
        if nodes.is_empty() {
            return Ok(());
        }
        self.apply(Operation::insert(None, position, nodes).kind)
    }

    pub fn insert_text(&mut self, position: &Position, data: impl Into<String>) -> Result<()> {
        let text = Text::new(data);
        if text.is_empty() {
            return Ok(());
        }
        self.insert(position, text)
    }

    pub fn insert_element(&mut self, position: &Position, name: impl Into<String>) -> Result<()> {
        self.insert(position, Element::new(name))
    }

    /// Removes any range, one flat piece at a time from the back.
    pub fn remove(&mut self, range: &Range) -> Result<()> {
        let pieces = range.minimal_flat_ranges(self.document.tree())?;
        for piece in pieces.iter().rev() {
            self.apply(Operation::remove(None, piece.start(), piece.offset_len()).kind)?;
        }
        Ok(())
    }

    pub fn move_range(&mut self, range: &Range, target: &Position) -> Result<()> {
        if !range.is_flat() {
            return Err(Error::NonFlatRange);
        }
        if range.is_collapsed() {
            return Ok(());
        }
        self.apply(Operation::move_range(None, range.start(), range.offset_len(), target).kind)
    }

    pub fn rename(&mut self, element: NodeId, new_name: impl Into<String>) -> Result<()> {
        let tree = self.document.tree();
        let old_name = tree
            .name(element)
            .ok_or_else(|| Error::InvalidOperation("only elements can be renamed".into()))?
            .to_string();
        let new_name = new_name.into();
        if old_name == new_name {
            return Ok(());
        }
        let position = Position::before(tree, element)?;
        self.apply(Operation::rename(None, &position, old_name, new_name).kind)
    }

    pub fn set_attribute(&mut self, range: &Range, key: &str, value: impl Into<Value>) -> Result<()> {
        self.change_attribute(range, key, Some(value.into()))
    }

    pub fn remove_attribute(&mut self, range: &Range, key: &str) -> Result<()> {
        self.change_attribute(range, key, None)
    }

    /// One attribute operation per run of items sharing the same old value.
    fn change_attribute(&mut self, range: &Range, key: &str, value: Option<Value>) -> Result<()> {
        let mut runs: Vec<(Range, Option<Value>)> = Vec::new();
        {
            let tree = self.document.tree();
            for flat in range.minimal_flat_ranges(tree)? {
                let mut offset = flat.start().offset();
                let mut current: Option<(usize, Option<Value>)> = None;
                for item in flat.items(tree)? {
                    let old = item.attribute(key).cloned();
                    let continues_run = matches!(&current, Some((_, run_old)) if *run_old == old);
                    if !continues_run {
                        if let Some((start, run_old)) = current.take() {
                            runs.push((run_range(&flat, start, offset), run_old));
                        }
                        current = Some((offset, old));
                    }
                    offset += item.offset_size();
                }
                if let Some((start, run_old)) = current {
                    runs.push((run_range(&flat, start, offset), run_old));
                }
            }
        }
        for (run, old) in runs {
            if old == value {
                continue;
            }
            self.apply(OperationKind::Attribute {
                range: run,
                key: key.to_string(),
                old_value: old,
                new_value: value.clone(),
            })?;
        }
        Ok(())
    }

    pub fn set_root_attribute(&mut self, root: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        self.change_root_attribute(root, key, Some(value.into()))
    }

    pub fn remove_root_attribute(&mut self, root: &str, key: &str) -> Result<()> {
        self.change_root_attribute(root, key, None)
    }

    fn change_root_attribute(&mut self, root: &str, key: &str, value: Option<Value>) -> Result<()> {
        let tree = self.document.tree();
        let node = tree.root(root)?;
        let old = tree.attribute(node, key).cloned();
        if old == value {
            return Ok(());
        }
        self.apply(Operation::root_attribute(None, root, key, old, value).kind)
    }

    pub fn add_marker(&mut self, name: &str, range: Range, affects_data: bool) -> Result<()> {
        if self.document.markers().has(name) {
            return Err(Error::InvalidOperation(format!("marker {name} already exists")));
        }
        self.apply(Operation::marker(None, name, None, Some(range), affects_data).kind)
    }

    pub fn update_marker(&mut self, name: &str, range: Range) -> Result<()> {
        let marker = self
            .document
            .markers()
            .get(name)
            .ok_or_else(|| Error::InvalidOperation(format!("marker {name} does not exist")))?;
        let (old, affects_data) = (marker.range().clone(), marker.affects_data());
        self.apply(Operation::marker(None, name, Some(old), Some(range), affects_data).kind)
    }

    pub fn remove_marker(&mut self, name: &str) -> Result<()> {
        let marker = self
            .document
            .markers()
            .get(name)
            .ok_or_else(|| Error::InvalidOperation(format!("marker {name} does not exist")))?;
        let (old, affects_data) = (marker.range().clone(), marker.affects_data());
        self.apply(Operation::marker(None, name, Some(old), None, affects_data).kind)
    }

    pub fn add_root(&mut self, name: &str, element_name: &str) -> Result<()> {
        self.apply(Operation::root(None, name, element_name, true).kind)
    }

    pub fn detach_root(&mut self, name: &str) -> Result<()> {
        let tree = self.document.tree();
        let node = tree.root(name)?;
        let element_name = tree.name(node).unwrap_or_default().to_string();
        self.apply(Operation::root(None, name, element_name, false).kind)
    }
}

fn run_range(flat: &Range, start: usize, end: usize) -> Range {
    Range::between(flat.start().with_offset(start), flat.start().with_offset(end))
}
