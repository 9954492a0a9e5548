use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::ids::Version;
use crate::markers::MarkerCollection;
use crate::node::NodeList;
use crate::position::{Position, Stickiness};
use crate::range::Range;
use crate::tree::Tree;

/// `className` values accepted by [`Operation::from_json`].
pub const CLASS_NAMES: &[&str] = &[
    "InsertOperation",
    "RemoveOperation",
    "MoveOperation",
    "RenameOperation",
    "AttributeOperation",
    "RootAttributeOperation",
    "MarkerOperation",
    "RootOperation",
    "NoOperation",
];

/// The document mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "className")]
pub enum OperationKind {
    #[serde(rename = "InsertOperation", rename_all = "camelCase")]
    Insert { position: Position, nodes: NodeList },
    /// Detaches a flat range. `nodes` holds the detached content once the operation has been
    /// executed; it is what the reversed operation re-inserts.
    #[serde(rename = "RemoveOperation", rename_all = "camelCase")]
    Remove {
        source_position: Position,
        how_many: usize,
        #[serde(default)]
        nodes: NodeList,
    },
    /// `target_position` is expressed in the tree before the source range is detached.
    #[serde(rename = "MoveOperation", rename_all = "camelCase")]
    Move {
        source_position: Position,
        how_many: usize,
        target_position: Position,
    },
    /// `position` is the position right before the renamed element.
    #[serde(rename = "RenameOperation", rename_all = "camelCase")]
    Rename {
        position: Position,
        old_name: String,
        new_name: String,
    },
    /// `None` values mean "attribute not set".
    #[serde(rename = "AttributeOperation", rename_all = "camelCase")]
    Attribute {
        range: Range,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
    },
    #[serde(rename = "RootAttributeOperation", rename_all = "camelCase")]
    RootAttribute {
        root: String,
        key: String,
        old_value: Option<Value>,
        new_value: Option<Value>,
    },
    /// A `None` range means the marker does not exist on that side of the change.
    #[serde(rename = "MarkerOperation", rename_all = "camelCase")]
    Marker {
        name: String,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    },
    /// Attaches (`is_add`) or detaches a root. Adding an unknown root creates it.
    #[serde(rename = "RootOperation", rename_all = "camelCase")]
    Root {
        root_name: String,
        element_name: String,
        is_add: bool,
    },
    #[serde(rename = "NoOperation")]
    NoOp,
}

impl OperationKind {
    pub fn roots(&self) -> Vec<&str> {
        match self {
            OperationKind::Insert { position, .. } => vec![position.root()],
            OperationKind::Remove {
                source_position, ..
            } => vec![source_position.root()],
            OperationKind::Move {
                source_position,
                target_position,
                ..
            } => vec![source_position.root(), target_position.root()],
            OperationKind::Rename { position, .. } => vec![position.root()],
            OperationKind::Attribute { range, .. } => vec![range.root()],
            OperationKind::RootAttribute { root, .. } => vec![root.as_str()],
            OperationKind::Marker {
                old_range,
                new_range,
                ..
            } => old_range
                .iter()
                .chain(new_range.iter())
                .map(Range::root)
                .collect(),
            OperationKind::Root { root_name, .. } => vec![root_name.as_str()],
            OperationKind::NoOp => Vec::new(),
        }
    }
}

/// Full operation envelope.
///
/// `base_version` is the document version the operation was authored against; `None` marks an
/// operation for a detached fragment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub base_version: Option<Version>,
    #[serde(flatten)]
    pub kind: OperationKind,
}

pub(crate) fn plain(position: &Position) -> Position {
    position.clone().with_stickiness(Stickiness::ToNone)
}

impl Operation {
    pub fn new(base_version: Option<Version>, kind: OperationKind) -> Self {
        Self { base_version, kind }
    }

    pub fn insert(base_version: Option<Version>, position: &Position, nodes: impl Into<NodeList>) -> Self {
        Self::new(
            base_version,
            OperationKind::Insert {
                position: plain(position),
                nodes: nodes.into(),
            },
        )
    }

    pub fn remove(base_version: Option<Version>, position: &Position, how_many: usize) -> Self {
        Self::new(
            base_version,
            OperationKind::Remove {
                source_position: plain(position),
                how_many,
                nodes: NodeList::new(),
            },
        )
    }

    pub fn move_range(
        base_version: Option<Version>,
        source: &Position,
        how_many: usize,
        target: &Position,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::Move {
                source_position: plain(source),
                how_many,
                target_position: plain(target),
            },
        )
    }

    pub fn rename(
        base_version: Option<Version>,
        position: &Position,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::Rename {
                position: plain(position),
                old_name: old_name.into(),
                new_name: new_name.into(),
            },
        )
    }

    pub fn attribute(
        base_version: Option<Version>,
        range: Range,
        key: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::Attribute {
                range,
                key: key.into(),
                old_value,
                new_value,
            },
        )
    }

    pub fn root_attribute(
        base_version: Option<Version>,
        root: impl Into<String>,
        key: impl Into<String>,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::RootAttribute {
                root: root.into(),
                key: key.into(),
                old_value,
                new_value,
            },
        )
    }

    pub fn marker(
        base_version: Option<Version>,
        name: impl Into<String>,
        old_range: Option<Range>,
        new_range: Option<Range>,
        affects_data: bool,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::Marker {
                name: name.into(),
                old_range,
                new_range,
                affects_data,
            },
        )
    }

    pub fn root(
        base_version: Option<Version>,
        root_name: impl Into<String>,
        element_name: impl Into<String>,
        is_add: bool,
    ) -> Self {
        Self::new(
            base_version,
            OperationKind::Root {
                root_name: root_name.into(),
                element_name: element_name.into(),
                is_add,
            },
        )
    }

    pub fn no_op(base_version: Option<Version>) -> Self {
        Self::new(base_version, OperationKind::NoOp)
    }

    /// The `className` discriminator of this operation's JSON form.
    pub fn class_name(&self) -> &'static str {
        match self.kind {
            OperationKind::Insert { .. } => "InsertOperation",
            OperationKind::Remove { .. } => "RemoveOperation",
            OperationKind::Move { .. } => "MoveOperation",
            OperationKind::Rename { .. } => "RenameOperation",
            OperationKind::Attribute { .. } => "AttributeOperation",
            OperationKind::RootAttribute { .. } => "RootAttributeOperation",
            OperationKind::Marker { .. } => "MarkerOperation",
            OperationKind::Root { .. } => "RootOperation",
            OperationKind::NoOp => "NoOperation",
        }
    }

    /// Whether the operation targets a document (and is version checked).
    pub fn is_document_operation(&self) -> bool {
        self.base_version.is_some()
    }

    pub fn is_no_op(&self) -> bool {
        matches!(self.kind, OperationKind::NoOp)
    }

    /// Names of the roots this operation addresses.
    pub fn roots(&self) -> Vec<&str> {
        self.kind.roots()
    }

    /// The operation that undoes this one when applied right after it.
    ///
    /// A reversed `Remove` re-inserts the nodes captured when it was executed, so reverse the
    /// copy returned by [`crate::Document::apply`].
    pub fn reversed(&self) -> Operation {
        let base_version = self.base_version.map(|v| v + 1);
        let kind = match &self.kind {
            OperationKind::Insert { position, nodes } => OperationKind::Remove {
                source_position: plain(position),
                how_many: nodes.max_offset(),
                nodes: nodes.clone(),
            },
            OperationKind::Remove {
                source_position,
                nodes,
                ..
            } => OperationKind::Insert {
                position: plain(source_position),
                nodes: nodes.clone(),
            },
            OperationKind::Move {
                source_position,
                how_many,
                target_position,
            } => {
                let source = plain(source_position);
                let target = plain(target_position);
                let moved_start = target
                    .transformed_by_deletion(&source, *how_many)
                    .unwrap_or_else(|| target.clone());
                let new_target = source.transformed_by_insertion(&target, *how_many);
                OperationKind::Move {
                    source_position: moved_start,
                    how_many: *how_many,
                    target_position: new_target,
                }
            }
            OperationKind::Rename {
                position,
                old_name,
                new_name,
            } => OperationKind::Rename {
                position: position.clone(),
                old_name: new_name.clone(),
                new_name: old_name.clone(),
            },
            OperationKind::Attribute {
                range,
                key,
                old_value,
                new_value,
            } => OperationKind::Attribute {
                range: range.clone(),
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },
            OperationKind::RootAttribute {
                root,
                key,
                old_value,
                new_value,
            } => OperationKind::RootAttribute {
                root: root.clone(),
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },
            OperationKind::Marker {
                name,
                old_range,
                new_range,
                affects_data,
            } => OperationKind::Marker {
                name: name.clone(),
                old_range: new_range.clone(),
                new_range: old_range.clone(),
                affects_data: *affects_data,
            },
            OperationKind::Root {
                root_name,
                element_name,
                is_add,
            } => OperationKind::Root {
                root_name: root_name.clone(),
                element_name: element_name.clone(),
                is_add: !is_add,
            },
            OperationKind::NoOp => OperationKind::NoOp,
        };
        Operation { base_version, kind }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parses the JSON form of an operation, checking that every root it addresses exists in
    /// `tree` (a `RootOperation` may name a root that does not exist yet).
    pub fn from_json(json: &Value, tree: &Tree) -> Result<Self> {
        let operation = Operation::parse_json(json)?;
        if !matches!(operation.kind, OperationKind::Root { .. }) {
            if let Some(missing) = operation
                .roots()
                .into_iter()
                .find(|root| tree.root_attached(root).is_none())
            {
                return Err(Error::RootNotFound(missing.to_string()));
            }
        }
        Ok(operation)
    }

    /// Parses the JSON form of an operation without looking at any document.
    pub fn parse_json(json: &Value) -> Result<Self> {
        let class = json
            .get("className")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnknownOperationClass("<missing>".into()))?;
        if !CLASS_NAMES.contains(&class) {
            return Err(Error::UnknownOperationClass(class.to_string()));
        }
        let operation: Operation = serde_json::from_value(json.clone())?;
        if let OperationKind::Remove {
            source_position,
            how_many,
            ..
        }
        | OperationKind::Move {
            source_position,
            how_many,
            ..
        } = &operation.kind
        {
            range_end(source_position, *how_many)?;
        }
        Ok(operation)
    }

    /// Applies the operation to `tree` and returns the executed copy.
    ///
    /// Everything is validated before the tree is touched, so a failed execution leaves the
    /// tree as it was.
    pub(crate) fn execute(&self, tree: &mut Tree, markers: &mut MarkerCollection) -> Result<Operation> {
        match &self.kind {
            OperationKind::Insert { position, nodes } => {
                if nodes.is_empty() {
                    return Err(Error::InvalidOperation("insert operation has no nodes".into()));
                }
                let parent = tree.resolve(position)?;
                tree.insert_nodes(parent, position.offset(), nodes)?;
            }
            OperationKind::Remove {
                source_position,
                how_many,
                ..
            } => {
                let parent = resolve_source(tree, source_position, *how_many)?;
                let nodes = tree.remove_nodes(parent, source_position.offset(), *how_many)?;
                return Ok(Operation {
                    base_version: self.base_version,
                    kind: OperationKind::Remove {
                        source_position: source_position.clone(),
                        how_many: *how_many,
                        nodes,
                    },
                });
            }
            OperationKind::Move {
                source_position,
                how_many,
                target_position,
            } => {
                let source_parent = resolve_source(tree, source_position, *how_many)?;
                if target_inside_moved(source_position, *how_many, target_position) {
                    return Err(Error::InvalidTarget(
                        "move target lies inside the moved range".into(),
                    ));
                }
                let target_parent = tree
                    .resolve(target_position)
                    .map_err(|err| Error::InvalidTarget(err.to_string()))?;
                let insert_at = target_position
                    .transformed_by_deletion(source_position, *how_many)
                    .ok_or_else(|| {
                        Error::InvalidTarget("move target lies inside the moved range".into())
                    })?;
                let ids = tree.detach_nodes(source_parent, source_position.offset(), *how_many)?;
                tree.attach_nodes(target_parent, insert_at.offset(), &ids)?;
            }
            OperationKind::Rename {
                position,
                old_name,
                new_name,
            } => {
                let element = tree
                    .node_after(position)?
                    .filter(|node| !tree.is_text(*node))
                    .ok_or_else(|| {
                        Error::InvalidOperation("rename position must be before an element".into())
                    })?;
                if tree.name(element) != Some(old_name.as_str()) {
                    return Err(Error::InvalidOperation(format!(
                        "element is not named {old_name}"
                    )));
                }
                tree.rename(element, new_name)?;
            }
            OperationKind::Attribute {
                range,
                key,
                old_value,
                new_value,
            } => {
                if !range.is_flat() {
                    return Err(Error::NonFlatRange);
                }
                let parent = tree.resolve(range.start())?;
                let (start, end) = (range.start().offset(), range.end().offset());
                for item in tree.items(parent, start, end)? {
                    if item.attribute(key) != old_value.as_ref() {
                        return Err(Error::InvalidOperation(format!(
                            "attribute {key} does not have the expected old value"
                        )));
                    }
                }
                if old_value != new_value {
                    tree.set_attribute_in(parent, start, end, key, new_value.as_ref())?;
                }
            }
            OperationKind::RootAttribute {
                root,
                key,
                old_value,
                new_value,
            } => {
                let node = tree.root(root)?;
                if tree.attribute(node, key) != old_value.as_ref() {
                    return Err(Error::InvalidOperation(format!(
                        "root attribute {key} does not have the expected old value"
                    )));
                }
                tree.set_node_attribute(node, key, new_value.as_ref())?;
            }
            OperationKind::Marker {
                name,
                new_range,
                affects_data,
                ..
            } => match new_range {
                Some(range) => {
                    tree.resolve(range.start())?;
                    tree.resolve(range.end())?;
                    markers.set(name, range.clone(), *affects_data);
                }
                None => {
                    markers.remove(name);
                }
            },
            OperationKind::Root {
                root_name,
                element_name,
                is_add,
            } => match (tree.root_attached(root_name), *is_add) {
                (None, true) => {
                    tree.create_root(root_name, element_name)?;
                }
                (Some(false), true) => tree.set_root_attached(root_name, true)?,
                (Some(true), false) => tree.set_root_attached(root_name, false)?,
                (Some(true), true) => {
                    return Err(Error::InvalidOperation(format!(
                        "root {root_name} is already attached"
                    )))
                }
                (_, false) => return Err(Error::RootNotFound(root_name.clone())),
            },
            OperationKind::NoOp => {}
        }
        Ok(self.clone())
    }
}

fn resolve_source(tree: &Tree, source: &Position, how_many: usize) -> Result<crate::ids::NodeId> {
    if how_many == 0 {
        return Err(Error::InvalidOperation("operation range is empty".into()));
    }
    let parent = tree.resolve(source)?;
    let max = tree.max_offset(parent);
    let end = range_end(source, how_many)?;
    if end > max {
        return Err(Error::InvalidPosition(format!(
            "range {}..{end} is past the end of its parent ({max})",
            source.offset(),
        )));
    }
    Ok(parent)
}

/// Offset just past `how_many` units starting at `source`.
fn range_end(source: &Position, how_many: usize) -> Result<usize> {
    source
        .offset()
        .checked_add(how_many)
        .filter(|end| isize::try_from(*end).is_ok())
        .ok_or_else(|| Error::InvalidPosition(format!("range length {how_many} is out of bounds")))
}

/// Whether `target` lies strictly inside the moved range or anywhere inside a moved node.
pub(crate) fn target_inside_moved(source: &Position, how_many: usize, target: &Position) -> bool {
    if source.root() != target.root() {
        return false;
    }
    let depth = source.path().len() - 1;
    if target.path().len() <= depth || target.path()[..depth] != source.path()[..depth] {
        return false;
    }
    let at = target.path()[depth];
    let (from, to) = (source.offset(), source.offset().saturating_add(how_many));
    if target.path().len() == depth + 1 {
        from < at && at < to
    } else {
        from <= at && at < to
    }
}
