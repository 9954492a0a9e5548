use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, BatchType, Writer};
use crate::emitter::{ChangeEvent, Emitter};
use crate::error::{Error, Result};
use crate::history::History;
use crate::ids::{NodeId, SubscriptionId, Version};
use crate::markers::MarkerCollection;
use crate::node::Element;
use crate::ops::Operation;
use crate::traits::{MemoryOperationLog, OperationLog};
use crate::transform::{transform_sets, TransformContext};
use crate::tree::Tree;

/// A versioned document: named roots, markers, an operation log and change listeners.
///
/// Every content change goes through [`Document::apply`], which checks the operation's base
/// version, executes it, rebases the markers, bumps the version and notifies listeners in
/// registration order.
#[derive(Debug)]
pub struct Document<S: OperationLog = MemoryOperationLog> {
    tree: Tree,
    markers: MarkerCollection,
    version: Version,
    history: History<S>,
    emitter: Emitter,
}

impl Document<MemoryOperationLog> {
    pub fn new() -> Self {
        Self::empty(MemoryOperationLog::default())
    }
}

impl Default for Document<MemoryOperationLog> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OperationLog> Document<S> {
    /// Document recording into `log`. The log must be empty: the document starts at version 0
    /// with no roots.
    pub fn with_log(log: S) -> Result<Self> {
        if !log.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "operation log already holds {} operations",
                log.len()
            )));
        }
        Ok(Self::empty(log))
    }

    fn empty(log: S) -> Self {
        Self {
            tree: Tree::new(),
            markers: MarkerCollection::default(),
            version: 0,
            history: History::new(log),
            emitter: Emitter::default(),
        }
    }

    /// Creates an empty root outside of the operation stream.
    pub fn create_root(&mut self, name: &str, element_name: &str) -> Result<NodeId> {
        self.tree.create_root(name, element_name)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    /// Number of document operations applied so far.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    pub fn export_root(&self, name: &str) -> Result<Element> {
        self.tree.export_root(name)
    }

    pub fn validate(&self) -> Result<()> {
        self.tree.validate_invariants()
    }

    /// Parses the JSON form of an operation against this document's roots.
    pub fn operation_from_json(&self, json: &Value) -> Result<Operation> {
        Operation::from_json(json, &self.tree)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent<'_>) + 'static,
    {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Applies one operation and returns the executed copy.
    ///
    /// Fails with [`Error::WrongOperationVersion`] when the operation's base version is set and
    /// differs from the document version; a failed operation leaves the document untouched.
    /// Operations without a base version are executed without bumping the version or being
    /// logged.
    pub fn apply(&mut self, operation: &Operation) -> Result<Operation> {
        if let Some(base) = operation.base_version {
            if base != self.version {
                return Err(Error::WrongOperationVersion {
                    expected: self.version,
                    actual: base,
                });
            }
        }

        let executed = match operation.execute(&mut self.tree, &mut self.markers) {
            Ok(executed) => executed,
            Err(err) => {
                if err.is_fatal() {
                    error!(error = %err, class = operation.class_name(), "aborting apply");
                }
                return Err(err);
            }
        };
        if executed.is_document_operation() {
            if let Err(err) = self.history.record(executed.clone()) {
                executed.reversed().execute(&mut self.tree, &mut self.markers)?;
                warn!(error = %err, class = executed.class_name(), "operation log rejected the operation");
                return Err(err);
            }
            self.version += 1;
        }
        self.markers.transform_all(&executed);
        debug!(
            version = self.version,
            class = executed.class_name(),
            "applied operation"
        );

        let event = ChangeEvent {
            operation: &executed,
            version: self.version,
            tree: &self.tree,
            markers: &self.markers,
        };
        self.emitter.emit(&event);
        Ok(executed)
    }

    /// A writer that applies operations immediately; call [`Writer::finish`] for the batch.
    pub fn batch(&mut self, kind: BatchType) -> Writer<'_, S> {
        Writer::new(self, kind)
    }

    /// Runs `f` with a fresh writer and returns the resulting batch.
    ///
    /// There is no rollback: if `f` fails, the operations applied before the failure stay.
    pub fn change<F>(&mut self, kind: BatchType, f: F) -> Result<Batch>
    where
        F: FnOnce(&mut Writer<'_, S>) -> Result<()>,
    {
        let mut writer = Writer::new(self, kind);
        f(&mut writer)?;
        Ok(writer.finish())
    }

    /// Reverts the effect of `batch`, keeping every change applied after it.
    ///
    /// The batch's operations are reversed back to front, rebased over everything applied
    /// since, and applied as a new regular batch. Undoing that batch redoes the original.
    pub fn undo(&mut self, batch: &Batch) -> Result<Batch> {
        if !batch.is_undoable() {
            return Err(Error::InvalidOperation(
                "transparent batches cannot be undone".into(),
            ));
        }
        let ops: Vec<&Operation> = batch
            .operations()
            .iter()
            .filter(|op| op.is_document_operation())
            .collect();
        let bases: Vec<Version> = ops.iter().filter_map(|op| op.base_version).collect();
        if bases.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            return Err(Error::InvalidOperation(
                "batch operations were not applied consecutively".into(),
            ));
        }
        let Some(&last_base) = bases.last() else {
            return Ok(Batch::new(BatchType::Regular));
        };
        if bases.iter().any(|base| self.history.is_undone(*base)) {
            return Err(Error::InvalidOperation("batch was already undone".into()));
        }

        let reversed: Vec<Operation> = ops
            .iter()
            .rev()
            .enumerate()
            .map(|(i, op)| {
                let mut reversed = op.reversed();
                reversed.base_version = Some(last_base + 1 + i as Version);
                reversed
            })
            .collect();
        let later = self.history.operations_since(last_base + 1)?;
        let (_, rebased) = transform_sets(&later, &reversed, TransformContext::default());

        let undoing = self.version;
        let mut undo_batch = Batch::new(BatchType::Regular);
        for op in &rebased {
            undo_batch.push(self.apply(op)?);
        }
        for base in bases {
            self.history.set_undone(base, undoing);
        }
        info!(
            undone = undo_batch.len(),
            later = later.len(),
            version = self.version,
            "undid batch"
        );
        Ok(undo_batch)
    }
}

/// A standalone tree for content that is not part of a document yet. It only accepts
/// operations without a base version and keeps no history.
#[derive(Clone, Debug, Default)]
pub struct DocumentFragment {
    tree: Tree,
    markers: MarkerCollection,
}

impl DocumentFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_root(&mut self, name: &str, element_name: &str) -> Result<NodeId> {
        self.tree.create_root(name, element_name)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    pub fn export_root(&self, name: &str) -> Result<Element> {
        self.tree.export_root(name)
    }

    pub fn apply(&mut self, operation: &Operation) -> Result<Operation> {
        if operation.is_document_operation() {
            return Err(Error::InvalidOperation(
                "fragment operations must not carry a base version".into(),
            ));
        }
        let executed = operation.execute(&mut self.tree, &mut self.markers)?;
        self.markers.transform_all(&executed);
        Ok(executed)
    }
}
