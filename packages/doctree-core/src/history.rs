use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::ids::Version;
use crate::ops::Operation;
use crate::traits::{MemoryOperationLog, OperationLog};

/// Operation log plus undo bookkeeping. Operations are identified by their base version.
#[derive(Debug, Default)]
pub struct History<S: OperationLog = MemoryOperationLog> {
    log: S,
    undone: BTreeMap<Version, Version>,
    undoing: BTreeSet<Version>,
}

impl<S: OperationLog> History<S> {
    pub fn new(log: S) -> Self {
        Self {
            log,
            undone: BTreeMap::new(),
            undoing: BTreeSet::new(),
        }
    }

    pub fn log(&self) -> &S {
        &self.log
    }

    pub(crate) fn record(&mut self, op: Operation) -> Result<()> {
        self.log.append(op)
    }

    pub fn operations_since(&self, version: Version) -> Result<Vec<Operation>> {
        self.log.operations_since(version)
    }

    pub fn latest_version(&self) -> Version {
        self.log.latest_version()
    }

    /// Marks the operation at `undone` as reverted by the operation at `undoing`.
    pub(crate) fn set_undone(&mut self, undone: Version, undoing: Version) {
        self.undone.insert(undone, undoing);
        self.undoing.insert(undoing);
    }

    pub fn is_undone(&self, version: Version) -> bool {
        self.undone.contains_key(&version)
    }

    pub fn is_undoing(&self, version: Version) -> bool {
        self.undoing.contains(&version)
    }

    /// Base version of the operation that reverted the one at `version`.
    pub fn undoing_version(&self, version: Version) -> Option<Version> {
        self.undone.get(&version).copied()
    }
}
