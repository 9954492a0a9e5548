use crate::error::{Error, Result};
use crate::ids::Version;
use crate::ops::Operation;

/// Append-only log of the operations applied to a document.
pub trait OperationLog {
    /// Records an applied operation. Operations arrive in version order.
    fn append(&mut self, op: Operation) -> Result<()>;
    /// Operations whose base version is `version` or later, in application order.
    fn operations_since(&self, version: Version) -> Result<Vec<Operation>>;
    /// Version the document reaches after the last logged operation.
    fn latest_version(&self) -> Version;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory vector-backed log for tests and default flows.
#[derive(Clone, Debug, Default)]
pub struct MemoryOperationLog {
    ops: Vec<Operation>,
}

impl MemoryOperationLog {
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }
}

impl OperationLog for MemoryOperationLog {
    fn append(&mut self, op: Operation) -> Result<()> {
        let Some(base) = op.base_version else {
            return Err(Error::InvalidOperation(
                "only document operations can be logged".into(),
            ));
        };
        let expected = self.latest_version();
        if !self.ops.is_empty() && base != expected {
            return Err(Error::WrongOperationVersion {
                expected,
                actual: base,
            });
        }
        self.ops.push(op);
        Ok(())
    }

    fn operations_since(&self, version: Version) -> Result<Vec<Operation>> {
        Ok(self
            .ops
            .iter()
            .filter(|op| op.base_version.is_some_and(|base| base >= version))
            .cloned()
            .collect())
    }

    fn latest_version(&self) -> Version {
        self.ops
            .last()
            .and_then(|op| op.base_version)
            .map(|base| base + 1)
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.ops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_base_version() {
        let mut log = MemoryOperationLog::default();
        for base in 0..4 {
            log.append(Operation::no_op(Some(base))).unwrap();
        }
        assert_eq!(log.latest_version(), 4);
        let since = log.operations_since(2).unwrap();
        assert_eq!(
            since.iter().map(|op| op.base_version).collect::<Vec<_>>(),
            vec![Some(2), Some(3)]
        );
        assert!(matches!(
            log.append(Operation::no_op(Some(7))),
            Err(Error::WrongOperationVersion {
                expected: 4,
                actual: 7
            })
        ));
        assert!(log.append(Operation::no_op(None)).is_err());
    }
}
