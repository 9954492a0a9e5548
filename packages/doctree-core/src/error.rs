use thiserror::Error;

use crate::ids::{NodeId, Version};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("operation requires a flat range")]
    NonFlatRange,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("operation base version {actual} does not match document version {expected}")]
    WrongOperationVersion { expected: Version, actual: Version },
    #[error("node {0:?} is not present in its parent")]
    NodeNotFoundInParent(NodeId),
    #[error("positions belong to different roots: {0} and {1}")]
    DifferentRoots(String, String),
    #[error("unknown operation class: {0}")]
    UnknownOperationClass(String),
    #[error("root not found: {0}")]
    RootNotFound(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Tree-corruption errors. These point at an earlier bug and cannot be fixed by the caller
    /// transforming and retrying the operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NodeNotFoundInParent(_) | Error::InconsistentState(_)
        )
    }
}
