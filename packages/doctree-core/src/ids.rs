use serde::{Deserialize, Serialize};

/// Document version counter; one step per applied operation.
pub type Version = u64;

/// Arena handle of a node inside a [`crate::Tree`].
///
/// Handles are never reused within a tree, so a stale handle resolves to nothing instead of
/// aliasing a different node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Handle returned by [`crate::Document::subscribe`]; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SubscriptionId(pub u64);
