#![forbid(unsafe_code)]
//! Core of an operation-based tree document model.
//! Documents are mutated only through serializable operations; concurrent operations are
//! rebased with operational transformation, and live positions and ranges follow every change.
//! The crate is host-agnostic so it can be embedded in WASM or any other runtime.

pub mod batch;
pub mod document;
pub mod emitter;
pub mod error;
pub mod history;
pub mod ids;
pub mod live;
pub mod markers;
pub mod node;
pub mod ops;
pub mod position;
pub mod range;
pub mod traits;
pub mod transform;
pub mod tree;

pub use batch::{Batch, BatchType, Writer};
pub use document::{Document, DocumentFragment};
pub use emitter::{ChangeEvent, Emitter};
pub use error::{Error, Result};
pub use history::History;
pub use ids::{NodeId, SubscriptionId, Version};
pub use live::{LivePosition, LiveRange};
pub use markers::{Marker, MarkerCollection};
pub use node::{text_len, Attributes, Element, Node, NodeList, Text, TextProxy};
pub use ops::{Operation, OperationKind, CLASS_NAMES};
pub use position::{Position, PositionRelation, Stickiness};
pub use range::Range;
pub use traits::{MemoryOperationLog, OperationLog};
pub use transform::{transform, transform_position, transform_range, transform_sets, TransformContext};
pub use tree::{Item, Tree};
