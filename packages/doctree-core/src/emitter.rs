use std::fmt;

use crate::ids::{SubscriptionId, Version};
use crate::markers::MarkerCollection;
use crate::ops::Operation;
use crate::tree::Tree;

/// Payload of a change notification. Listeners see the fully applied state.
pub struct ChangeEvent<'a> {
    /// The executed operation (a `Remove` carries the nodes it detached).
    pub operation: &'a Operation,
    /// Document version after the operation.
    pub version: Version,
    pub tree: &'a Tree,
    pub markers: &'a MarkerCollection,
}

type Listener = Box<dyn FnMut(&ChangeEvent<'_>)>;

/// Ordered list of change listeners.
#[derive(Default)]
pub struct Emitter {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Emitter {
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent<'_>) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Calls every listener in registration order.
    pub fn emit(&mut self, event: &ChangeEvent<'_>) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
