//! Self-updating positions and ranges.
//!
//! A live reference subscribes to its document's change stream and rebases its coordinates
//! over every applied operation. Call `detach` when done; a reference whose root was detached
//! reports `None` from then on.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::document::Document;
use crate::error::Result;
use crate::ids::SubscriptionId;
use crate::position::Position;
use crate::range::Range;
use crate::traits::OperationLog;
use crate::transform::{transform_position, transform_range};

#[derive(Debug)]
pub struct LivePosition {
    state: Rc<RefCell<Option<Position>>>,
    subscription: SubscriptionId,
}

impl LivePosition {
    /// Binds `position` to `document`. The position must resolve in the current tree.
    pub fn new<S: OperationLog>(document: &mut Document<S>, position: Position) -> Result<Self> {
        document.tree().resolve(&position)?;
        let state = Rc::new(RefCell::new(Some(position)));
        let shared = Rc::clone(&state);
        let subscription = document.subscribe(move |event| {
            let mut slot = shared.borrow_mut();
            if let Some(current) = slot.take() {
                let next = transform_position(&current, event.operation);
                trace!(from = ?current.path(), to = ?next.as_ref().map(Position::path), "live position updated");
                *slot = next;
            }
        });
        Ok(Self {
            state,
            subscription,
        })
    }

    /// Current coordinates; `None` once the root was detached.
    pub fn position(&self) -> Option<Position> {
        self.state.borrow().clone()
    }

    pub fn is_valid(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Stops tracking and returns the last coordinates.
    pub fn detach<S: OperationLog>(self, document: &mut Document<S>) -> Option<Position> {
        document.unsubscribe(self.subscription);
        self.state.borrow_mut().take()
    }
}

#[derive(Debug)]
pub struct LiveRange {
    state: Rc<RefCell<Option<Range>>>,
    subscription: SubscriptionId,
}

impl LiveRange {
    /// Binds `range` to `document`. Both boundaries must resolve in the current tree.
    pub fn new<S: OperationLog>(document: &mut Document<S>, range: Range) -> Result<Self> {
        document.tree().resolve(range.start())?;
        document.tree().resolve(range.end())?;
        let state = Rc::new(RefCell::new(Some(range)));
        let shared = Rc::clone(&state);
        let subscription = document.subscribe(move |event| {
            let mut slot = shared.borrow_mut();
            if let Some(current) = slot.take() {
                let next = transform_range(&current, event.operation);
                trace!(valid = next.is_some(), "live range updated");
                *slot = next;
            }
        });
        Ok(Self {
            state,
            subscription,
        })
    }

    pub fn range(&self) -> Option<Range> {
        self.state.borrow().clone()
    }

    pub fn is_valid(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    pub fn detach<S: OperationLog>(self, document: &mut Document<S>) -> Option<Range> {
        document.unsubscribe(self.subscription);
        self.state.borrow_mut().take()
    }
}
