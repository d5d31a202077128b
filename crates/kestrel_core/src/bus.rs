//! Session-scoped event channels
//!
//! An [`EventBus`] is a private broadcast channel owned by one component
//! instance. Two instances never share a bus, so listeners never need to
//! filter events by an instance id.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::subscription::Teardown;

new_key_type! {
    /// Identifies one listener connected to an [`EventBus`]
    pub struct ListenerId;
}

type Handler<E> = Rc<dyn Fn(&E)>;
type Handlers<E> = RefCell<SlotMap<ListenerId, Handler<E>>>;

/// Broadcast channel with connect/disconnect semantics
pub struct EventBus<E> {
    handlers: Rc<Handlers<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    /// Connect a handler, returning its id
    pub fn connect(&self, handler: impl Fn(&E) + 'static) -> ListenerId {
        self.handlers.borrow_mut().insert(Rc::new(handler))
    }

    /// Disconnect a handler; returns false if it was already gone
    pub fn disconnect(&self, id: ListenerId) -> bool {
        self.handlers.borrow_mut().remove(id).is_some()
    }

    /// Connect a handler and return the teardown that disconnects it
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> Teardown {
        let id = self.connect(handler);
        let handlers: Weak<Handlers<E>> = Rc::downgrade(&self.handlers);
        Teardown::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.borrow_mut().remove(id);
            }
        })
    }

    /// Deliver `event` to every handler connected when emission starts
    ///
    /// Handlers may connect, disconnect or emit re-entrantly.
    pub fn emit(&self, event: &E) {
        let handlers: SmallVec<[Handler<E>; 4]> =
            self.handlers.borrow().values().cloned().collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.handlers.borrow().len())
            .finish()
    }
}
