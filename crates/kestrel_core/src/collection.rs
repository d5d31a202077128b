//! Observable collections
//!
//! [`Items<T>`] is a shared, externally-owned list whose owner can replace or
//! edit it at any time. Observers are told after every mutation, once the
//! borrow on the list has been released.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::bus::EventBus;
use crate::subscription::Teardown;

/// Notification sent after an [`Items`] mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemsChanged {
    pub len: usize,
    pub version: u64,
}

struct ItemsInner<T> {
    values: RefCell<Vec<T>>,
    version: Cell<u64>,
    changed: EventBus<ItemsChanged>,
}

/// Shared observable list (cheap to clone, clones share the list)
pub struct Items<T> {
    inner: Rc<ItemsInner<T>>,
}

impl<T> Clone for Items<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Items<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ItemsInner {
                values: RefCell::new(values),
                version: Cell::new(0),
                changed: EventBus::new(),
            }),
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.values.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.values.borrow().is_empty()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.values.borrow().clone()
    }

    /// Replace the contents
    pub fn set(&self, values: Vec<T>) {
        *self.inner.values.borrow_mut() = values;
        self.notify();
    }

    /// Edit the contents in place
    pub fn update(&self, f: impl FnOnce(&mut Vec<T>)) {
        f(&mut self.inner.values.borrow_mut());
        self.notify();
    }

    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Observe mutations
    pub fn subscribe(&self, f: impl Fn(&ItemsChanged) + 'static) -> Teardown {
        self.inner.changed.subscribe(f)
    }

    fn notify(&self) {
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        let change = ItemsChanged {
            len: self.len(),
            version,
        };
        self.inner.changed.emit(&change);
    }
}

impl<T: Clone + 'static> From<Vec<T>> for Items<T> {
    fn from(values: Vec<T>) -> Self {
        Items::new(values)
    }
}

impl<T: Clone + 'static> Default for Items<T> {
    fn default() -> Self {
        Items::new(Vec::new())
    }
}

impl<T: fmt::Debug> fmt::Debug for Items<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Items")
            .field("values", &self.inner.values.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}
