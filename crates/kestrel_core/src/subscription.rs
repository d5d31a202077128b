//! Scoped subscription lifecycle
//!
//! Every externally observable side effect (a listener registered on an
//! element, an observer on a signal, a handler on a session channel) is
//! acquired as a [`Teardown`]. Teardowns are combined into a single
//! [`Subscription`] which releases all of them exactly once:
//!
//! - `release()` is idempotent, a second call does nothing
//! - dropping the subscription releases it
//! - a teardown pushed after release runs immediately
//!
//! # Example
//!
//! ```rust
//! use kestrel_core::subscription::{Subscription, Teardown};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let released = Rc::new(Cell::new(0));
//! let counter = released.clone();
//!
//! let mut sub = Subscription::acquire([move || {
//!     // register something here...
//!     Teardown::new(move || counter.set(counter.get() + 1))
//! }]);
//!
//! sub.release();
//! sub.release();
//! assert_eq!(released.get(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Undo operation returned by a subscribe operation
pub struct Teardown(Box<dyn FnOnce()>);

impl Teardown {
    /// Wrap a closure that undoes a side effect
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    /// A teardown with nothing to undo
    pub fn noop() -> Self {
        Self(Box::new(|| {}))
    }

    /// Consume the teardown and run it
    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Teardown")
    }
}

type Pending = SmallVec<[Teardown; 4]>;

/// A group of teardowns released together, exactly once
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    teardowns: Pending,
    released: bool,
}

impl Subscription {
    /// A subscription holding nothing yet
    pub fn empty() -> Self {
        Self {
            teardowns: SmallVec::new(),
            released: false,
        }
    }

    /// Combine teardowns that were already acquired
    pub fn from_teardowns(teardowns: impl IntoIterator<Item = Teardown>) -> Self {
        Self {
            teardowns: teardowns.into_iter().collect(),
            released: false,
        }
    }

    /// Run each subscribe operation in order and combine their teardowns
    pub fn acquire<I, S>(subscribes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: FnOnce() -> Teardown,
    {
        Self::from_teardowns(subscribes.into_iter().map(|subscribe| subscribe()))
    }

    /// Add a teardown acquired after construction
    ///
    /// If the subscription was already released the teardown runs right away,
    /// so late acquisitions can never leak.
    pub fn push(&mut self, teardown: Teardown) {
        if self.released {
            teardown.run();
        } else {
            self.teardowns.push(teardown);
        }
    }

    /// Move every pending teardown of `other` into this subscription
    pub fn merge(&mut self, mut other: Subscription) {
        for teardown in other.take_pending() {
            self.push(teardown);
        }
    }

    /// Number of teardowns still pending
    pub fn len(&self) -> usize {
        self.teardowns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teardowns.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Invoke every pending teardown. Safe to call any number of times.
    pub fn release(&mut self) {
        let pending = self.take_pending();
        if pending.is_empty() {
            return;
        }
        tracing::trace!(count = pending.len(), "releasing subscription");
        for teardown in pending {
            teardown.run();
        }
    }

    /// Convert into a clonable handle
    pub fn into_handle(self) -> SubscriptionHandle {
        SubscriptionHandle {
            inner: Rc::new(RefCell::new(self)),
        }
    }

    fn take_pending(&mut self) -> Pending {
        self.released = true;
        std::mem::take(&mut self.teardowns)
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.teardowns.len())
            .field("released", &self.released)
            .finish()
    }
}

/// Shared release handle
///
/// Host frameworks sometimes hold the same teardown in several places and
/// invoke it more than once. Every clone refers to the same subscription and
/// only the first `release()` has an effect. Dropping a clone does not release.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    inner: Rc<RefCell<Subscription>>,
}

impl SubscriptionHandle {
    pub fn release(&self) {
        // Teardowns run outside the borrow so they may release this handle again.
        let pending = self.inner.borrow_mut().take_pending();
        for teardown in pending {
            teardown.run();
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.borrow().is_released()
    }
}
