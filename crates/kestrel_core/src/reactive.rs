//! Signals, derived values and effects
//!
//! Writes push invalidations; reads pull:
//! - A signal write marks every derived value and effect that read it
//! - Derived values recompute on the next read after an invalidation
//! - Effects are queued and batched, and run after the writes that
//!   invalidated them
//!
//! The graph is single-threaded and every method takes `&self`. Closures are
//! taken out of their node while they run, so an effect may read and write
//! signals of the same graph without re-borrowing it mutably.
//!
//! # Example
//!
//! ```rust
//! use kestrel_core::reactive::ReactiveGraph;
//!
//! let graph = ReactiveGraph::new();
//! let item_count = graph.create_signal(4usize);
//! let last = graph.create_derived(move |g| g.get(item_count).unwrap_or(0).checked_sub(1));
//!
//! graph.set(item_count, 0);
//! assert_eq!(graph.get_derived(last), Some(None));
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::subscription::Teardown;

new_key_type! {
    /// Key of a signal node
    pub struct SignalId;
    /// Key of a derived node
    pub struct DerivedId;
    /// Key of an effect node
    pub struct EffectId;
}

/// Who gets invalidated when a signal changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubscriberId {
    Derived(DerivedId),
    Effect(EffectId),
}

type Deps = SmallVec<[SignalId; 4]>;

/// Typed handle to a signal (`Copy`)
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> Signal<T> {
    pub fn id(&self) -> SignalId {
        self.id
    }
}

/// Typed handle to a derived value (`Copy`)
#[derive(Debug)]
pub struct Derived<T> {
    id: DerivedId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Derived<T> {}

impl<T> Derived<T> {
    pub fn id(&self) -> DerivedId {
        self.id
    }
}

/// An effect handle
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    id: EffectId,
}

impl Effect {
    pub fn id(&self) -> EffectId {
        self.id
    }
}

struct SignalNode {
    value: Box<dyn Any>,
    /// Bumped on every write
    version: u64,
    subscribers: SmallVec<[SubscriberId; 4]>,
}

type ComputeFn = Rc<dyn Fn(&ReactiveGraph) -> Box<dyn Any>>;

struct DerivedNode {
    value: Option<Box<dyn Any>>,
    compute: ComputeFn,
    /// Signals read during the last computation
    dependencies: Deps,
    dirty: bool,
}

struct EffectNode {
    /// `None` while the effect is running
    run: Option<Box<dyn FnMut(&ReactiveGraph)>>,
    dependencies: Deps,
    dirty: bool,
}

/// Owner of every signal, derived value and effect of one component
pub struct ReactiveGraph {
    signals: RefCell<SlotMap<SignalId, SignalNode>>,
    derived: RefCell<SlotMap<DerivedId, DerivedNode>>,
    effects: RefCell<SlotMap<EffectId, EffectNode>>,
    pending_effects: RefCell<VecDeque<EffectId>>,
    /// Nesting depth of open batches
    batch_depth: Cell<u32>,
    flushing: Cell<bool>,
    /// Stack of dependency frames, one per running computation
    tracking: RefCell<Vec<Deps>>,
    global_version: Cell<u64>,
}

impl ReactiveGraph {
    pub fn new() -> Self {
        Self {
            signals: RefCell::new(SlotMap::with_key()),
            derived: RefCell::new(SlotMap::with_key()),
            effects: RefCell::new(SlotMap::with_key()),
            pending_effects: RefCell::new(VecDeque::new()),
            batch_depth: Cell::new(0),
            flushing: Cell::new(false),
            tracking: RefCell::new(Vec::new()),
            global_version: Cell::new(0),
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Allocate a signal holding `initial`
    pub fn create_signal<T: 'static>(&self, initial: T) -> Signal<T> {
        let id = self.signals.borrow_mut().insert(SignalNode {
            value: Box::new(initial),
            version: 0,
            subscribers: SmallVec::new(),
        });
        Signal {
            id,
            _marker: PhantomData,
        }
    }

    /// Read a signal
    ///
    /// Inside an effect or derived computation the signal is recorded as a
    /// dependency.
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.track(signal.id);
        self.get_untracked(signal)
    }

    /// Read a signal without recording a dependency
    pub fn get_untracked<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals
            .borrow()
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Write a signal and invalidate its readers
    pub fn set<T: 'static>(&self, signal: Signal<T>, value: T) {
        let subscribers = {
            let mut signals = self.signals.borrow_mut();
            let Some(node) = signals.get_mut(signal.id) else {
                return;
            };
            node.value = Box::new(value);
            node.version += 1;
            node.subscribers.clone()
        };
        self.global_version.set(self.global_version.get() + 1);

        for sub in subscribers {
            self.mark_dirty(sub);
        }

        if self.batch_depth.get() == 0 {
            self.flush_effects();
        }
    }

    /// Set the value only if it differs from the current one
    ///
    /// Returns whether a write happened.
    pub fn set_if_changed<T: Clone + PartialEq + 'static>(
        &self,
        signal: Signal<T>,
        value: T,
    ) -> bool {
        if self.get_untracked(signal).as_ref() == Some(&value) {
            return false;
        }
        self.set(signal, value);
        true
    }

    /// Write `f(current)`
    pub fn update<T: Clone + 'static, F: FnOnce(T) -> T>(&self, signal: Signal<T>, f: F) {
        if let Some(current) = self.get_untracked(signal) {
            self.set(signal, f(current));
        }
    }

    /// Number of writes so far
    pub fn signal_version(&self, id: SignalId) -> Option<u64> {
        self.signals.borrow().get(id).map(|n| n.version)
    }

    // =========================================================================
    // DERIVED VALUES
    // =========================================================================

    /// Register a lazily computed value
    pub fn create_derived<T, F>(&self, compute: F) -> Derived<T>
    where
        T: Clone + 'static,
        F: Fn(&ReactiveGraph) -> T + 'static,
    {
        let compute: ComputeFn =
            Rc::new(move |graph: &ReactiveGraph| -> Box<dyn Any> { Box::new(compute(graph)) });

        let id = self.derived.borrow_mut().insert(DerivedNode {
            value: None,
            compute,
            dependencies: SmallVec::new(),
            dirty: true,
        });

        Derived {
            id,
            _marker: PhantomData,
        }
    }

    /// Read a derived value, recomputing it if invalidated
    ///
    /// When read from inside an effect, the effect subscribes to every signal
    /// the derived value depends on.
    pub fn get_derived<T: Clone + 'static>(&self, derived: Derived<T>) -> Option<T> {
        let cached = {
            let nodes = self.derived.borrow();
            let node = nodes.get(derived.id)?;
            match (&node.value, node.dirty) {
                (Some(value), false) => Some((
                    value.downcast_ref::<T>().cloned(),
                    node.dependencies.clone(),
                )),
                _ => None,
            }
        };
        if let Some((value, deps)) = cached {
            self.track_all(&deps);
            return value;
        }

        let compute = self.derived.borrow().get(derived.id)?.compute.clone();

        self.tracking.borrow_mut().push(SmallVec::new());
        let value = compute(self);
        let deps = self.tracking.borrow_mut().pop().unwrap_or_default();

        let result = value.downcast_ref::<T>().cloned();
        let old_deps = {
            let mut nodes = self.derived.borrow_mut();
            let node = nodes.get_mut(derived.id)?;
            node.value = Some(value);
            node.dirty = false;
            std::mem::replace(&mut node.dependencies, deps.clone())
        };
        self.resubscribe(SubscriberId::Derived(derived.id), &old_deps, &deps);
        self.track_all(&deps);
        result
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    /// Create an effect that runs now and again whenever its dependencies change
    pub fn create_effect<F>(&self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + 'static,
    {
        let id = self.effects.borrow_mut().insert(EffectNode {
            run: Some(Box::new(run)),
            dependencies: SmallVec::new(),
            dirty: true,
        });

        self.pending_effects.borrow_mut().push_back(id);

        if self.batch_depth.get() == 0 {
            self.flush_effects();
        }

        Effect { id }
    }

    /// Remove an effect and its subscriptions
    pub fn dispose_effect(&self, effect: Effect) {
        let node = self.effects.borrow_mut().remove(effect.id);
        if let Some(node) = node {
            self.resubscribe(SubscriberId::Effect(effect.id), &node.dependencies, &[]);
        }
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Open a batch; effects wait for the outermost `batch_end`
    pub fn batch_start(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// Close a batch, flushing effects if it was the outermost
    pub fn batch_end(&self) {
        let depth = self.batch_depth.get();
        if depth > 0 {
            self.batch_depth.set(depth - 1);
            if depth == 1 {
                self.flush_effects();
            }
        }
    }

    /// Run `f` inside a batch
    pub fn batch<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Self) -> R,
    {
        self.batch_start();
        let result = f(self);
        self.batch_end();
        result
    }

    /// Run `f` without recording dependencies for the current computation
    pub fn untracked<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.tracking.borrow_mut().push(SmallVec::new());
        let result = f(self);
        self.tracking.borrow_mut().pop();
        result
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn track(&self, id: SignalId) {
        if let Some(frame) = self.tracking.borrow_mut().last_mut() {
            if !frame.contains(&id) {
                frame.push(id);
            }
        }
    }

    fn track_all(&self, ids: &[SignalId]) {
        for &id in ids {
            self.track(id);
        }
    }

    fn resubscribe(&self, sub: SubscriberId, old: &[SignalId], new: &[SignalId]) {
        let mut signals = self.signals.borrow_mut();
        for &dep in old {
            if let Some(node) = signals.get_mut(dep) {
                node.subscribers.retain(|s| *s != sub);
            }
        }
        for &dep in new {
            if let Some(node) = signals.get_mut(dep) {
                if !node.subscribers.contains(&sub) {
                    node.subscribers.push(sub);
                }
            }
        }
    }

    fn mark_dirty(&self, sub: SubscriberId) {
        match sub {
            SubscriberId::Derived(id) => {
                if let Some(node) = self.derived.borrow_mut().get_mut(id) {
                    node.dirty = true;
                }
            }
            SubscriberId::Effect(id) => {
                if let Some(node) = self.effects.borrow_mut().get_mut(id) {
                    if !node.dirty {
                        node.dirty = true;
                        self.pending_effects.borrow_mut().push_back(id);
                    }
                }
            }
        }
    }

    /// Run queued effects
    ///
    /// Effects queued while flushing are picked up by the same loop.
    fn flush_effects(&self) {
        if self.flushing.replace(true) {
            return;
        }
        loop {
            let next = self.pending_effects.borrow_mut().pop_front();
            let Some(id) = next else {
                break;
            };
            self.run_effect(id);
        }
        self.flushing.set(false);
    }

    fn run_effect(&self, id: EffectId) {
        let run = {
            let mut effects = self.effects.borrow_mut();
            let Some(node) = effects.get_mut(id) else {
                return;
            };
            if !node.dirty {
                return;
            }
            node.dirty = false;
            node.run.take()
        };
        let Some(mut run) = run else {
            return;
        };

        self.tracking.borrow_mut().push(SmallVec::new());
        run(self);
        let deps = self.tracking.borrow_mut().pop().unwrap_or_default();

        let old_deps = {
            let mut effects = self.effects.borrow_mut();
            // Disposed while running
            let Some(node) = effects.get_mut(id) else {
                return;
            };
            node.run = Some(run);
            std::mem::replace(&mut node.dependencies, deps.clone())
        };
        self.resubscribe(SubscriberId::Effect(id), &old_deps, &deps);
    }

    /// Node counts for diagnostics
    pub fn stats(&self) -> ReactiveStats {
        ReactiveStats {
            signal_count: self.signals.borrow().len(),
            derived_count: self.derived.borrow().len(),
            effect_count: self.effects.borrow().len(),
            pending_effects: self.pending_effects.borrow().len(),
            global_version: self.global_version.get(),
        }
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Node counts of a [`ReactiveGraph`]
#[derive(Debug, Clone)]
pub struct ReactiveStats {
    pub signal_count: usize,
    pub derived_count: usize,
    pub effect_count: usize,
    pub pending_effects: usize,
    pub global_version: u64,
}

// =============================================================================
// STATE - bound signal handle
// =============================================================================

/// Shared reactive graph
pub type SharedReactiveGraph = Rc<ReactiveGraph>;

/// A signal bundled with its graph
///
/// Wraps a signal together with the graph it lives in.
pub struct State<T> {
    signal: Signal<T>,
    graph: SharedReactiveGraph,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal,
            graph: self.graph.clone(),
        }
    }
}

impl<T: Clone + 'static> State<T> {
    /// Create a new signal in `graph` and bind it
    pub fn new(graph: &SharedReactiveGraph, initial: T) -> Self {
        Self {
            signal: graph.create_signal(initial),
            graph: graph.clone(),
        }
    }

    /// Current value, tracked when read inside an effect
    pub fn get(&self) -> Option<T> {
        self.graph.get(self.signal)
    }

    pub fn get_untracked(&self) -> Option<T> {
        self.graph.get_untracked(self.signal)
    }

    pub fn set(&self, value: T) {
        self.graph.set(self.signal, value);
    }

    pub fn update(&self, f: impl FnOnce(T) -> T) {
        self.graph.update(self.signal, f);
    }

    /// Observe the value
    ///
    /// `f` is called with the current value right away and again after every
    /// write. The returned teardown disposes the observer.
    pub fn watch(&self, mut f: impl FnMut(T) + 'static) -> Teardown {
        let signal = self.signal;
        let effect = self.graph.create_effect(move |g| {
            if let Some(value) = g.get(signal) {
                f(value);
            }
        });
        let graph: Weak<ReactiveGraph> = Rc::downgrade(&self.graph);
        Teardown::new(move || {
            if let Some(graph) = graph.upgrade() {
                graph.dispose_effect(effect);
            }
        })
    }

    pub fn signal(&self) -> Signal<T> {
        self.signal
    }
}

impl<T: Clone + PartialEq + 'static> State<T> {
    /// Write only if the value changed; returns whether it did
    pub fn set_if_changed(&self, value: T) -> bool {
        self.graph.set_if_changed(self.signal, value)
    }
}
