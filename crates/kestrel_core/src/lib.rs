//! Kestrel Core Runtime
//!
//! Foundational primitives for Kestrel's headless UI components:
//!
//! - **Reactive Signals**: fine-grained signals, derived values and effects
//! - **Subscriptions**: scoped acquisition and exactly-once release of side effects
//! - **Event Channels**: per-instance broadcast buses, no global event wiring
//! - **Event Vocabulary**: keys, pointer and focus events and the targets that emit them
//! - **Observable Collections**: externally-owned lists components can react to
//! - **Task Queue**: deferred work drained at a host-controlled checkpoint
//!
//! Everything here is single-threaded; handles use `Rc` and `RefCell`.
//!
//! # Example
//!
//! ```rust
//! use kestrel_core::reactive::ReactiveGraph;
//!
//! let graph = ReactiveGraph::new();
//!
//! let open = graph.create_signal(false);
//! let expanded = graph.create_derived(move |g| {
//!     if g.get(open).unwrap_or(false) { "true" } else { "false" }
//! });
//!
//! let _effect = graph.create_effect(move |g| {
//!     tracing::trace!(expanded = ?g.get_derived(expanded), "menu state");
//! });
//!
//! graph.set(open, true);
//! assert_eq!(graph.get_derived(expanded), Some("true"));
//! ```

pub mod bus;
pub mod collection;
pub mod events;
pub mod reactive;
pub mod scheduler;
pub mod subscription;

pub use bus::{EventBus, ListenerId};
pub use collection::{Items, ItemsChanged};
pub use events::{
    listen, EventListeners, EventTarget, EventType, Key, KeyEvent, Listener, Modifiers, UiEvent,
};
pub use reactive::{
    Derived, DerivedId, Effect, EffectId, ReactiveGraph, ReactiveStats, SharedReactiveGraph,
    Signal, SignalId, State,
};
pub use scheduler::TaskQueue;
pub use subscription::{Subscription, SubscriptionHandle, Teardown};
