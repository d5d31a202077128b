//! Reactive combobox state
//!
//! Every observable field lives in one [`ReactiveGraph`]. Fields are readable
//! and writable independently; the input attribute bundle is a derived value
//! over `is_open` and `highlighted`.

use std::rc::Rc;

use kestrel_core::bus::EventBus;
use kestrel_core::reactive::{Derived, ReactiveGraph, SharedReactiveGraph, State};
use kestrel_core::subscription::Teardown;

use crate::attributes::{self, Attributes};
use crate::machine::Snapshot;
use crate::session::SessionId;

/// Observable state of one combobox
pub struct ComboState<T> {
    graph: SharedReactiveGraph,
    is_open: State<bool>,
    highlighted: State<Option<usize>>,
    item_count: State<usize>,
    filter_text: State<String>,
    selected: State<Option<T>>,
    trap_focus: State<bool>,
    input_attributes: Derived<Attributes>,
    settled: EventBus<()>,
}

impl<T: Clone + 'static> ComboState<T> {
    pub(crate) fn new(session: &SessionId) -> Self {
        let graph: SharedReactiveGraph = Rc::new(ReactiveGraph::new());

        let is_open = State::new(&graph, false);
        let highlighted = State::new(&graph, None);
        let item_count = State::new(&graph, 0usize);
        let filter_text = State::new(&graph, String::new());
        let selected = State::new(&graph, None);
        let trap_focus = State::new(&graph, false);

        let session = session.clone();
        let open_signal = is_open.signal();
        let highlight_signal = highlighted.signal();
        let input_attributes = graph.create_derived(move |g| {
            attributes::input_attributes(
                &session,
                g.get(open_signal).unwrap_or(false),
                g.get(highlight_signal).flatten(),
            )
        });

        Self {
            graph,
            is_open,
            highlighted,
            item_count,
            filter_text,
            selected,
            trap_focus,
            input_attributes,
            settled: EventBus::new(),
        }
    }

    pub fn graph(&self) -> &SharedReactiveGraph {
        &self.graph
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.is_open.get().unwrap_or(false)
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted.get().flatten()
    }

    pub fn item_count(&self) -> usize {
        self.item_count.get().unwrap_or(0)
    }

    pub fn filter_text(&self) -> String {
        self.filter_text.get().unwrap_or_default()
    }

    pub fn selected(&self) -> Option<T> {
        self.selected.get().flatten()
    }

    pub fn trap_focus(&self) -> bool {
        self.trap_focus.get_untracked().unwrap_or(false)
    }

    pub fn input_attributes(&self) -> Attributes {
        self.graph
            .get_derived(self.input_attributes)
            .unwrap_or_default()
    }

    /// Plain copy of the fields the state machine looks at
    pub fn snapshot(&self) -> Snapshot {
        self.graph.untracked(|_| Snapshot {
            is_open: self.is_open(),
            highlighted: self.highlighted(),
            item_count: self.item_count(),
            filter_text: self.filter_text(),
            trap_focus: self.trap_focus(),
        })
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Returns whether the value changed
    pub(crate) fn set_open(&self, open: bool) -> bool {
        self.is_open.set_if_changed(open)
    }

    /// Raw write; callers clamp first
    pub(crate) fn set_highlighted(&self, index: Option<usize>) -> bool {
        self.highlighted.set_if_changed(index)
    }

    pub(crate) fn set_item_count(&self, count: usize) -> bool {
        self.item_count.set_if_changed(count)
    }

    pub(crate) fn set_filter_text(&self, text: &str) -> bool {
        if self.filter_text.get_untracked().as_deref() == Some(text) {
            return false;
        }
        self.filter_text.set(text.to_string());
        true
    }

    pub(crate) fn set_selected(&self, item: T) {
        self.selected.set(Some(item));
    }

    pub(crate) fn set_trap_focus(&self, trap: bool) -> bool {
        self.trap_focus.set_if_changed(trap)
    }

    /// Apply several writes with observers notified once at the end
    pub(crate) fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.graph.batch(|_| f())
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    pub fn watch_open(&self, f: impl FnMut(bool) + 'static) -> Teardown {
        self.is_open.watch(f)
    }

    pub fn watch_highlighted(&self, f: impl FnMut(Option<usize>) + 'static) -> Teardown {
        self.highlighted.watch(f)
    }

    pub fn watch_item_count(&self, f: impl FnMut(usize) + 'static) -> Teardown {
        self.item_count.watch(f)
    }

    pub fn watch_filter_text(&self, f: impl FnMut(String) + 'static) -> Teardown {
        self.filter_text.watch(f)
    }

    pub fn watch_selected(&self, f: impl FnMut(Option<T>) + 'static) -> Teardown {
        self.selected.watch(f)
    }

    /// Observe the input attribute bundle
    pub fn watch_input_attributes(&self, mut f: impl FnMut(Attributes) + 'static) -> Teardown {
        let derived = self.input_attributes;
        let effect = self.graph.create_effect(move |g| {
            if let Some(attrs) = g.get_derived(derived) {
                f(attrs);
            }
        });
        let graph = Rc::downgrade(&self.graph);
        Teardown::new(move || {
            if let Some(graph) = graph.upgrade() {
                graph.dispose_effect(effect);
            }
        })
    }

    /// Called after each settle pass completes
    pub fn on_settled(&self, f: impl Fn() + 'static) -> Teardown {
        self.settled.subscribe(move |_| f())
    }

    pub(crate) fn notify_settled(&self) {
        self.settled.emit(&());
    }
}

impl<T> std::fmt::Debug for ComboState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComboState")
            .field("graph", &self.graph.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttrValue;
    use std::cell::RefCell;

    fn state() -> ComboState<String> {
        ComboState::new(&SessionId::explicit("st"))
    }

    #[test]
    fn test_initial_state() {
        let state = state();

        assert!(!state.is_open());
        assert_eq!(state.highlighted(), None);
        assert_eq!(state.item_count(), 0);
        assert_eq!(state.filter_text(), "");
        assert_eq!(state.selected(), None);
        assert!(!state.trap_focus());
    }

    #[test]
    fn test_fields_are_independent() {
        let state = state();

        assert!(state.set_open(true));
        assert!(!state.set_open(true));
        state.set_item_count(4);
        state.set_highlighted(Some(3));
        state.set_selected("x".to_string());

        let snapshot = state.snapshot();
        assert!(snapshot.is_open);
        assert_eq!(snapshot.highlighted, Some(3));
        assert_eq!(snapshot.item_count, 4);
        assert_eq!(state.selected().as_deref(), Some("x"));
    }

    #[test]
    fn test_input_attributes_follow_state() {
        let state = state();
        assert_eq!(
            state.input_attributes().get("aria-expanded"),
            Some(&AttrValue::Bool(false))
        );

        state.set_open(true);
        state.set_highlighted(Some(1));

        let attrs = state.input_attributes();
        assert_eq!(attrs.get("aria-expanded"), Some(&AttrValue::Bool(true)));
        assert_eq!(
            attrs.get("aria-activedescendant").and_then(AttrValue::as_str),
            Some("st-descendent-1")
        );
    }

    #[test]
    fn test_watch_batches_writes() {
        let state = state();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        let teardown = state.watch_input_attributes(move |attrs| {
            s.borrow_mut().push(attrs.contains("aria-activedescendant"));
        });
        assert_eq!(*seen.borrow(), vec![false]);

        state.batch(|| {
            state.set_open(true);
            state.set_highlighted(Some(0));
        });
        assert_eq!(*seen.borrow(), vec![false, true]);

        teardown.run();
        state.set_highlighted(None);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_filter_text_change_detection() {
        let state = state();

        assert!(!state.set_filter_text(""));
        assert!(state.set_filter_text("ap"));
        assert!(!state.set_filter_text("ap"));
        assert_eq!(state.filter_text(), "ap");
    }

    #[test]
    fn test_settled_notification() {
        let state = state();
        let count = Rc::new(std::cell::Cell::new(0));

        let c = count.clone();
        let teardown = state.on_settled(move || c.set(c.get() + 1));
        state.notify_settled();
        state.notify_settled();
        teardown.run();
        state.notify_settled();

        assert_eq!(count.get(), 2);
    }
}
