//! The combobox engine
//!
//! [`Combobox`] ties the pieces together: host events become machine
//! [`Input`]s, the resulting [`Step`]s are applied to [`ComboState`] and the
//! attached host elements, and list resyncs are deferred until the host calls
//! [`Combobox::settle`].
//!
//! Dispatch is run-to-completion. A host callback that calls back into the
//! engine (a filter that edits the collection, an input whose `focus()`
//! synchronously fires a focus event) only queues its input; it is processed
//! after the current transition has been fully applied.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use kestrel_core::bus::EventBus;
use kestrel_core::collection::Items;
use kestrel_core::events::{listen, EventTarget, EventType, KeyEvent, UiEvent};
use kestrel_core::scheduler::TaskQueue;
use kestrel_core::subscription::{Subscription, Teardown};
use tracing::{debug, trace, warn};

use crate::attributes::{self, Attributes};
use crate::config::{ComboboxConfig, FilterFn, ItemToString, SelectFn};
use crate::host::{InputElement, ItemElement, ListElement};
use crate::list::{CandidateKey, ListRegistry};
use crate::machine::{self, Input, Step};
use crate::options::ComboboxOptions;
use crate::session::SessionId;
use crate::state::ComboState;

/// Upper bound on jobs handled by one outer dispatch
///
/// Reached only when host callbacks keep feeding inputs back in a loop.
const MAX_JOBS_PER_DISPATCH: usize = 10_000;

enum Job {
    Input(Input),
    Resync,
    Settled,
}

/// Posted on the private list channel when the candidates need reindexing
struct ListUpdate;

struct Shared<T> {
    session: SessionId,
    state: ComboState<T>,
    options: ComboboxOptions,

    items: Items<T>,
    item_to_string: ItemToString<T>,
    filter: FilterFn,
    on_select: Option<SelectFn<T>>,

    registry: RefCell<ListRegistry>,
    input: RefCell<Option<Rc<dyn InputElement>>>,
    list: RefCell<Option<Rc<dyn ListElement>>>,

    tasks: TaskQueue,
    list_channel: EventBus<ListUpdate>,
    jobs: RefCell<VecDeque<Job>>,
    busy: Cell<bool>,
    resync_scheduled: Cell<bool>,
    /// Set while a focus event caused by the engine itself is expected
    programmatic_focus: Cell<bool>,

    items_watch: Option<Teardown>,
}

/// Headless combobox
///
/// Cheap to clone; clones drive the same combobox. Host callbacks that need
/// the engine should capture a [`WeakCombobox`] to avoid a reference cycle.
pub struct Combobox<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for Combobox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Non-owning handle to a [`Combobox`]
pub struct WeakCombobox<T> {
    shared: Weak<Shared<T>>,
}

impl<T> Clone for WeakCombobox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> WeakCombobox<T> {
    pub fn upgrade(&self) -> Option<Combobox<T>> {
        self.shared.upgrade().map(|shared| Combobox { shared })
    }
}

impl<T: Clone + 'static> Combobox<T> {
    pub fn new(config: ComboboxConfig<T>) -> Self {
        let ComboboxConfig {
            items,
            item_to_string,
            filter,
            on_select,
            mut options,
            session,
        } = config;
        options.page_size = options.page_size.max(1);
        let session = session.unwrap_or_else(SessionId::generate);

        let shared = Rc::new_cyclic(|weak: &Weak<Shared<T>>| {
            let weak = weak.clone();
            let items_watch = items.subscribe(move |change| {
                if let Some(shared) = weak.upgrade() {
                    trace!(len = change.len, version = change.version, "candidate collection changed");
                    shared.request_resync();
                }
            });

            Shared {
                state: ComboState::new(&session),
                session,
                options,
                items,
                item_to_string,
                filter,
                on_select,
                registry: RefCell::new(ListRegistry::new()),
                input: RefCell::new(None),
                list: RefCell::new(None),
                tasks: TaskQueue::new(),
                list_channel: EventBus::new(),
                jobs: RefCell::new(VecDeque::new()),
                busy: Cell::new(false),
                resync_scheduled: Cell::new(false),
                programmatic_focus: Cell::new(false),
                items_watch: Some(items_watch),
            }
        });

        debug!(session = %shared.session, "combobox created");
        Self { shared }
    }

    pub fn downgrade(&self) -> WeakCombobox<T> {
        WeakCombobox {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.shared.session
    }

    pub fn options(&self) -> &ComboboxOptions {
        &self.shared.options
    }

    pub fn state(&self) -> &ComboState<T> {
        &self.shared.state
    }

    // =========================================================================
    // STATE
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.shared.state.is_open()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.shared.state.highlighted()
    }

    pub fn selected(&self) -> Option<T> {
        self.shared.state.selected()
    }

    pub fn filter_text(&self) -> String {
        self.shared.state.filter_text()
    }

    pub fn item_count(&self) -> usize {
        self.shared.state.item_count()
    }

    pub fn watch_open(&self, f: impl FnMut(bool) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_open(f)])
    }

    pub fn watch_highlighted(&self, f: impl FnMut(Option<usize>) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_highlighted(f)])
    }

    pub fn watch_selected(&self, f: impl FnMut(Option<T>) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_selected(f)])
    }

    pub fn watch_filter_text(&self, f: impl FnMut(String) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_filter_text(f)])
    }

    pub fn watch_item_count(&self, f: impl FnMut(usize) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_item_count(f)])
    }

    pub fn watch_input_attributes(&self, f: impl FnMut(Attributes) + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.watch_input_attributes(f)])
    }

    /// Called after every [`settle`](Self::settle)
    pub fn on_settled(&self, f: impl Fn() + 'static) -> Subscription {
        Subscription::from_teardowns([self.shared.state.on_settled(f)])
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    pub fn input_attributes(&self) -> Attributes {
        self.shared.state.input_attributes()
    }

    pub fn trigger_attributes(&self) -> Attributes {
        attributes::trigger_attributes(&self.shared.session, self.is_open())
    }

    pub fn label_attributes(&self) -> Attributes {
        attributes::label_attributes(&self.shared.session)
    }

    pub fn list_attributes(&self) -> Attributes {
        attributes::list_attributes(&self.shared.session)
    }

    pub fn item_attributes(&self, index: usize) -> Attributes {
        attributes::item_attributes(
            &self.shared.session,
            index,
            self.highlighted() == Some(index),
        )
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub fn focus(&self) {
        self.shared.dispatch(Job::Input(Input::Focus));
    }

    pub fn blur(&self) {
        self.shared.dispatch(Job::Input(Input::Blur));
    }

    pub fn key_down(&self, event: impl Into<KeyEvent>) {
        self.shared
            .dispatch(Job::Input(Input::KeyDown(event.into())));
    }

    /// The user changed the input text to `text`
    pub fn input(&self, text: &str) {
        self.shared
            .dispatch(Job::Input(Input::TextInput(text.to_string())));
    }

    pub fn pointer_down(&self) {
        self.shared.dispatch(Job::Input(Input::PointerDown));
    }

    pub fn pointer_up(&self) {
        self.shared.dispatch(Job::Input(Input::PointerUp));
    }

    pub fn trigger_click(&self) {
        self.shared.dispatch(Job::Input(Input::TriggerClick));
    }

    pub fn item_click(&self, index: usize) {
        self.shared.dispatch(Job::Input(Input::ItemClick(index)));
    }

    pub fn item_pointer_enter(&self, index: usize) {
        self.shared
            .dispatch(Job::Input(Input::ItemPointerEnter(index)));
    }

    pub fn item_pointer_leave(&self, index: usize) {
        self.shared
            .dispatch(Job::Input(Input::ItemPointerLeave(index)));
    }

    /// Run deferred work: pending list resyncs, then the settled notification
    ///
    /// Hosts call this once they have applied the visibility changes caused
    /// by the filter callback. Returns the number of deferred tasks run.
    ///
    /// Called from inside a host callback, the resync and the notification
    /// are queued behind the running transition, in that order.
    pub fn settle(&self) -> usize {
        let ran = self.shared.tasks.run_pending();
        trace!(ran, "settled");
        self.shared.dispatch(Job::Settled);
        ran
    }

    /// Whether deferred work is waiting for [`settle`](Self::settle)
    pub fn has_pending(&self) -> bool {
        !self.shared.tasks.is_empty()
    }

    /// Candidate elements currently attached, indexed or not
    pub fn attached_candidates(&self) -> usize {
        self.shared.registry.borrow().attached_count()
    }

    // =========================================================================
    // ATTACHMENT
    // =========================================================================

    /// Bind the text input
    ///
    /// Focus, blur, keydown and input events drive the machine. The engine
    /// focuses, blurs and writes the value of the input in return.
    pub fn attach_input(&self, input: Rc<dyn InputElement>) -> Subscription {
        let previous = self.shared.input.replace(Some(input.clone()));
        if previous.is_some() {
            warn!(session = %self.shared.session, "replacing attached input element");
        }

        let key = element_key(&input);
        let weak = Rc::downgrade(&self.shared);
        let unbind = Teardown::new(move || {
            if let Some(shared) = weak.upgrade() {
                let mut slot = shared.input.borrow_mut();
                if slot.as_ref().map(element_key) == Some(key) {
                    *slot = None;
                }
            }
        });

        Subscription::from_teardowns([
            listen(&*input, EventType::Focus, self.forward(|_| Some(Input::Focus))),
            listen(&*input, EventType::Blur, self.forward(|_| Some(Input::Blur))),
            listen(
                &*input,
                EventType::KeyDown,
                self.forward(|event| match event {
                    UiEvent::KeyDown(key) => Some(Input::KeyDown(key.clone())),
                    _ => None,
                }),
            ),
            listen(
                &*input,
                EventType::Input,
                self.forward(|event| match event {
                    UiEvent::Input(text) => Some(Input::TextInput(text.clone())),
                    _ => None,
                }),
            ),
            unbind,
        ])
    }

    /// Bind the optional toggle button next to the input
    pub fn attach_trigger(&self, trigger: &(impl EventTarget + ?Sized)) -> Subscription {
        Subscription::from_teardowns([
            listen(trigger, EventType::PointerDown, self.forward(|_| Some(Input::PointerDown))),
            listen(trigger, EventType::PointerUp, self.forward(|_| Some(Input::PointerUp))),
            listen(trigger, EventType::Click, self.forward(|_| Some(Input::TriggerClick))),
        ])
    }

    /// Register a candidate element
    ///
    /// The candidate gets an index at the next resync, if the list reports
    /// it as visible. Releasing the subscription unregisters it.
    pub fn attach_item(&self, item: Rc<dyn ItemElement>) -> Subscription {
        let (key, first) = self.shared.registry.borrow_mut().attach(&item);
        if !first {
            warn!(session = %self.shared.session, "candidate attached twice");
        }
        self.shared.request_resync();

        let weak = Rc::downgrade(&self.shared);
        let unregister = Teardown::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.registry.borrow_mut().detach(key);
                shared.request_resync();
            }
        });

        Subscription::from_teardowns([
            listen(&*item, EventType::PointerEnter, self.forward_item(key, Input::ItemPointerEnter)),
            listen(&*item, EventType::PointerLeave, self.forward_item(key, Input::ItemPointerLeave)),
            listen(&*item, EventType::PointerDown, self.forward(|_| Some(Input::PointerDown))),
            listen(&*item, EventType::PointerUp, self.forward(|_| Some(Input::PointerUp))),
            listen(&*item, EventType::Click, self.forward_item(key, Input::ItemClick)),
            unregister,
        ])
    }

    /// Bind the list container and index its candidates right away
    ///
    /// Releasing the subscription unindexes every candidate.
    pub fn attach_list(&self, list: Rc<dyn ListElement>) -> Subscription {
        let previous = self.shared.list.replace(Some(list.clone()));
        if previous.is_some() {
            warn!(session = %self.shared.session, "replacing attached list element");
        }

        let weak = Rc::downgrade(&self.shared);
        let updates = self.shared.list_channel.subscribe(move |_: &ListUpdate| {
            if let Some(shared) = weak.upgrade() {
                shared.dispatch(Job::Resync);
            }
        });

        let key = Rc::as_ptr(&list) as *const () as usize;
        let weak = Rc::downgrade(&self.shared);
        let unbind = Teardown::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let unbound = {
                let mut slot = shared.list.borrow_mut();
                let current = slot.as_ref().map(|l| Rc::as_ptr(l) as *const () as usize);
                current == Some(key) && slot.take().is_some()
            };
            if unbound {
                shared.dispatch(Job::Resync);
            }
        });

        self.shared.dispatch(Job::Resync);
        Subscription::from_teardowns([updates, unbind])
    }

    /// Bind the document so a pointer-up anywhere releases the focus trap
    pub fn attach_document(&self, document: &(impl EventTarget + ?Sized)) -> Subscription {
        Subscription::from_teardowns([listen(
            document,
            EventType::PointerUp,
            self.forward(|_| Some(Input::PointerUp)),
        )])
    }

    fn forward(
        &self,
        map: impl Fn(&UiEvent) -> Option<Input> + 'static,
    ) -> impl Fn(&UiEvent) + 'static {
        let weak = Rc::downgrade(&self.shared);
        move |event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Some(input) = map(event) {
                shared.dispatch(Job::Input(input));
            }
        }
    }

    /// Forward an event on a candidate with its current index
    fn forward_item(
        &self,
        key: CandidateKey,
        make: fn(usize) -> Input,
    ) -> impl Fn(&UiEvent) + 'static {
        let weak = Rc::downgrade(&self.shared);
        move |_| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let index = shared.registry.borrow().index_of(key);
            match index {
                Some(index) => shared.dispatch(Job::Input(make(index))),
                None => trace!("event on unindexed candidate ignored"),
            }
        }
    }
}

fn element_key(input: &Rc<dyn InputElement>) -> usize {
    Rc::as_ptr(input) as *const () as usize
}

impl<T: Clone + 'static> Shared<T> {
    fn dispatch(self: &Rc<Self>, job: Job) {
        self.jobs.borrow_mut().push_back(job);
        if self.busy.replace(true) {
            trace!("queued re-entrant job");
            return;
        }

        let mut handled = 0;
        loop {
            let next = self.jobs.borrow_mut().pop_front();
            let Some(job) = next else {
                break;
            };
            handled += 1;
            if handled > MAX_JOBS_PER_DISPATCH {
                let dropped = self.jobs.borrow().len() + 1;
                self.jobs.borrow_mut().clear();
                warn!(dropped, "re-entrant job limit reached, dropping queued jobs");
                break;
            }
            match job {
                Job::Input(input) => self.handle(input),
                Job::Resync => self.resync(),
                Job::Settled => self.state.notify_settled(),
            }
        }

        self.busy.set(false);
    }

    fn handle(self: &Rc<Self>, input: Input) {
        match input {
            Input::Focus if self.programmatic_focus.replace(false) => {
                trace!("focus caused by the engine, not reopening");
                return;
            }
            Input::Blur => self.programmatic_focus.set(false),
            _ => {}
        }

        let snapshot = self.state.snapshot();
        let steps = machine::transition(&snapshot, &input, &self.options);
        trace!(?input, ?steps, "transition");

        self.state.batch(|| {
            for step in steps {
                self.apply(step);
            }
        });
    }

    fn apply(self: &Rc<Self>, step: Step) {
        match step {
            Step::Open => {
                if self.state.set_open(true) {
                    debug!(session = %self.session, "menu opened");
                    self.request_resync();
                }
            }
            Step::Close => self.close(),
            Step::SetHighlight(index) => self.set_highlight(index),
            Step::Commit(index) => self.commit(index),
            Step::Filter(text) => self.apply_filter(&text),
            Step::FocusInput => {
                if let Some(input) = self.input() {
                    self.programmatic_focus.set(true);
                    input.focus();
                }
            }
            Step::BlurInput => {
                if let Some(input) = self.input() {
                    input.blur();
                }
            }
            Step::ClearInput => {
                if let Some(input) = self.input() {
                    input.set_value("");
                }
            }
            Step::SetTrapFocus(trap) => {
                if self.state.set_trap_focus(trap) {
                    trace!(trap, "focus trap");
                }
            }
        }
    }

    fn input(&self) -> Option<Rc<dyn InputElement>> {
        self.input.borrow().clone()
    }

    fn close(&self) {
        if self.state.set_open(false) {
            debug!(session = %self.session, "menu closed");
        }
        self.set_highlight(None);
    }

    /// The only writer of the highlight
    ///
    /// Clamps to the indexed candidates, moves the marker and scrolls the
    /// new candidate into view while open.
    fn set_highlight(&self, index: Option<usize>) {
        let index = index.filter(|&i| i < self.state.item_count());
        let changed = self.state.set_highlighted(index);
        let change = self.registry.borrow_mut().mark(index);

        if let Some(element) = &change.unmark {
            element.set_highlighted(false);
        }
        if let Some(element) = &change.mark {
            element.set_highlighted(true);
        }

        if (changed || change.mark.is_some()) && self.state.is_open() {
            let target = index.and_then(|i| self.registry.borrow().element(i));
            if let Some(element) = target {
                element.scroll_into_view(self.options.scroll_alignment);
            }
        }
    }

    fn commit(self: &Rc<Self>, index: usize) {
        let Some(item) = self.items.get(index) else {
            debug!(index, "no candidate at index, nothing committed");
            return;
        };
        let text = (self.item_to_string)(&item);

        self.state.set_selected(item.clone());
        if let Some(on_select) = &self.on_select {
            on_select(&item);
        }
        self.apply_filter(&text);
        if let Some(input) = self.input() {
            input.set_value(&text);
        }
        debug!(session = %self.session, index, text = %text, "committed selection");
    }

    fn apply_filter(self: &Rc<Self>, text: &str) {
        self.state.set_filter_text(text);
        (self.filter)(text);
        self.request_resync();
    }

    /// Schedule a resync for the next settle; repeated requests coalesce
    fn request_resync(self: &Rc<Self>) {
        if self.resync_scheduled.replace(true) {
            return;
        }
        let weak = Rc::downgrade(self);
        self.tasks.post(move || {
            if let Some(shared) = weak.upgrade() {
                shared.resync_scheduled.set(false);
                shared.list_channel.emit(&ListUpdate);
            }
        });
    }

    fn resync(&self) {
        let list = self.list.borrow().clone();
        let visible = list
            .map(|list| list.visible_candidates())
            .unwrap_or_default();
        let outcome = self.registry.borrow_mut().resync(
            visible,
            self.state.highlighted(),
            self.options.highlight_policy,
        );

        for (index, element) in outcome.assignments.iter().enumerate() {
            element.set_position(index, &self.session.descendant_id(index));
        }

        self.state.batch(|| {
            self.state.set_item_count(outcome.item_count());
            self.set_highlight(outcome.highlight);
        });
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(teardown) = self.items_watch.take() {
            teardown.run();
        }
        trace!(session = %self.session, "combobox dropped");
    }
}

impl<T> fmt::Debug for Combobox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combobox")
            .field("session", &self.shared.session)
            .field("options", &self.shared.options)
            .field("registry", &self.shared.registry)
            .finish_non_exhaustive()
    }
}
