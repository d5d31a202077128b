//! Fake host elements for driving a combobox without a UI toolkit

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kestrel_combobox::{
    Combobox, ComboboxConfig, ComboboxOptions, InputElement, ItemElement, ListElement,
    ScrollAlignment, SessionId,
};
use kestrel_core::events::{EventListeners, EventTarget, EventType, Key, KeyEvent, Listener, UiEvent};
use kestrel_core::{Items, Subscription, Teardown};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// INPUT
// =============================================================================

/// Text input that fires focus/blur synchronously, like the DOM
#[derive(Default)]
pub struct FakeInput {
    pub events: EventListeners,
    value: RefCell<String>,
    focused: Cell<bool>,
}

impl FakeInput {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn value(&self) -> String {
        self.value.borrow().clone()
    }

    pub fn is_focused(&self) -> bool {
        self.focused.get()
    }

    /// The user tabs or clicks into the input
    pub fn user_focus(&self) {
        self.focus();
    }

    /// The user moves focus elsewhere
    pub fn user_blur(&self) {
        self.blur();
    }

    pub fn press(&self, key: impl Into<KeyEvent>) {
        self.events.dispatch(&UiEvent::KeyDown(key.into()));
    }

    /// Keydown for the last character followed by the input event
    pub fn type_text(&self, text: &str) {
        if let Some(c) = text.chars().last() {
            self.press(Key::Character(c));
        }
        self.edit(text);
    }

    /// Replace the text without a keydown (paste, cut)
    pub fn edit(&self, text: &str) {
        *self.value.borrow_mut() = text.to_string();
        self.events.dispatch(&UiEvent::Input(text.to_string()));
    }
}

impl EventTarget for FakeInput {
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Teardown {
        self.events.add_listener(event_type, listener)
    }
}

impl InputElement for FakeInput {
    fn focus(&self) {
        if !self.focused.replace(true) {
            self.events.dispatch(&UiEvent::Focus);
        }
    }

    fn blur(&self) {
        if self.focused.replace(false) {
            self.events.dispatch(&UiEvent::Blur);
        }
    }

    fn set_value(&self, value: &str) {
        *self.value.borrow_mut() = value.to_string();
    }
}

// =============================================================================
// CANDIDATES
// =============================================================================

pub struct FakeItem {
    pub label: String,
    pub events: EventListeners,
    visible: Cell<bool>,
    index: Cell<Option<usize>>,
    id: RefCell<String>,
    highlighted: Cell<bool>,
    scrolls: RefCell<Vec<ScrollAlignment>>,
}

impl FakeItem {
    pub fn new(label: &str) -> Rc<Self> {
        Rc::new(Self {
            label: label.to_string(),
            events: EventListeners::new(),
            visible: Cell::new(true),
            index: Cell::new(None),
            id: RefCell::new(String::new()),
            highlighted: Cell::new(false),
            scrolls: RefCell::new(Vec::new()),
        })
    }

    pub fn index(&self) -> Option<usize> {
        self.index.get()
    }

    pub fn id(&self) -> String {
        self.id.borrow().clone()
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted.get()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    pub fn scrolls(&self) -> Vec<ScrollAlignment> {
        self.scrolls.borrow().clone()
    }

    pub fn hover(&self) {
        self.events.dispatch(&UiEvent::PointerEnter);
    }

    pub fn unhover(&self) {
        self.events.dispatch(&UiEvent::PointerLeave);
    }

    /// Full pointer click: down, up, click
    pub fn click(&self) {
        self.events.dispatch(&UiEvent::PointerDown);
        self.events.dispatch(&UiEvent::PointerUp);
        self.events.dispatch(&UiEvent::Click);
    }
}

impl EventTarget for FakeItem {
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Teardown {
        self.events.add_listener(event_type, listener)
    }
}

impl ItemElement for FakeItem {
    fn set_position(&self, index: usize, id: &str) {
        self.index.set(Some(index));
        *self.id.borrow_mut() = id.to_string();
    }

    fn set_highlighted(&self, highlighted: bool) {
        self.highlighted.set(highlighted);
    }

    fn scroll_into_view(&self, alignment: ScrollAlignment) {
        self.scrolls.borrow_mut().push(alignment);
    }
}

/// List container reporting the visible candidates in order
#[derive(Default)]
pub struct FakeList {
    items: RefCell<Vec<Rc<FakeItem>>>,
}

impl FakeList {
    pub fn new(items: Vec<Rc<FakeItem>>) -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(items),
        })
    }

    pub fn items(&self) -> Vec<Rc<FakeItem>> {
        self.items.borrow().clone()
    }

    /// Show only candidates whose label contains `text`
    pub fn apply_filter(&self, text: &str) {
        for item in self.items.borrow().iter() {
            item.set_visible(item.label.contains(text));
        }
    }
}

impl ListElement for FakeList {
    fn visible_candidates(&self) -> Vec<Rc<dyn ItemElement>> {
        self.items
            .borrow()
            .iter()
            .filter(|item| item.is_visible())
            .map(|item| item.clone() as Rc<dyn ItemElement>)
            .collect()
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A fully wired combobox over string candidates
///
/// The filter keeps candidates whose label contains the typed text, both in
/// the collection and in the rendered list.
pub struct Harness {
    pub combobox: Combobox<String>,
    pub items: Items<String>,
    pub input: Rc<FakeInput>,
    pub trigger: EventListeners,
    pub document: EventListeners,
    pub list: Rc<FakeList>,
    pub filter_calls: Rc<RefCell<Vec<String>>>,
    pub selections: Rc<RefCell<Vec<String>>>,
    pub subscriptions: Vec<Subscription>,
}

impl Harness {
    pub fn new(labels: &[&str]) -> Self {
        Self::with_options(labels, ComboboxOptions::default())
    }

    pub fn with_options(labels: &[&str], options: ComboboxOptions) -> Self {
        init_tracing();

        let all: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let items = Items::new(all.clone());
        let list = FakeList::new(labels.iter().map(|l| FakeItem::new(l)).collect());
        let filter_calls = Rc::new(RefCell::new(Vec::new()));
        let selections = Rc::new(RefCell::new(Vec::new()));

        let filter = {
            let items = items.clone();
            let list = list.clone();
            let calls = filter_calls.clone();
            move |text: &str| {
                calls.borrow_mut().push(text.to_string());
                items.set(all.iter().filter(|l| l.contains(text)).cloned().collect());
                list.apply_filter(text);
            }
        };
        let on_select = {
            let selections = selections.clone();
            move |item: &String| selections.borrow_mut().push(item.clone())
        };

        let combobox = ComboboxConfig::new(items.clone(), |item: &String| item.clone(), filter)
            .on_select(on_select)
            .options(options)
            .session(SessionId::explicit("cb"))
            .build();

        let input = FakeInput::new();
        let trigger = EventListeners::new();
        let document = EventListeners::new();

        let mut subscriptions = vec![
            combobox.attach_input(input.clone()),
            combobox.attach_trigger(&trigger),
            combobox.attach_document(&document),
        ];
        for item in list.items() {
            subscriptions.push(combobox.attach_item(item));
        }
        subscriptions.push(combobox.attach_list(list.clone()));
        combobox.settle();

        Self {
            combobox,
            items,
            input,
            trigger,
            document,
            list,
            filter_calls,
            selections,
            subscriptions,
        }
    }

    pub fn item(&self, label: &str) -> Rc<FakeItem> {
        self.list
            .items()
            .into_iter()
            .find(|item| item.label == label)
            .expect("no such candidate")
    }

    /// Labels of the candidates currently showing the highlight marker
    pub fn marked(&self) -> Vec<String> {
        self.list
            .items()
            .iter()
            .filter(|item| item.is_highlighted())
            .map(|item| item.label.clone())
            .collect()
    }

    pub fn settle(&self) -> usize {
        self.combobox.settle()
    }

    /// Click the trigger the way a browser delivers it
    ///
    /// Pressing the trigger takes focus away from the input before the click.
    pub fn click_trigger(&self) {
        self.trigger.dispatch(&UiEvent::PointerDown);
        self.input.user_blur();
        self.trigger.dispatch(&UiEvent::PointerUp);
        self.document.dispatch(&UiEvent::PointerUp);
        self.trigger.dispatch(&UiEvent::Click);
    }
}
