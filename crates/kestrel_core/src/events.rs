//! UI event vocabulary and event targets
//!
//! Hosts translate their native input (DOM events, winit, a terminal) into
//! [`UiEvent`]s and deliver them through an [`EventTarget`]. Components attach
//! to targets with [`EventTarget::add_listener`], which hands back the
//! [`Teardown`] for the listener.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::bus::EventBus;
use crate::subscription::Teardown;

/// A logical key, following the DOM `KeyboardEvent.key` names
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Character(char),
    ArrowDown,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Escape,
    Enter,
    Backspace,
    Delete,
    Tab,
    Shift,
    CapsLock,
    Control,
    Alt,
    Meta,
    /// F1..F24
    Function(u8),
    /// Any other named key
    Named(String),
}

impl Key {
    /// Parse a DOM key name (`"ArrowDown"`, `"a"`, `"F5"`...)
    pub fn from_name(name: &str) -> Key {
        match name {
            "ArrowDown" => Key::ArrowDown,
            "ArrowUp" => Key::ArrowUp,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "Escape" | "Esc" => Key::Escape,
            "Enter" => Key::Enter,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Tab" => Key::Tab,
            "Shift" => Key::Shift,
            "CapsLock" => Key::CapsLock,
            "Control" => Key::Control,
            "Alt" => Key::Alt,
            "Meta" => Key::Meta,
            _ => {
                let mut chars = name.chars();
                if let (Some(c), None) = (chars.next(), chars.next()) {
                    return Key::Character(c);
                }
                match name.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                    Some(n @ 1..=24) => Key::Function(n),
                    _ => Key::Named(name.to_string()),
                }
            }
        }
    }

    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Key::Shift | Key::CapsLock | Key::Control | Key::Alt | Key::Meta
        )
    }
}

/// Modifier keys held during a key event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS, Win on Windows
    pub meta: bool,
}

/// A key press
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        KeyEvent::new(key)
    }
}

/// Event kinds a listener can register for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    Focus,
    Blur,
    KeyDown,
    Input,
    PointerDown,
    PointerUp,
    PointerEnter,
    PointerLeave,
    Click,
}

/// An event delivered by the host
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Focus,
    Blur,
    KeyDown(KeyEvent),
    /// The text of an input after the user edited it
    Input(String),
    PointerDown,
    PointerUp,
    PointerEnter,
    PointerLeave,
    Click,
}

impl UiEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            UiEvent::Focus => EventType::Focus,
            UiEvent::Blur => EventType::Blur,
            UiEvent::KeyDown(_) => EventType::KeyDown,
            UiEvent::Input(_) => EventType::Input,
            UiEvent::PointerDown => EventType::PointerDown,
            UiEvent::PointerUp => EventType::PointerUp,
            UiEvent::PointerEnter => EventType::PointerEnter,
            UiEvent::PointerLeave => EventType::PointerLeave,
            UiEvent::Click => EventType::Click,
        }
    }
}

/// Callback for handling events. Uses Rc since UI is single-threaded.
pub type Listener = Rc<dyn Fn(&UiEvent)>;

/// Anything events can be listened for on
pub trait EventTarget {
    /// Register `listener` for `event_type`; the teardown unregisters it
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Teardown;
}

/// Register a closure on `target`
pub fn listen(
    target: &(impl EventTarget + ?Sized),
    event_type: EventType,
    f: impl Fn(&UiEvent) + 'static,
) -> Teardown {
    target.add_listener(event_type, Rc::new(f))
}

/// Ready-made [`EventTarget`] backed by one [`EventBus`] per event type
///
/// Hosts embed this in their element types and call [`dispatch`](Self::dispatch)
/// when the native event arrives.
#[derive(Clone, Default)]
pub struct EventListeners {
    buses: Rc<RefCell<FxHashMap<EventType, EventBus<UiEvent>>>>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the listeners registered for its type
    pub fn dispatch(&self, event: &UiEvent) {
        let bus = self.buses.borrow().get(&event.event_type()).cloned();
        if let Some(bus) = bus {
            bus.emit(event);
        }
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.buses
            .borrow()
            .get(&event_type)
            .map_or(0, EventBus::len)
    }

    /// Total listeners over all event types
    pub fn total_listeners(&self) -> usize {
        self.buses.borrow().values().map(EventBus::len).sum()
    }
}

impl EventTarget for EventListeners {
    fn add_listener(&self, event_type: EventType, listener: Listener) -> Teardown {
        let bus = self
            .buses
            .borrow_mut()
            .entry(event_type)
            .or_default()
            .clone();
        bus.subscribe(move |event| listener(event))
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}
