//! Kestrel Combobox
//!
//! A headless combobox: a text input that filters a list of candidates, with
//! single selection. The engine owns the behavior (open/closed state,
//! keyboard and pointer navigation, highlight and selection, accessibility
//! attributes, and keeping candidate indices in step with a list that changes
//! under the user's typing). The host owns rendering and filtering.
//!
//! # Wiring
//!
//! 1. Build a [`Combobox`] from a [`ComboboxConfig`]: the candidate
//!    [`Items`](kestrel_core::Items), a display formatter and a filter callback.
//! 2. Attach the host elements ([`InputElement`], [`ItemElement`],
//!    [`ListElement`], plus any [`EventTarget`](kestrel_core::EventTarget) for
//!    the trigger and the document). Each attachment returns a
//!    [`Subscription`](kestrel_core::Subscription) that detaches on release.
//! 3. Apply the attribute bundles ([`Combobox::input_attributes`] and
//!    friends) to the rendered elements.
//! 4. Call [`Combobox::settle`] after applying visibility changes caused by
//!    the filter callback, so candidates are reindexed.
//!
//! # Example
//!
//! ```rust
//! use kestrel_combobox::{ComboboxConfig, Key};
//! use kestrel_core::Items;
//!
//! let items = Items::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
//! let combobox = ComboboxConfig::new(items, |s: &String| s.clone(), |_text| {}).build();
//!
//! combobox.key_down(Key::Character('b'));
//! assert!(combobox.is_open());
//!
//! combobox.item_click(1);
//! assert_eq!(combobox.selected().as_deref(), Some("b"));
//! assert_eq!(combobox.filter_text(), "b");
//! assert!(!combobox.is_open());
//! ```

pub mod attributes;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod list;
pub mod machine;
pub mod navigator;
pub mod options;
pub mod session;
pub mod state;

pub use attributes::{AttrValue, Attributes};
pub use config::ComboboxConfig;
pub use engine::{Combobox, WeakCombobox};
pub use error::{ConfigError, Result};
pub use host::{InputElement, ItemElement, ListElement};
pub use list::{CandidateKey, ListRegistry, MarkChange, ResyncOutcome};
pub use machine::{is_interaction_key, transition, Input, Snapshot, Step};
pub use navigator::{next_index, DEFAULT_PAGE_SIZE};
pub use options::{ComboboxOptions, HighlightPolicy, ScrollAlignment};
pub use session::SessionId;
pub use state::ComboState;

pub use kestrel_core::events::{Key, KeyEvent, Modifiers};
