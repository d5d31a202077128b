//! Combobox construction
//!
//! # Example
//!
//! ```rust
//! use kestrel_combobox::{ComboboxConfig, Key};
//! use kestrel_core::Items;
//!
//! let fruits = Items::new(vec!["apple".to_string(), "banana".to_string()]);
//! let all = fruits.snapshot();
//! let items = fruits.clone();
//!
//! let combobox = ComboboxConfig::new(
//!     fruits.clone(),
//!     |fruit: &String| fruit.clone(),
//!     move |text: &str| items.set(all.iter().filter(|f| f.contains(text)).cloned().collect()),
//! )
//! .on_select(|fruit: &String| tracing::info!(%fruit, "picked"))
//! .page_size(5)
//! .build();
//!
//! combobox.key_down(Key::Character('b'));
//! combobox.input("ban");
//! assert_eq!(fruits.snapshot(), vec!["banana".to_string()]);
//!
//! combobox.item_click(0);
//! assert_eq!(combobox.selected().as_deref(), Some("banana"));
//! ```

use std::fmt;
use std::rc::Rc;

use kestrel_core::collection::Items;

use crate::engine::Combobox;
use crate::options::{ComboboxOptions, HighlightPolicy, ScrollAlignment};
use crate::session::SessionId;

/// Formats a candidate for display in the input
pub type ItemToString<T> = Rc<dyn Fn(&T) -> String>;

/// Receives the input text; expected to update the candidate collection
pub type FilterFn = Rc<dyn Fn(&str)>;

/// Told about every committed selection
pub type SelectFn<T> = Rc<dyn Fn(&T)>;

/// Builder for a [`Combobox`]
pub struct ComboboxConfig<T> {
    pub(crate) items: Items<T>,
    pub(crate) item_to_string: ItemToString<T>,
    pub(crate) filter: FilterFn,
    pub(crate) on_select: Option<SelectFn<T>>,
    pub(crate) options: ComboboxOptions,
    pub(crate) session: Option<SessionId>,
}

impl<T: Clone + 'static> ComboboxConfig<T> {
    pub fn new(
        items: Items<T>,
        item_to_string: impl Fn(&T) -> String + 'static,
        filter: impl Fn(&str) + 'static,
    ) -> Self {
        Self {
            items,
            item_to_string: Rc::new(item_to_string),
            filter: Rc::new(filter),
            on_select: None,
            options: ComboboxOptions::default(),
            session: None,
        }
    }

    /// Callback run after a candidate is committed
    pub fn on_select(mut self, f: impl Fn(&T) + 'static) -> Self {
        self.on_select = Some(Rc::new(f));
        self
    }

    /// Replace all behavior options at once (e.g. loaded from TOML)
    pub fn options(mut self, options: ComboboxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn scroll_alignment(mut self, alignment: ScrollAlignment) -> Self {
        self.options.scroll_alignment = alignment;
        self
    }

    /// Candidates moved by PageUp/PageDown; zero is treated as one
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.options.page_size = page_size.max(1);
        self
    }

    pub fn highlight_policy(mut self, policy: HighlightPolicy) -> Self {
        self.options.highlight_policy = policy;
        self
    }

    /// Use a fixed session id instead of a generated one
    pub fn session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> Combobox<T> {
        Combobox::new(self)
    }
}

impl<T> fmt::Debug for ComboboxConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComboboxConfig")
            .field("options", &self.options)
            .field("session", &self.session)
            .field("on_select", &self.on_select.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ComboboxConfig::new(Items::new(vec![1, 2, 3]), |n: &i32| n.to_string(), |_| {});

        assert_eq!(config.options, ComboboxOptions::default());
        assert!(config.on_select.is_none());
        assert!(config.session.is_none());
        assert_eq!((config.item_to_string)(&7), "7");
    }

    #[test]
    fn test_builder_setters() {
        let config = ComboboxConfig::new(Items::<i32>::default(), |n| n.to_string(), |_| {})
            .on_select(|_| {})
            .scroll_alignment(ScrollAlignment::Center)
            .page_size(0)
            .highlight_policy(HighlightPolicy::StickyByIdentity)
            .session(SessionId::explicit("cfg"));

        assert!(config.on_select.is_some());
        assert_eq!(config.options.scroll_alignment, ScrollAlignment::Center);
        assert_eq!(config.options.page_size, 1);
        assert_eq!(config.options.highlight_policy, HighlightPolicy::StickyByIdentity);
        assert_eq!(config.session.as_ref().map(SessionId::as_str), Some("cfg"));
    }

    #[test]
    fn test_options_from_toml() {
        let options = ComboboxOptions::from_toml_str(r#"highlight-policy = "clamp""#).unwrap();
        let config = ComboboxConfig::new(Items::<i32>::default(), |n| n.to_string(), |_| {})
            .options(options);

        assert_eq!(config.options.highlight_policy, HighlightPolicy::Clamp);
    }
}
