//! Accessibility attribute derivation
//!
//! Pure projections of combobox state onto the attribute bundles the host
//! applies verbatim to its elements. Bundles keep insertion order and
//! serialize to a flat JSON object, so they can cross a bridge to a web view.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::session::SessionId;

/// A single attribute value
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl AttrValue {
    /// Value of a boolean presence attribute such as `data-list-item`
    pub fn present() -> Self {
        AttrValue::Text(String::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Int(value) => write!(f, "{value}"),
            AttrValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

/// Ordered attribute bundle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<&'static str, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttrValue)> {
        self.0.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Attributes for the text input
pub fn input_attributes(
    session: &SessionId,
    is_open: bool,
    highlighted: Option<usize>,
) -> Attributes {
    let mut attrs = Attributes::new();
    if let Some(index) = highlighted {
        attrs = attrs.with("aria-activedescendant", session.descendant_id(index));
    }
    attrs
        .with("aria-autocomplete", "list")
        .with("aria-controls", session.menu_id())
        .with("aria-expanded", is_open)
        .with("aria-labelledby", session.label_id())
        .with("autocomplete", "off")
        .with("id", session.input_id())
        .with("role", "combobox")
}

/// Attributes for the toggle button next to the input
pub fn trigger_attributes(session: &SessionId, is_open: bool) -> Attributes {
    Attributes::new()
        .with("aria-controls", session.menu_id())
        .with("aria-expanded", is_open)
        .with("aria-label", "Toggle menu")
        .with("aria-labelledby", session.label_id())
        .with("id", session.trigger_id())
        .with("tabindex", -1i64)
        .with("type", "button")
}

pub fn label_attributes(session: &SessionId) -> Attributes {
    Attributes::new()
        .with("for", session.input_id())
        .with("id", session.label_id())
}

pub fn list_attributes(session: &SessionId) -> Attributes {
    Attributes::new()
        .with("aria-labelledby", session.label_id())
        .with("id", session.menu_id())
        .with("role", "listbox")
}

/// Attributes for the candidate at `index`
pub fn item_attributes(session: &SessionId, index: usize, highlighted: bool) -> Attributes {
    let mut attrs = Attributes::new().with("aria-selected", highlighted);
    if highlighted {
        attrs = attrs.with("data-highlighted", AttrValue::present());
    }
    attrs
        .with("data-index", index)
        .with("data-list-item", AttrValue::present())
        .with("id", session.descendant_id(index))
        .with("role", "option")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::explicit("s")
    }

    #[test]
    fn test_input_attributes_closed() {
        let attrs = input_attributes(&session(), false, None);

        assert_eq!(attrs.get("role"), Some(&AttrValue::from("combobox")));
        assert_eq!(attrs.get("aria-expanded"), Some(&AttrValue::Bool(false)));
        assert_eq!(attrs.get("aria-controls"), Some(&AttrValue::from("s-menu")));
        assert_eq!(attrs.get("aria-labelledby"), Some(&AttrValue::from("s-label")));
        assert_eq!(attrs.get("autocomplete"), Some(&AttrValue::from("off")));
        assert_eq!(attrs.get("id"), Some(&AttrValue::from("s-input")));
        assert!(!attrs.contains("aria-activedescendant"));
    }

    #[test]
    fn test_input_attributes_link_highlight() {
        let attrs = input_attributes(&session(), true, Some(3));

        assert_eq!(attrs.get("aria-expanded"), Some(&AttrValue::Bool(true)));
        assert_eq!(
            attrs.get("aria-activedescendant").and_then(AttrValue::as_str),
            Some("s-descendent-3")
        );
    }

    #[test]
    fn test_label_points_at_input() {
        let attrs = label_attributes(&session());
        assert_eq!(attrs.get("for"), Some(&AttrValue::from("s-input")));
        assert_eq!(attrs.get("id"), Some(&AttrValue::from("s-label")));
    }

    #[test]
    fn test_item_attributes() {
        let plain = item_attributes(&session(), 2, false);
        assert_eq!(plain.get("data-index"), Some(&AttrValue::Int(2)));
        assert_eq!(plain.get("id"), Some(&AttrValue::from("s-descendent-2")));
        assert!(plain.contains("data-list-item"));
        assert!(!plain.contains("data-highlighted"));

        let marked = item_attributes(&session(), 2, true);
        assert!(marked.contains("data-highlighted"));
        assert_eq!(marked.get("aria-selected"), Some(&AttrValue::Bool(true)));
    }

    #[test]
    fn test_attributes_serialize_flat() {
        let json = serde_json::to_value(list_attributes(&session())).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "aria-labelledby": "s-label",
                "id": "s-menu",
                "role": "listbox",
            })
        );

        let trigger = serde_json::to_string(&trigger_attributes(&session(), true)).unwrap();
        assert!(trigger.contains(r#""tabindex":-1"#));
        assert!(trigger.contains(r#""aria-expanded":true"#));
    }

    #[test]
    fn test_display_values() {
        assert_eq!(AttrValue::Bool(true).to_string(), "true");
        assert_eq!(AttrValue::Int(-1).to_string(), "-1");
        assert_eq!(AttrValue::present().to_string(), "");
    }
}
