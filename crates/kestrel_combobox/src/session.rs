//! Per-instance session identity
//!
//! Every element id a combobox hands out is derived from its session id, so
//! several comboboxes can live on one page without id clashes.

use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

/// Length of generated session ids
const GENERATED_LEN: usize = 8;

/// Immutable id generated once per combobox
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Rc<str>);

impl SessionId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(GENERATED_LEN);
        Self(id.into())
    }

    /// Use a caller-provided id (for deterministic ids in tests or SSR)
    pub fn explicit(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self(Rc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn input_id(&self) -> String {
        format!("{}-input", self.0)
    }

    pub fn label_id(&self) -> String {
        format!("{}-label", self.0)
    }

    pub fn menu_id(&self) -> String {
        format!("{}-menu", self.0)
    }

    pub fn trigger_id(&self) -> String {
        format!("{}-trigger", self.0)
    }

    /// Id of the candidate at `index` after the last resync
    pub fn descendant_id(&self, index: usize) -> String {
        format!("{}-descendent-{}", self.0, index)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
