//! Behavior options
//!
//! The plain-data part of a combobox configuration. Options can be built in
//! code or loaded from a TOML table:
//!
//! ```toml
//! scroll-alignment = "center"
//! page-size = 5
//! highlight-policy = "sticky-by-identity"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::navigator::DEFAULT_PAGE_SIZE;

/// Where a newly highlighted candidate lands when scrolled into view
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollAlignment {
    /// Scroll the least amount needed
    #[default]
    Nearest,
    /// Center the candidate in the list
    Center,
}

impl ScrollAlignment {
    /// The CSS `scrollIntoView` block value
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollAlignment::Nearest => "nearest",
            ScrollAlignment::Center => "center",
        }
    }
}

/// What happens to the highlight when a resync changes the candidates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightPolicy {
    /// Drop the highlight whenever the visible candidates changed
    #[default]
    Reset,
    /// Keep the highlighted index if it is still in range
    Clamp,
    /// Follow the highlighted candidate to its new index while it stays visible
    StickyByIdentity,
}

/// Behavior options for a combobox
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComboboxOptions {
    pub scroll_alignment: ScrollAlignment,
    /// Candidates moved by PageUp/PageDown
    pub page_size: usize,
    pub highlight_policy: HighlightPolicy,
}

impl Default for ComboboxOptions {
    fn default() -> Self {
        Self {
            scroll_alignment: ScrollAlignment::default(),
            page_size: DEFAULT_PAGE_SIZE,
            highlight_policy: HighlightPolicy::default(),
        }
    }
}

impl ComboboxOptions {
    /// Parse and validate options from TOML
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: ComboboxOptions = toml::from_str(source)?;
        options.validate()
    }

    pub fn validate(self) -> Result<Self> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(self)
    }

    pub fn scroll_alignment(mut self, alignment: ScrollAlignment) -> Self {
        self.scroll_alignment = alignment;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn highlight_policy(mut self, policy: HighlightPolicy) -> Self {
        self.highlight_policy = policy;
        self
    }

    /// Page size as a signed move amount
    pub(crate) fn page_move(&self) -> isize {
        isize::try_from(self.page_size).unwrap_or(isize::MAX)
    }
}
