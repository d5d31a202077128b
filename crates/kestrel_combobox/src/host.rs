//! Host element seams
//!
//! The engine never renders anything. The host hands it handles to the
//! elements it rendered, implementing these traits over whatever it uses
//! (DOM nodes, retained widgets, terminal cells). All methods are one-way
//! projections from engine state to the element.

use std::rc::Rc;

use kestrel_core::events::EventTarget;

use crate::options::ScrollAlignment;

/// The filter text input
pub trait InputElement: EventTarget {
    fn focus(&self);
    fn blur(&self);
    /// Replace the displayed text
    fn set_value(&self, value: &str);
}

/// One candidate in the list
pub trait ItemElement: EventTarget {
    /// Record the position assigned by the last resync (`data-index` and `id`)
    fn set_position(&self, index: usize, id: &str);

    /// Show or hide the highlight marker
    fn set_highlighted(&self, highlighted: bool);

    /// Bring the candidate into view after it became highlighted
    fn scroll_into_view(&self, _alignment: ScrollAlignment) {}
}

/// The list container
pub trait ListElement {
    /// Candidates currently visible inside the container, in document order
    ///
    /// Must return the same `Rc`s that were attached with
    /// [`Combobox::attach_item`](crate::Combobox::attach_item). A virtualized
    /// host returns only what it has materialized.
    fn visible_candidates(&self) -> Vec<Rc<dyn ItemElement>>;
}
