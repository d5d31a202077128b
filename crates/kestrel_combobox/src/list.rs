//! List synchronization protocol
//!
//! Candidates attach themselves to the registry; the list container decides
//! which of them are visible and in what order. A resync pass enumerates the
//! visible candidates and assigns dense indices `0..n` from scratch, nothing
//! is patched incrementally. Resync is the only writer of indices; everything
//! else treats them as read-only until the next pass.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::host::ItemElement;
use crate::options::HighlightPolicy;

new_key_type! {
    /// Registration of a candidate element, issued by [`ListRegistry::attach`]
    pub struct CandidateKey;
}

/// Result of one resync pass
pub struct ResyncOutcome {
    /// `assignments[i]` is the candidate now at index `i`
    pub assignments: Vec<Rc<dyn ItemElement>>,
    /// Whether the visible candidates differ from the previous pass
    pub changed: bool,
    /// Highlight after re-validation
    pub highlight: Option<usize>,
}

impl ResyncOutcome {
    pub fn item_count(&self) -> usize {
        self.assignments.len()
    }
}

/// Marker moves produced by a highlight change
#[derive(Default)]
pub struct MarkChange {
    pub unmark: Option<Rc<dyn ItemElement>>,
    pub mark: Option<Rc<dyn ItemElement>>,
}

/// One attached element
///
/// The `Weak` keeps the allocation alive, so the address stays unique among
/// attached entries even if the host drops the element without detaching.
struct Entry {
    element: Weak<dyn ItemElement>,
    attachments: usize,
}

fn address(element: &Rc<dyn ItemElement>) -> usize {
    Rc::as_ptr(element) as *const () as usize
}

/// Candidate registry for one combobox
#[derive(Default)]
pub struct ListRegistry {
    entries: SlotMap<CandidateKey, Entry>,
    by_address: FxHashMap<usize, CandidateKey>,
    positions: Vec<(CandidateKey, Rc<dyn ItemElement>)>,
    index_of: FxHashMap<CandidateKey, usize>,
    /// The one element currently showing the highlight marker
    marked: Option<(CandidateKey, Rc<dyn ItemElement>)>,
    passes: u64,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `element`; the flag is false if it was already attached
    ///
    /// Attaching the same element twice returns the same key, and it stays
    /// registered until it has been detached as many times.
    pub fn attach(&mut self, element: &Rc<dyn ItemElement>) -> (CandidateKey, bool) {
        if let Some(&key) = self.by_address.get(&address(element)) {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.attachments += 1;
                return (key, false);
            }
        }
        let key = self.entries.insert(Entry {
            element: Rc::downgrade(element),
            attachments: 1,
        });
        self.by_address.insert(address(element), key);
        (key, true)
    }

    /// Drop one attachment; returns whether the element left the registry
    pub fn detach(&mut self, key: CandidateKey) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        entry.attachments -= 1;
        if entry.attachments > 0 {
            return false;
        }

        if let Some(entry) = self.entries.remove(key) {
            let address = entry.element.as_ptr() as *const () as usize;
            self.by_address.remove(&address);
        }
        if self.marked.as_ref().map(|(k, _)| *k) == Some(key) {
            self.marked = None;
        }
        true
    }

    pub fn attached_count(&self) -> usize {
        self.entries.len()
    }

    /// Key of an attached element
    pub fn key_of(&self, element: &Rc<dyn ItemElement>) -> Option<CandidateKey> {
        self.by_address.get(&address(element)).copied()
    }

    /// Candidates indexed by the last pass
    pub fn item_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_of(&self, key: CandidateKey) -> Option<usize> {
        self.index_of.get(&key).copied()
    }

    pub fn element(&self, index: usize) -> Option<Rc<dyn ItemElement>> {
        self.positions.get(index).map(|(_, element)| element.clone())
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Reassign indices to `visible` (document order) and re-validate the highlight
    ///
    /// Elements that were never attached, or that appear twice, are skipped.
    pub fn resync(
        &mut self,
        visible: Vec<Rc<dyn ItemElement>>,
        highlighted: Option<usize>,
        policy: HighlightPolicy,
    ) -> ResyncOutcome {
        let previous: Vec<CandidateKey> = self.positions.iter().map(|(key, _)| *key).collect();
        let highlighted_key = highlighted.and_then(|i| previous.get(i).copied());

        let mut index_of = FxHashMap::default();
        let mut positions = Vec::with_capacity(visible.len());
        for element in visible {
            let Some(key) = self.key_of(&element) else {
                continue;
            };
            if index_of.contains_key(&key) {
                continue;
            }
            index_of.insert(key, positions.len());
            positions.push((key, element));
        }

        let changed = positions.len() != previous.len()
            || positions.iter().zip(&previous).any(|((key, _), old)| key != old);
        self.index_of = index_of;
        self.positions = positions;
        self.passes += 1;

        let count = self.positions.len();
        let highlight = match policy {
            HighlightPolicy::Reset if changed => None,
            HighlightPolicy::Reset | HighlightPolicy::Clamp => {
                highlighted.filter(|&index| index < count)
            }
            HighlightPolicy::StickyByIdentity => {
                highlighted_key.and_then(|key| self.index_of(key))
            }
        };

        tracing::debug!(
            pass = self.passes,
            count,
            changed,
            ?highlight,
            "resynced candidate list"
        );

        ResyncOutcome {
            assignments: self.positions.iter().map(|(_, e)| e.clone()).collect(),
            changed,
            highlight,
        }
    }

    /// Move the highlight marker to the candidate at `index`
    ///
    /// Returns which element to clear and which to mark; both are `None` when
    /// the marker is already in place.
    pub fn mark(&mut self, index: Option<usize>) -> MarkChange {
        let target = index.and_then(|i| self.positions.get(i).cloned());
        let current = self.marked.as_ref().map(|(key, _)| *key);
        if current == target.as_ref().map(|(key, _)| *key) {
            return MarkChange::default();
        }
        let unmark = std::mem::replace(&mut self.marked, target.clone());
        MarkChange {
            unmark: unmark.map(|(_, element)| element),
            mark: target.map(|(_, element)| element),
        }
    }
}

impl std::fmt::Debug for ListRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListRegistry")
            .field("attached", &self.entries.len())
            .field("item_count", &self.positions.len())
            .field("passes", &self.passes)
            .finish()
    }
}
