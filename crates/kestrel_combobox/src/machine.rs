//! Interaction state machine
//!
//! Transitions are pure functions from a [`Snapshot`] and an [`Input`] to an
//! ordered list of [`Step`]s. The engine applies the steps to state and to
//! the host; nothing here touches either.

use smallvec::{smallvec, SmallVec};

use kestrel_core::events::{Key, KeyEvent};

use crate::navigator::next_index;
use crate::options::ComboboxOptions;

/// The state fields transitions depend on
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub is_open: bool,
    pub highlighted: Option<usize>,
    pub item_count: usize,
    pub filter_text: String,
    pub trap_focus: bool,
}

/// Something that happened to one of the combobox elements
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// The text input gained focus
    Focus,
    /// The text input lost focus
    Blur,
    KeyDown(KeyEvent),
    /// The user edited the input text
    TextInput(String),
    /// Pointer pressed on the trigger or a candidate
    PointerDown,
    /// Pointer released anywhere
    PointerUp,
    TriggerClick,
    ItemClick(usize),
    ItemPointerEnter(usize),
    ItemPointerLeave(usize),
}

/// One effect of a transition, applied in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Open the menu and resync the list
    Open,
    /// Close the menu and drop the highlight
    Close,
    SetHighlight(Option<usize>),
    /// Select the candidate at this index
    Commit(usize),
    /// Record new filter text, hand it to the filter callback and resync
    Filter(String),
    FocusInput,
    BlurInput,
    /// Empty the input element
    ClearInput,
    SetTrapFocus(bool),
}

pub type Steps = SmallVec<[Step; 4]>;

/// Keys that never open a closed menu
pub fn is_interaction_key(key: &Key) -> bool {
    matches!(
        key,
        Key::ArrowLeft
            | Key::ArrowRight
            | Key::Shift
            | Key::CapsLock
            | Key::Control
            | Key::Alt
            | Key::Meta
            | Key::Enter
            | Key::Function(1..=12)
    )
}

/// Compute the steps for `input` given the current state
pub fn transition(snapshot: &Snapshot, input: &Input, options: &ComboboxOptions) -> Steps {
    match input {
        Input::Focus if !snapshot.is_open => smallvec![Step::Open],
        Input::Focus => Steps::new(),
        Input::Blur if snapshot.is_open => close(snapshot),
        Input::Blur => Steps::new(),
        Input::KeyDown(event) => key_down(snapshot, event, options),
        Input::TextInput(text) => smallvec![Step::Filter(text.clone())],
        Input::PointerDown => smallvec![Step::SetTrapFocus(true)],
        Input::PointerUp => smallvec![Step::SetTrapFocus(false)],
        Input::TriggerClick => {
            let mut steps = if snapshot.is_open {
                close(snapshot)
            } else {
                smallvec![Step::Open]
            };
            steps.push(Step::FocusInput);
            steps
        }
        Input::ItemClick(index) => {
            let mut steps: Steps = smallvec![Step::Commit(*index), Step::FocusInput];
            steps.extend(close(snapshot));
            steps
        }
        Input::ItemPointerEnter(index) if snapshot.is_open => {
            smallvec![Step::SetHighlight(Some(*index))]
        }
        Input::ItemPointerLeave(index)
            if snapshot.is_open && snapshot.highlighted == Some(*index) =>
        {
            smallvec![Step::SetHighlight(None)]
        }
        Input::ItemPointerEnter(_) | Input::ItemPointerLeave(_) => Steps::new(),
    }
}

fn close(snapshot: &Snapshot) -> Steps {
    if snapshot.trap_focus {
        Steps::new()
    } else {
        smallvec![Step::Close]
    }
}

/// Blur, empty the input and hand the filter an empty string
fn clear_input(snapshot: &Snapshot, steps: &mut Steps) {
    steps.push(Step::BlurInput);
    steps.push(Step::ClearInput);
    if !snapshot.filter_text.is_empty() {
        steps.push(Step::Filter(String::new()));
    }
}

fn key_down(snapshot: &Snapshot, event: &KeyEvent, options: &ComboboxOptions) -> Steps {
    let mut steps = Steps::new();

    if !snapshot.is_open {
        match &event.key {
            Key::Escape => {
                clear_input(snapshot, &mut steps);
                return steps;
            }
            key if is_interaction_key(key) => return steps,
            Key::Backspace if snapshot.filter_text.is_empty() => return steps,
            _ => steps.push(Step::Open),
        }
    }

    let count = snapshot.item_count;
    let navigate = |amount: isize| {
        if count == 0 {
            Step::SetHighlight(None)
        } else {
            Step::SetHighlight(Some(next_index(snapshot.highlighted, count, amount)))
        }
    };

    match &event.key {
        Key::Escape => {
            steps.extend(close(snapshot));
            steps.push(Step::SetHighlight(None));
            clear_input(snapshot, &mut steps);
        }
        Key::Enter => {
            if let Some(index) = snapshot.highlighted {
                steps.push(Step::Commit(index));
            }
            steps.extend(close(snapshot));
        }
        Key::ArrowUp if event.modifiers.alt => steps.extend(close(snapshot)),
        Key::ArrowUp => steps.push(navigate(-1)),
        Key::ArrowDown => steps.push(navigate(1)),
        Key::PageUp => steps.push(navigate(-options.page_move())),
        Key::PageDown => steps.push(navigate(options.page_move())),
        Key::Home => steps.push(Step::SetHighlight((count > 0).then_some(0))),
        Key::End => steps.push(Step::SetHighlight(count.checked_sub(1))),
        _ => {}
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(highlighted: Option<usize>, item_count: usize) -> Snapshot {
        Snapshot {
            is_open: true,
            highlighted,
            item_count,
            ..Snapshot::default()
        }
    }

    fn closed(item_count: usize) -> Snapshot {
        Snapshot {
            item_count,
            ..Snapshot::default()
        }
    }

    fn key(snapshot: &Snapshot, key: Key) -> Steps {
        transition(snapshot, &Input::KeyDown(key.into()), &ComboboxOptions::default())
    }

    #[test]
    fn test_interaction_keys() {
        for key in [
            Key::ArrowLeft,
            Key::ArrowRight,
            Key::Shift,
            Key::CapsLock,
            Key::Control,
            Key::Alt,
            Key::Meta,
            Key::Enter,
            Key::Function(1),
            Key::Function(12),
        ] {
            assert!(is_interaction_key(&key), "{key:?}");
        }
        for key in [
            Key::ArrowDown,
            Key::ArrowUp,
            Key::Home,
            Key::End,
            Key::PageUp,
            Key::PageDown,
            Key::Function(13),
            Key::Character('a'),
        ] {
            assert!(!is_interaction_key(&key), "{key:?}");
        }
    }

    #[test]
    fn test_focus_opens_closed_menu() {
        let steps = transition(&closed(3), &Input::Focus, &ComboboxOptions::default());
        assert_eq!(steps.as_slice(), &[Step::Open]);

        let steps = transition(&open(None, 3), &Input::Focus, &ComboboxOptions::default());
        assert!(steps.is_empty());
    }

    #[test]
    fn test_blur_respects_trap() {
        let mut snapshot = open(Some(1), 3);
        let steps = transition(&snapshot, &Input::Blur, &ComboboxOptions::default());
        assert_eq!(steps.as_slice(), &[Step::Close]);

        snapshot.trap_focus = true;
        let steps = transition(&snapshot, &Input::Blur, &ComboboxOptions::default());
        assert!(steps.is_empty());
    }

    #[test]
    fn test_character_opens_closed_menu() {
        assert_eq!(key(&closed(3), Key::Character('x')).as_slice(), &[Step::Open]);
    }

    #[test]
    fn test_interaction_key_keeps_menu_closed() {
        assert!(key(&closed(3), Key::ArrowLeft).is_empty());
        assert!(key(&closed(3), Key::Enter).is_empty());
        assert!(key(&closed(3), Key::Function(5)).is_empty());
    }

    #[test]
    fn test_backspace_on_empty_keeps_menu_closed() {
        assert!(key(&closed(3), Key::Backspace).is_empty());

        let typed = Snapshot {
            filter_text: "ab".into(),
            ..closed(3)
        };
        assert_eq!(key(&typed, Key::Backspace).as_slice(), &[Step::Open]);
    }

    #[test]
    fn test_arrow_down_opens_then_navigates() {
        let steps = key(&closed(5), Key::ArrowDown);
        assert_eq!(steps.as_slice(), &[Step::Open, Step::SetHighlight(Some(0))]);
    }

    #[test]
    fn test_arrow_navigation_wraps() {
        assert_eq!(
            key(&open(Some(4), 5), Key::ArrowDown).as_slice(),
            &[Step::SetHighlight(Some(0))]
        );
        assert_eq!(
            key(&open(Some(0), 5), Key::ArrowUp).as_slice(),
            &[Step::SetHighlight(Some(4))]
        );
        assert_eq!(
            key(&open(None, 5), Key::ArrowUp).as_slice(),
            &[Step::SetHighlight(Some(4))]
        );
    }

    #[test]
    fn test_navigation_without_candidates() {
        assert_eq!(
            key(&open(None, 0), Key::ArrowDown).as_slice(),
            &[Step::SetHighlight(None)]
        );
        assert_eq!(key(&open(None, 0), Key::Home).as_slice(), &[Step::SetHighlight(None)]);
        assert_eq!(key(&open(None, 0), Key::End).as_slice(), &[Step::SetHighlight(None)]);
    }

    #[test]
    fn test_home_end_and_paging() {
        assert_eq!(key(&open(Some(3), 20), Key::Home).as_slice(), &[Step::SetHighlight(Some(0))]);
        assert_eq!(key(&open(Some(3), 20), Key::End).as_slice(), &[Step::SetHighlight(Some(19))]);
        assert_eq!(
            key(&open(Some(3), 20), Key::PageDown).as_slice(),
            &[Step::SetHighlight(Some(13))]
        );
        assert_eq!(
            key(&open(Some(3), 20), Key::PageUp).as_slice(),
            &[Step::SetHighlight(Some(19))]
        );

        let options = ComboboxOptions::default().page_size(2);
        let steps = transition(&open(Some(3), 20), &Input::KeyDown(Key::PageDown.into()), &options);
        assert_eq!(steps.as_slice(), &[Step::SetHighlight(Some(5))]);
    }

    #[test]
    fn test_alt_arrow_up_closes() {
        let event = KeyEvent::new(Key::ArrowUp).with_alt();
        let steps = transition(&open(Some(2), 5), &Input::KeyDown(event), &ComboboxOptions::default());
        assert_eq!(steps.as_slice(), &[Step::Close]);
    }

    #[test]
    fn test_enter_commits_highlighted() {
        assert_eq!(
            key(&open(Some(1), 3), Key::Enter).as_slice(),
            &[Step::Commit(1), Step::Close]
        );
        assert_eq!(key(&open(None, 3), Key::Enter).as_slice(), &[Step::Close]);
    }

    #[test]
    fn test_escape_when_open() {
        let snapshot = Snapshot {
            filter_text: "ap".into(),
            ..open(Some(1), 3)
        };
        assert_eq!(
            key(&snapshot, Key::Escape).as_slice(),
            &[
                Step::Close,
                Step::SetHighlight(None),
                Step::BlurInput,
                Step::ClearInput,
                Step::Filter(String::new()),
            ]
        );
    }

    #[test]
    fn test_escape_when_closed() {
        assert_eq!(
            key(&closed(3), Key::Escape).as_slice(),
            &[Step::BlurInput, Step::ClearInput]
        );
    }

    #[test]
    fn test_escape_while_trapped_stays_open() {
        let snapshot = Snapshot {
            trap_focus: true,
            ..open(Some(0), 3)
        };
        let steps = key(&snapshot, Key::Escape);
        assert!(!steps.contains(&Step::Close));
        assert!(steps.contains(&Step::SetHighlight(None)));
    }

    #[test]
    fn test_trigger_toggles() {
        let options = ComboboxOptions::default();
        assert_eq!(
            transition(&closed(3), &Input::TriggerClick, &options).as_slice(),
            &[Step::Open, Step::FocusInput]
        );
        assert_eq!(
            transition(&open(None, 3), &Input::TriggerClick, &options).as_slice(),
            &[Step::Close, Step::FocusInput]
        );
    }

    #[test]
    fn test_item_click_commits() {
        let steps = transition(&open(None, 3), &Input::ItemClick(2), &ComboboxOptions::default());
        assert_eq!(
            steps.as_slice(),
            &[Step::Commit(2), Step::FocusInput, Step::Close]
        );
    }

    #[test]
    fn test_pointer_highlight() {
        let options = ComboboxOptions::default();
        assert_eq!(
            transition(&open(None, 3), &Input::ItemPointerEnter(2), &options).as_slice(),
            &[Step::SetHighlight(Some(2))]
        );
        assert_eq!(
            transition(&open(Some(2), 3), &Input::ItemPointerLeave(2), &options).as_slice(),
            &[Step::SetHighlight(None)]
        );
        // Leaving a candidate that is not highlighted changes nothing
        assert!(transition(&open(Some(1), 3), &Input::ItemPointerLeave(2), &options).is_empty());
        assert!(transition(&closed(3), &Input::ItemPointerEnter(0), &options).is_empty());
    }

    #[test]
    fn test_pointer_trap() {
        let options = ComboboxOptions::default();
        assert_eq!(
            transition(&open(None, 3), &Input::PointerDown, &options).as_slice(),
            &[Step::SetTrapFocus(true)]
        );
        assert_eq!(
            transition(&open(None, 3), &Input::PointerUp, &options).as_slice(),
            &[Step::SetTrapFocus(false)]
        );
    }

    #[test]
    fn test_text_input_filters() {
        let steps = transition(
            &closed(3),
            &Input::TextInput("ap".into()),
            &ComboboxOptions::default(),
        );
        assert_eq!(steps.as_slice(), &[Step::Filter("ap".into())]);
    }
}
