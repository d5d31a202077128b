//! Wrap-around index navigation

/// Candidates moved by PageUp/PageDown unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Returns the index reached by moving `move_amount` from `current`.
///
/// `None` counts as the position just before the first candidate, so moving
/// down from nothing lands on `0` and moving up from nothing lands on the last
/// candidate. Moving past either end wraps to the opposite end (it does not
/// carry the overshoot). With no candidates the result is always `0`.
pub fn next_index(current: Option<usize>, item_count: usize, move_amount: isize) -> usize {
    if item_count == 0 {
        return 0;
    }
    let last = item_count - 1;
    let current = current.map_or(-1, |i| i as i128);
    let raw = current + move_amount as i128;
    if raw < 0 {
        last
    } else if raw > last as i128 {
        0
    } else {
        raw as usize
    }
}
