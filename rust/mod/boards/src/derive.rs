//! Pure projections over a board/floor snapshot.
//!
//! Nothing here touches the network or the store; every function is a
//! deterministic function of its arguments.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use wattsense_client::{Board, Floor, FloorId};

/// Group label for boards without a (known) floor.
pub const UNASSIGNED: &str = "Unassigned";

/// Bounds for the bulk-add count field.
pub const BULK_ADD_MIN: i64 = 1;
pub const BULK_ADD_MAX: i64 = 100;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Display name of the board's floor, or [`UNASSIGNED`] when the board has
/// no floor or references one that is not in `floors`.
pub fn floor_label<'a>(board: &Board, floors: &'a [Floor]) -> &'a str {
    board
        .floor_id
        .and_then(|id| floors.iter().find(|f| f.id == id))
        .map(|f| f.name.as_str())
        .unwrap_or(UNASSIGNED)
}

/// Partition boards by floor name.
///
/// Every board lands in exactly one group. Boards keep their input order
/// inside a group.
pub fn group_by_floor(boards: &[Board], floors: &[Floor]) -> BTreeMap<String, Vec<Board>> {
    let names: HashMap<FloorId, &str> = floors.iter().map(|f| (f.id, f.name.as_str())).collect();
    let mut groups: BTreeMap<String, Vec<Board>> = BTreeMap::new();
    for board in boards {
        let label = board
            .floor_id
            .and_then(|id| names.get(&id).copied())
            .unwrap_or(UNASSIGNED);
        groups.entry(label.to_string()).or_default().push(board.clone());
    }
    groups
}

/// Case-insensitive substring search over id, uid, serial, email and floor
/// name. A blank query keeps everything.
pub fn filter_by_search(boards: &[Board], floors: &[Floor], query: &str) -> Vec<Board> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return boards.to_vec();
    }
    boards
        .iter()
        .filter(|board| {
            let id = board.id.to_string();
            [
                id.as_str(),
                board.board_uid.as_str(),
                board.serial_number.as_str(),
                board.email.as_deref().unwrap_or(""),
                floor_label(board, floors),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// Number of pages needed for `len` items. Zero when there is nothing to show.
pub fn page_count(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Slice for one page. An out-of-range index is clamped to the last page.
pub fn paginate<T>(items: &[T], page_size: usize, page_index: usize) -> &[T] {
    let pages = page_count(items.len(), page_size);
    if pages == 0 {
        return &[];
    }
    let start = page_index.min(pages - 1) * page_size;
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// An empty email is valid: the field is optional.
pub fn validate_email(value: &str) -> bool {
    value.is_empty() || EMAIL_PATTERN.is_match(value)
}

pub fn validate_count(value: i64, min: i64, max: i64) -> bool {
    (min..=max).contains(&value)
}

/// Parse a count typed by the user. `None` for non-integers and values
/// outside `min..=max`.
pub fn parse_count(text: &str, min: i64, max: i64) -> Option<usize> {
    let value: i64 = text.trim().parse().ok()?;
    if !validate_count(value, min, max) {
        return None;
    }
    usize::try_from(value).ok()
}

pub fn boards_on_floor(boards: &[Board], floor_id: FloorId) -> Vec<Board> {
    boards
        .iter()
        .filter(|b| b.floor_id == Some(floor_id))
        .cloned()
        .collect()
}

/// Enabled boards owned by `email`, compared case-insensitively.
pub fn owned_enabled(boards: &[Board], email: &str) -> Vec<Board> {
    boards
        .iter()
        .filter(|b| b.enabled && b.email().is_some_and(|e| e.eq_ignore_ascii_case(email)))
        .cloned()
        .collect()
}
