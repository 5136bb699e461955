/// List reordering shared by task columns, the board list and the daily checklist.
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("Index {index} out of range for a list of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("New order is not a permutation of the existing ids")]
    NotAPermutation,
}

/// Move the element at `from` to `to`, shifting the elements in between.
///
/// Returns a new list and leaves `list` untouched. `from == to` yields an
/// equal list.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Result<Vec<T>, ReorderError> {
    let len = list.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::IndexOutOfRange { index, len });
        }
    }

    let mut out = list.to_vec();
    let item = out.remove(from);
    out.insert(to, item);
    Ok(out)
}

/// Rearrange `list` to follow `ordered_ids`, which must name every element
/// exactly once.
pub fn reorder_by_ids<T, F>(list: &[T], ordered_ids: &[String], id_of: F) -> Result<Vec<T>, ReorderError>
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    if ordered_ids.len() != list.len() {
        return Err(ReorderError::NotAPermutation);
    }
    let unique: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
    if unique.len() != ordered_ids.len() {
        return Err(ReorderError::NotAPermutation);
    }

    ordered_ids
        .iter()
        .map(|id| {
            list.iter()
                .find(|item| id_of(item) == id)
                .cloned()
                .ok_or(ReorderError::NotAPermutation)
        })
        .collect()
}
