//! Posting list algebra over strictly ascending file-id slices.
//!
//! Both operations are single linear merges, O(|a| + |b|), and preserve the
//! strictly-ascending invariant of their inputs.

use crate::index::types::FileId;
use std::cmp::Ordering;

/// Intersect two ascending lists (AND).
pub fn intersect(a: &[FileId], b: &[FileId]) -> Vec<FileId> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }

    result
}

/// Union two ascending lists (OR), collapsing ids present in both.
pub fn union(a: &[FileId], b: &[FileId]) -> Vec<FileId> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);

    result
}

/// True if `list` is strictly ascending (sorted, no duplicates).
pub fn is_strictly_ascending(list: &[FileId]) -> bool {
    list.windows(2).all(|w| w[0] < w[1])
}
