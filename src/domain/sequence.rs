//! Position-ordered sequences
//!
//! Variants, images and FAQs are all kept as `Vec`s whose `position` field
//! mirrors the array index. Every mutation goes through `move_item` or ends
//! with `renumber`, so positions stay a dense `0..N-1` run.

use serde::{Deserialize, Serialize};
use std::fmt;

pub trait Positioned {
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

/// Entry of a batched positions call: `[{id, position}]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: String,
    pub position: u32,
}

pub fn renumber<T: Positioned>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index as u32);
    }
}

/// Sorts by the stored position (stable), then renumbers.
pub fn normalize<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(|i| i.position());
    renumber(items);
}

pub fn is_dense<T: Positioned>(items: &[T]) -> bool {
    items.iter().enumerate().all(|(i, item)| item.position() == i as u32)
}

/// Removes the item at `from`, reinserts it at `to` and renumbers.
pub fn move_item<T: Positioned>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), SequenceError> {
    let len = items.len();
    if from >= len || to >= len { return Err(SequenceError::OutOfBounds { from, to, len }); }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    renumber(items);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError { OutOfBounds { from: usize, to: usize, len: usize } }
impl std::error::Error for SequenceError {}
impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { from, to, len } => write!(f, "Cannot move {} -> {} in a list of {}", from, to, len),
        }
    }
}
