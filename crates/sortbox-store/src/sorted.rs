use std::collections::BTreeSet;

use crate::cell::StringCell;
use crate::error::Result;

/// Tree key: the cell plus a sequence number that only keeps equal strings
/// distinct. Callers must not read FIFO order into it.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    cell: StringCell,
    seq: u64,
}

/// Ordered multiset of [`StringCell`]s.
///
/// Iterating from minimum to maximum always yields a non-decreasing sequence
/// under byte-wise comparison. Insert and remove-minimum are `O(log n)`.
///
/// Not synchronized; see [`crate::Mailbox`] for the shared instance.
#[derive(Debug, Default)]
pub struct SortedCells {
    slots: BTreeSet<Slot>,
    next_seq: u64,
    total_bytes: usize,
}

impl SortedCells {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `bytes` into a new cell and insert it.
    ///
    /// On allocation failure the collection is left unchanged.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<()> {
        let cell = StringCell::copy_from_slice(bytes)?;
        self.insert_cell(cell);
        Ok(())
    }

    /// Insert an already built cell.
    pub fn insert_cell(&mut self, cell: StringCell) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.total_bytes += cell.len();
        self.slots.insert(Slot { cell, seq });
    }

    /// Borrow the smallest cell without removing it.
    pub fn peek_minimum(&self) -> Option<&StringCell> {
        self.slots.first().map(|slot| &slot.cell)
    }

    /// Remove and return the smallest cell.
    ///
    /// When several cells hold equal content, which one is returned is
    /// unspecified.
    pub fn remove_minimum(&mut self) -> Option<StringCell> {
        let slot = self.slots.pop_first()?;
        self.total_bytes -= slot.cell.len();
        Some(slot.cell)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Sum of content lengths over all stored cells.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Iterate cells from minimum to maximum.
    pub fn iter(&self) -> impl Iterator<Item = &StringCell> {
        self.slots.iter().map(|slot| &slot.cell)
    }

    /// Release every cell. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let released = self.slots.len();
        self.slots.clear();
        self.total_bytes = 0;
        released
    }
}
