use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use crate::cell::StringCell;
use crate::error::Result;
use crate::sorted::SortedCells;

/// Point-in-time size of a mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MailboxStats {
    pub cells: usize,
    pub bytes: usize,
}

/// The shared sorted mailbox.
///
/// Every operation that observes or mutates the collection holds the same
/// lock for its whole duration, so no caller can see a half-applied insert
/// or removal. Share it between callers with `Arc<Mailbox>`.
#[derive(Debug, Default)]
pub struct Mailbox {
    cells: Mutex<SortedCells>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    // Mutations never leave the tree half-updated before a panic can unwind,
    // so a poisoned lock still guards a consistent collection.
    fn lock(&self) -> MutexGuard<'_, SortedCells> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `bytes` into a new cell and insert it.
    ///
    /// The copy happens before the lock is taken; an allocation failure
    /// leaves the mailbox untouched.
    pub fn insert(&self, bytes: &[u8]) -> Result<()> {
        let cell = StringCell::copy_from_slice(bytes)?;
        self.insert_cell(cell);
        Ok(())
    }

    /// Insert an already built cell.
    pub fn insert_cell(&self, cell: StringCell) {
        let len = cell.len();
        let mut cells = self.lock();
        cells.insert_cell(cell);
        debug!(len, cells = cells.len(), "inserted cell");
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of stored cells.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Clone of the smallest cell, leaving it in place.
    ///
    /// Cells share their buffer, so the clone does not copy content.
    pub fn peek_minimum(&self) -> Option<StringCell> {
        self.lock().peek_minimum().cloned()
    }

    /// Atomically remove and return the smallest cell.
    pub fn remove_minimum(&self) -> Option<StringCell> {
        let mut cells = self.lock();
        let cell = cells.remove_minimum()?;
        debug!(len = cell.len(), cells = cells.len(), "removed minimum cell");
        Some(cell)
    }

    /// Current cell count and byte total, read under one lock.
    pub fn stats(&self) -> MailboxStats {
        let cells = self.lock();
        MailboxStats {
            cells: cells.len(),
            bytes: cells.total_bytes(),
        }
    }

    /// Release every remaining cell. Returns how many were released.
    pub fn shutdown(&self) -> usize {
        let released = self.lock().clear();
        info!(released, "mailbox released remaining cells");
        released
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::error::StoreError;

    #[test]
    fn scenario_cat_xyz_dog() {
        let mailbox = Mailbox::new();
        mailbox.insert(b"cat").unwrap();
        mailbox.insert(b"xyz").unwrap();
        mailbox.insert(b"dog").unwrap();

        let order: Vec<_> = std::iter::from_fn(|| mailbox.remove_minimum())
            .map(|cell| cell.as_bytes().to_vec())
            .collect();
        assert_eq!(order, vec![b"cat".to_vec(), b"dog".to_vec(), b"xyz".to_vec()]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn remove_from_empty_is_none() {
        let mailbox = Mailbox::new();
        assert!(mailbox.remove_minimum().is_none());
        assert_eq!(mailbox.len(), 0);
    }

    #[test]
    fn peek_returns_clone_without_removal() {
        let mailbox = Mailbox::new();
        mailbox.insert(b"b").unwrap();
        mailbox.insert(b"a").unwrap();

        assert_eq!(mailbox.peek_minimum().unwrap().as_bytes(), b"a");
        assert_eq!(mailbox.len(), 2);
    }

    #[test]
    fn stats_reports_cells_and_bytes() {
        let mailbox = Mailbox::new();
        mailbox.insert(b"four").unwrap();
        mailbox.insert(b"ab").unwrap();

        assert_eq!(mailbox.stats(), MailboxStats { cells: 2, bytes: 6 });
    }

    #[test]
    fn failed_insert_leaves_mailbox_unchanged() {
        let mailbox = Mailbox::new();
        mailbox.insert(b"keep").unwrap();
        let before = mailbox.stats();

        let result = StringCell::try_with_len(usize::MAX, |_| Ok::<(), StoreError>(()))
            .map(|cell| mailbox.insert_cell(cell));
        assert!(matches!(result, Err(StoreError::OutOfMemory { .. })));

        assert_eq!(mailbox.stats(), before);
        assert_eq!(mailbox.peek_minimum().unwrap().as_bytes(), b"keep");
    }

    #[test]
    fn shutdown_releases_all_cells() {
        let mailbox = Mailbox::new();
        for word in ["a", "b", "c"] {
            mailbox.insert(word.as_bytes()).unwrap();
        }

        assert_eq!(mailbox.shutdown(), 3);
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.shutdown(), 0);
    }

    #[test]
    fn concurrent_writers_keep_order_and_count() {
        let mailbox = Arc::new(Mailbox::new());

        let writers: Vec<_> = (0..8u32)
            .map(|writer| {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    for i in 0..250u32 {
                        let word = format!("{:05}", (i * 8 + writer) * 7919 % 2000);
                        mailbox.insert(word.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(mailbox.len(), 2000);
        let drained: Vec<_> = std::iter::from_fn(|| mailbox.remove_minimum()).collect();
        assert_eq!(drained.len(), 2000);
        assert!(drained.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn concurrent_readers_remove_each_cell_once() {
        let mailbox = Arc::new(Mailbox::new());
        for i in 0..1000u32 {
            mailbox.insert(format!("{i:04}").as_bytes()).unwrap();
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let mailbox = Arc::clone(&mailbox);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(cell) = mailbox.remove_minimum() {
                        taken.push(cell);
                    }
                    taken
                })
            })
            .collect();

        let mut all: Vec<StringCell> = readers
            .into_iter()
            .flat_map(|reader| reader.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert!(mailbox.is_empty());
    }
}
