//! Sorted, duplicate-preserving byte-string mailbox.
//!
//! This is the lowest layer of sortbox. Strings are stored as owned cells in
//! byte-wise lexicographic order; equal strings coexist. The only mutation
//! paths are insert (+1) and remove-minimum (-1).
//!
//! - [`SortedCells`] is the unsynchronized ordered collection.
//! - [`Mailbox`] is the single shared instance, every access serialized by
//!   one lock.

pub mod cell;
pub mod error;
pub mod mailbox;
pub mod sorted;

pub use cell::StringCell;
pub use error::{Result, StoreError};
pub use mailbox::{Mailbox, MailboxStats};
pub use sorted::SortedCells;
