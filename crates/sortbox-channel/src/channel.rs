use std::sync::Arc;

use sortbox_store::{Mailbox, StringCell};
use tracing::{debug, warn};

use crate::error::{ChannelError, Result};
use crate::file::OpenFile;
use crate::transfer::{UserSink, UserSource};

/// Reply delivered by a fresh read when the mailbox is empty.
pub const EMPTY_REPLY: &[u8] = b"0\n";

/// Buffer size used by callers that do not pick one.
pub const DEFAULT_READ_CAPACITY: usize = 64 * 1024;

/// Where a read call sits in its read cycle, derived only from the offset
/// the caller echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// Offset 0: deliver the next string.
    Fresh,
    /// Non-zero offset: the previous call delivered data, signal end-of-data.
    Continuation,
}

impl ReadPhase {
    pub fn from_offset(offset: u64) -> Self {
        if offset == 0 {
            ReadPhase::Fresh
        } else {
            ReadPhase::Continuation
        }
    }
}

/// Read/write protocol handler over a shared [`Mailbox`].
///
/// Cloning a channel shares the mailbox. The handler itself holds no
/// per-caller state; the offset passed on each call is the caller's.
#[derive(Debug, Clone, Default)]
pub struct Channel {
    mailbox: Arc<Mailbox>,
}

impl Channel {
    /// Create a channel over a fresh, empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel over an existing mailbox.
    pub fn with_mailbox(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    /// The shared mailbox behind this channel.
    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Open a file handle with its own position, starting at 0.
    pub fn open(&self) -> OpenFile {
        OpenFile::new(self.clone())
    }

    /// Store one string.
    ///
    /// The whole payload becomes one cell; nothing is stripped or added.
    /// Returns the number of bytes accepted. On any error the mailbox is
    /// unchanged.
    pub fn write<S>(&self, src: &S, offset: u64) -> Result<usize>
    where
        S: UserSource + ?Sized,
    {
        let len = src.len();
        debug!(len, offset, "channel write");

        if offset != 0 {
            debug!(offset, "write offset not supported");
            return Err(ChannelError::UnsupportedOffset(offset));
        }

        let cell = StringCell::try_with_len(len, |buf| {
            src.copy_to(buf).map_err(ChannelError::from)
        })
        .inspect_err(|err| warn!(len, error = %err, "write rejected"))?;

        self.mailbox.insert_cell(cell);
        Ok(len)
    }

    /// Run one step of a read cycle.
    ///
    /// At offset 0 the smallest string is removed and up to
    /// `dst.capacity()` bytes of it are delivered; anything past the
    /// capacity is discarded. With nothing stored, [`EMPTY_REPLY`] is
    /// delivered instead. `offset` is set to the byte count so the caller's
    /// next call is a continuation.
    ///
    /// At a non-zero offset, `offset` is reset and 0 is returned.
    ///
    /// If copy-out faults, the removed string is lost and `offset` is reset.
    pub fn read<K>(&self, dst: &mut K, offset: &mut u64) -> Result<usize>
    where
        K: UserSink + ?Sized,
    {
        let capacity = dst.capacity();
        debug!(capacity, offset = *offset, "channel read");

        if ReadPhase::from_offset(*offset) == ReadPhase::Continuation {
            *offset = 0;
            return Ok(0);
        }

        let delivered = match self.mailbox.remove_minimum() {
            Some(cell) => {
                let n = cell.len().min(capacity);
                if n < cell.len() {
                    debug!(len = cell.len(), capacity, "truncating string to caller buffer");
                }
                dst.copy_from(&cell.as_bytes()[..n])
                    .map(|()| n)
                    .inspect_err(|_| warn!(len = cell.len(), "copy-out failed; string dropped"))
            }
            None => {
                debug!("mailbox is empty");
                let n = EMPTY_REPLY.len().min(capacity);
                dst.copy_from(&EMPTY_REPLY[..n]).map(|()| n)
            }
        };

        match delivered {
            Ok(n) => {
                *offset = n as u64;
                Ok(n)
            }
            Err(fault) => {
                *offset = 0;
                Err(fault.into())
            }
        }
    }
}
