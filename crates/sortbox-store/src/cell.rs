use bytes::Bytes;

use crate::error::StoreError;

/// One stored string.
///
/// The content is immutable once built. Cells order byte-wise, with a strict
/// prefix sorting before any longer string that extends it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringCell {
    content: Bytes,
}

impl StringCell {
    /// Create a cell holding a copy of `bytes`.
    pub fn copy_from_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        Self::try_with_len(bytes.len(), |buf| {
            buf.copy_from_slice(bytes);
            Ok::<(), StoreError>(())
        })
    }

    /// Allocate a `len`-byte cell and let `fill` populate it.
    ///
    /// Allocation is fallible: if the buffer cannot be reserved the call
    /// returns [`StoreError::OutOfMemory`] converted into `E`. If `fill`
    /// fails, the partially written buffer is dropped and its error returned.
    /// No cell exists in either case.
    pub fn try_with_len<E, F>(len: usize, fill: F) -> Result<Self, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut [u8]) -> Result<(), E>,
    {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| StoreError::OutOfMemory { requested: len })?;
        buf.resize(len, 0);
        fill(&mut buf)?;
        Ok(Self {
            content: Bytes::from(buf),
        })
    }

    /// Number of content bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Borrow the content.
    pub fn as_bytes(&self) -> &[u8] {
        self.content.as_ref()
    }

    /// Consume the cell and hand its buffer to the caller.
    pub fn into_bytes(self) -> Bytes {
        self.content
    }
}

impl From<Bytes> for StringCell {
    fn from(content: Bytes) -> Self {
        Self { content }
    }
}

impl From<&'static str> for StringCell {
    fn from(content: &'static str) -> Self {
        Self {
            content: Bytes::from_static(content.as_bytes()),
        }
    }
}
