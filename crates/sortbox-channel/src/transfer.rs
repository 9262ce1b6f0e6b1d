//! Copy-in/copy-out primitives at the caller boundary.
//!
//! The channel never touches caller memory directly. It asks a
//! [`UserSource`] to copy a payload into a freshly allocated cell and a
//! [`UserSink`] to copy delivered bytes out. Either side may fault.

/// The caller's buffer could not be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bad address during caller buffer transfer")]
pub struct TransferFault;

/// A caller-owned payload that can be copied in.
pub trait UserSource {
    /// Payload length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the whole payload into `dst`, which is exactly `len()` bytes.
    fn copy_to(&self, dst: &mut [u8]) -> Result<(), TransferFault>;
}

/// A caller-owned destination that bytes can be copied out to.
pub trait UserSink {
    /// Maximum number of bytes the caller accepts.
    fn capacity(&self) -> usize;

    /// Copy `src` to the start of the destination. `src` never exceeds
    /// `capacity()`.
    fn copy_from(&mut self, src: &[u8]) -> Result<(), TransferFault>;
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        if dst.len() != <[u8]>::len(self) {
            return Err(TransferFault);
        }
        dst.copy_from_slice(self);
        Ok(())
    }
}

impl UserSink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        let dst = self.get_mut(..src.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// Growable sink with a fixed capacity.
///
/// Useful when the caller's buffer lives on the other side of a wire: the
/// capacity is what the caller asked for, the bytes are collected here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecSink {
    buf: Vec<u8>,
    capacity: usize,
}

impl VecSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
        }
    }

    /// Bytes delivered so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl UserSink for VecSink {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn copy_from(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        if src.len() > self.capacity {
            return Err(TransferFault);
        }
        self.buf.clear();
        self.buf.extend_from_slice(src);
        Ok(())
    }
}
