//! Growable output buffer
//!
//! The buffer is append-only except for [`GrowableBuffer::patch_at`], which
//! rewrites bytes that were already committed. Growth may move the backing
//! storage but never changes an offset: positions returned by
//! [`GrowableBuffer::len`] stay valid indices for the life of the buffer,
//! which is what lets the encoder backpatch headers by offset.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::tag::align4;
use crate::MAX_DOCUMENT_SIZE;

/// Default initial capacity in bytes
pub const DEFAULT_CAPACITY: usize = 256;

/// Extra slack added on growth is taken from the low bits of the step
const GROWTH_SLACK_MASK: usize = 0x3FF;

/// Append-only byte buffer with in-place backpatching
#[derive(Debug, Clone, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl GrowableBuffer {
    /// Create a buffer with [`DEFAULT_CAPACITY`]
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer with the given capacity hint
    ///
    /// The hint is clamped to the 32-bit size model.
    pub fn with_capacity(hint: usize) -> Self {
        let capacity = hint.min(MAX_DOCUMENT_SIZE);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of committed bytes (the write offset)
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Committed bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return the committed bytes
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Drop all committed bytes but keep the capacity for reuse
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Ensure at least `n` more bytes fit without advancing the offset
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        let needed = self.data.len().checked_add(n).ok_or(Error::CapacityExceeded)?;
        if needed > MAX_DOCUMENT_SIZE {
            return Err(Error::CapacityExceeded);
        }
        if needed > self.capacity {
            self.grow(n)?;
        }
        Ok(())
    }

    fn grow(&mut self, n: usize) -> Result<()> {
        let step = align4(n);
        let new_capacity = self
            .capacity
            .saturating_add(step)
            .saturating_add(step & GROWTH_SLACK_MASK)
            .min(MAX_DOCUMENT_SIZE);

        self.data
            .try_reserve_exact(new_capacity - self.data.len())
            .map_err(|_| Error::CapacityExceeded)?;

        tracing::trace!(
            old_capacity = self.capacity,
            new_capacity,
            requested = n,
            "buffer grown"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Append raw bytes
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Append `count` zero bytes
    #[inline]
    pub fn pad(&mut self, count: usize) -> Result<()> {
        self.reserve(count)?;
        self.data.resize(self.data.len() + count, 0);
        Ok(())
    }

    /// Overwrite already committed bytes starting at `offset`
    ///
    /// Fails if any byte of the patch lies at or past the write offset.
    pub fn patch_at(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .ok_or(Error::EncoderMisuse("patch offset overflow"))?;
        if end > self.data.len() {
            return Err(Error::EncoderMisuse("patch beyond committed bytes"));
        }
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.append(&[value])
    }

    /// Write a u16 value (native byte order)
    #[inline]
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write a u32 value (native byte order)
    #[inline]
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write a u64 value (native byte order)
    #[inline]
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write an i32 value (native byte order)
    #[inline]
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write an i64 value (native byte order)
    #[inline]
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write an f32 value (native byte order)
    #[inline]
    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Write an f64 value (native byte order)
    #[inline]
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.append(&value.to_ne_bytes())
    }

    /// Overwrite a u16 at `offset`
    #[inline]
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.patch_at(offset, &value.to_ne_bytes())
    }

    /// Overwrite a u32 at `offset`
    #[inline]
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.patch_at(offset, &value.to_ne_bytes())
    }
}
