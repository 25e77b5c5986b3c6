//! Tagged document encoder
//!
//! The [`Serializer`] writes field records straight into a
//! [`GrowableBuffer`] in one forward pass. Documents and arrays reserve
//! their size/count headers as zeros when opened and are backpatched by
//! offset when closed, using two LIFO stacks of frames.
//!
//! Every `open_*` must be matched by the corresponding `close_*`; the
//! buffer holds a well-formed document only once the root is closed.

use alloc::vec::Vec;

use crate::buffer::GrowableBuffer;
use crate::error::{Error, Result};
use crate::tag::{pad4, string_reserved_size, Kind};
use crate::MAX_NESTING_DEPTH;

/// How an open document was entered, so it can only be closed the same way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Root,
    Field,
    Element,
}

#[derive(Debug, Clone, Copy)]
struct DocumentFrame {
    /// Offset of the reserved size field
    offset: usize,
    /// Direct child fields written so far
    counter: u32,
    /// Number of frames open when this one was pushed
    level: usize,
    role: Role,
    doc_id: u16,
}

#[derive(Debug, Clone, Copy)]
struct ArrayFrame {
    /// Offset of the reserved size field
    offset: usize,
    /// Elements written so far
    counter: u32,
    /// Number of frames open when this one was pushed
    level: usize,
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Innermost {
    Nothing,
    Document,
    Array(Kind),
}

/// Stateful writer of tagged field records
///
/// Borrows the buffer exclusively for the duration of an encoding pass.
#[derive(Debug)]
pub struct Serializer<'a> {
    out: &'a mut GrowableBuffer,
    documents: Vec<DocumentFrame>,
    arrays: Vec<ArrayFrame>,
}

impl<'a> Serializer<'a> {
    /// Create a serializer appending to `out`
    #[inline]
    pub fn new(out: &'a mut GrowableBuffer) -> Self {
        Self {
            out,
            documents: Vec::new(),
            arrays: Vec::new(),
        }
    }

    /// Number of currently open documents and arrays
    #[inline]
    pub fn depth(&self) -> usize {
        self.documents.len() + self.arrays.len()
    }

    /// Whether every opened frame has been closed
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.depth() == 0
    }

    /// Bytes committed to the underlying buffer so far
    #[inline]
    pub fn position(&self) -> usize {
        self.out.len()
    }

    /// The underlying buffer
    #[inline]
    pub fn buffer(&self) -> &GrowableBuffer {
        &*self.out
    }

    fn innermost(&self) -> Innermost {
        match (self.documents.last(), self.arrays.last()) {
            (None, None) => Innermost::Nothing,
            (Some(_), None) => Innermost::Document,
            (None, Some(a)) => Innermost::Array(a.kind),
            (Some(d), Some(a)) if d.level > a.level => Innermost::Document,
            (Some(_), Some(a)) => Innermost::Array(a.kind),
        }
    }

    #[cold]
    fn misuse(&self, reason: &'static str) -> Error {
        tracing::warn!(reason, depth = self.depth(), "encoder misuse rejected");
        Error::EncoderMisuse(reason)
    }

    #[cold]
    fn unbalanced(&self) -> Error {
        tracing::warn!(depth = self.depth(), "unbalanced close rejected");
        Error::UnbalancedFrame
    }

    // ─── Frames ─────────────────────────────────────────────────────────────

    /// Write a field header into the innermost open document
    fn begin_field(&mut self, tag: u8, inline: u8, field_id: u16) -> Result<()> {
        if self.innermost() != Innermost::Document {
            return Err(self.misuse("field written outside an open document"));
        }
        let frame = self
            .documents
            .last_mut()
            .ok_or(Error::EncoderMisuse("field written outside an open document"))?;
        if frame.counter >= u32::from(u16::MAX) {
            return Err(Error::RecordTooLarge);
        }
        frame.counter += 1;

        self.out.put_u8(tag)?;
        self.out.put_u8(inline)?;
        self.out.put_u16(field_id)
    }

    /// Fail unless one more document fits under the nesting limit
    fn check_nesting(&self) -> Result<()> {
        // the root sits at depth 0
        if self.documents.len() > MAX_NESTING_DEPTH {
            tracing::warn!(depth = self.documents.len(), "document nesting limit reached");
            return Err(Error::NestingTooDeep { offset: self.out.len() });
        }
        Ok(())
    }

    fn push_document(&mut self, doc_id: u16, role: Role) -> Result<()> {
        let frame = DocumentFrame {
            offset: self.out.len(),
            counter: 0,
            level: self.depth(),
            role,
            doc_id,
        };
        self.out.put_u32(0)?; // size
        self.out.put_u16(0)?; // count
        self.out.put_u16(doc_id)?;
        self.documents.push(frame);
        Ok(())
    }

    fn pop_document(&mut self, role: Role) -> Result<DocumentFrame> {
        let frame = match self.documents.last() {
            Some(frame) => *frame,
            None => return Err(self.unbalanced()),
        };
        if self.innermost() != Innermost::Document {
            return Err(self.unbalanced());
        }
        if frame.role != role {
            return Err(self.misuse("close does not match how the document was opened"));
        }

        let size = self.size_since(frame.offset)?;
        // counter never exceeds u16::MAX, see begin_field
        let count = u16::try_from(frame.counter).map_err(|_| Error::RecordTooLarge)?;
        self.out.patch_u32(frame.offset, size)?;
        self.out.patch_u16(frame.offset + 4, count)?;
        self.documents.pop();
        Ok(frame)
    }

    /// Bytes written after the size field that starts at `offset`
    fn size_since(&self, offset: usize) -> Result<u32> {
        let size = self.out.len() - offset - 4;
        u32::try_from(size).map_err(|_| Error::RecordTooLarge)
    }

    // ─── Documents ──────────────────────────────────────────────────────────

    /// Open the top-level document of a message
    pub fn open_root_document(&mut self, doc_id: u16) -> Result<()> {
        if !self.is_balanced() {
            return Err(self.misuse("root document opened inside another frame"));
        }
        self.push_document(doc_id, Role::Root)
    }

    /// Close the top-level document, backpatching its size and field count
    pub fn close_root_document(&mut self) -> Result<()> {
        if self.depth() != 1 {
            return Err(self.unbalanced());
        }
        let frame = self.pop_document(Role::Root)?;
        tracing::debug!(
            doc_id = frame.doc_id,
            fields = frame.counter,
            bytes = self.out.len() - frame.offset,
            "root document closed"
        );
        Ok(())
    }

    /// Open a document-valued field inside the current document
    pub fn open_nested_document(&mut self, field_id: u16, doc_id: u16) -> Result<()> {
        self.check_nesting()?;
        self.begin_field(Kind::Document.tag(), 0, field_id)?;
        self.push_document(doc_id, Role::Field)
    }

    /// Close the innermost document-valued field
    pub fn close_nested_document(&mut self) -> Result<()> {
        self.pop_document(Role::Field).map(|_| ())
    }

    // ─── Scalars ────────────────────────────────────────────────────────────

    /// Write a bool field; the value is inlined in the tag's second byte
    #[inline]
    pub fn bool_single(&mut self, field_id: u16, value: bool) -> Result<()> {
        self.begin_field(Kind::Bool.tag(), u8::from(value), field_id)
    }

    /// Write an int32 field, compact when it fits in an i8
    pub fn int32_single(&mut self, field_id: u16, value: i32) -> Result<()> {
        match i8::try_from(value) {
            Ok(small) => self.begin_field(Kind::Int32.compact_tag(), small as u8, field_id),
            Err(_) => {
                self.begin_field(Kind::Int32.tag(), 0, field_id)?;
                self.out.put_i32(value)
            }
        }
    }

    /// Write a uint32 field, compact when it fits in a u8
    pub fn uint32_single(&mut self, field_id: u16, value: u32) -> Result<()> {
        match u8::try_from(value) {
            Ok(small) => self.begin_field(Kind::Uint32.compact_tag(), small, field_id),
            Err(_) => {
                self.begin_field(Kind::Uint32.tag(), 0, field_id)?;
                self.out.put_u32(value)
            }
        }
    }

    /// Write an int64 field, compact when it fits in an i8
    pub fn int64_single(&mut self, field_id: u16, value: i64) -> Result<()> {
        match i8::try_from(value) {
            Ok(small) => self.begin_field(Kind::Int64.compact_tag(), small as u8, field_id),
            Err(_) => {
                self.begin_field(Kind::Int64.tag(), 0, field_id)?;
                self.out.put_i64(value)
            }
        }
    }

    /// Write a uint64 field, compact when it fits in a u8
    pub fn uint64_single(&mut self, field_id: u16, value: u64) -> Result<()> {
        match u8::try_from(value) {
            Ok(small) => self.begin_field(Kind::Uint64.compact_tag(), small, field_id),
            Err(_) => {
                self.begin_field(Kind::Uint64.tag(), 0, field_id)?;
                self.out.put_u64(value)
            }
        }
    }

    /// Write a float32 field
    #[inline]
    pub fn float32_single(&mut self, field_id: u16, value: f32) -> Result<()> {
        self.begin_field(Kind::Float32.tag(), 0, field_id)?;
        self.out.put_f32(value)
    }

    /// Write a float64 field
    #[inline]
    pub fn float64_single(&mut self, field_id: u16, value: f64) -> Result<()> {
        self.begin_field(Kind::Float64.tag(), 0, field_id)?;
        self.out.put_f64(value)
    }

    /// Write a datetime field holding a raw tick count
    #[inline]
    pub fn datetime_single(&mut self, field_id: u16, ticks: u64) -> Result<()> {
        self.begin_field(Kind::DateTime.tag(), 0, field_id)?;
        self.out.put_u64(ticks)
    }

    /// Write a string field
    ///
    /// Strings containing a NUL byte are rejected.
    pub fn string_single(&mut self, field_id: u16, value: &str) -> Result<()> {
        let reserved = self.check_string(value)?;
        self.begin_field(Kind::String.tag(), 0, field_id)?;
        self.put_string(value, reserved)
    }

    /// Write a binary field with an explicit length prefix
    pub fn binary_single(&mut self, field_id: u16, value: &[u8]) -> Result<()> {
        let len = Self::check_binary(value)?;
        self.begin_field(Kind::Binary.tag(), 0, field_id)?;
        self.put_binary(value, len)
    }

    fn check_string(&self, value: &str) -> Result<u32> {
        if value.as_bytes().contains(&0) {
            return Err(self.misuse("string contains a NUL byte"));
        }
        u32::try_from(string_reserved_size(value.len())).map_err(|_| Error::RecordTooLarge)
    }

    fn put_string(&mut self, value: &str, reserved: u32) -> Result<()> {
        self.out.put_u32(reserved)?;
        self.out.append(value.as_bytes())?;
        // padding includes the terminator
        self.out.pad(reserved as usize - value.len())
    }

    fn check_binary(value: &[u8]) -> Result<u32> {
        u32::try_from(value.len()).map_err(|_| Error::RecordTooLarge)
    }

    fn put_binary(&mut self, value: &[u8], len: u32) -> Result<()> {
        self.out.put_u32(len)?;
        self.out.append(value)?;
        self.out.pad(pad4(value.len()))
    }

    // ─── Arrays ─────────────────────────────────────────────────────────────

    fn begin_array(&mut self, kind: Kind, field_id: u16) -> Result<()> {
        self.begin_field(kind.array_tag(), 0, field_id)?;
        let frame = ArrayFrame {
            offset: self.out.len(),
            counter: 0,
            level: self.depth(),
            kind,
        };
        self.out.put_u32(0)?; // size
        self.out.put_u32(0)?; // count
        self.arrays.push(frame);
        Ok(())
    }

    /// Count one more element in the innermost array, which must be of `kind`
    fn element(&mut self, kind: Kind) -> Result<()> {
        if self.innermost() != Innermost::Array(kind) {
            return Err(self.misuse("element written outside an open array of its kind"));
        }
        if let Some(frame) = self.arrays.last_mut() {
            frame.counter = frame.counter.checked_add(1).ok_or(Error::RecordTooLarge)?;
        }
        Ok(())
    }

    /// Close the innermost array, backpatching its byte size and element count
    pub fn close_array(&mut self) -> Result<()> {
        let frame = match self.arrays.last() {
            Some(frame) => *frame,
            None => return Err(self.unbalanced()),
        };
        if !matches!(self.innermost(), Innermost::Array(_)) {
            return Err(self.unbalanced());
        }

        let size = self.size_since(frame.offset)?;
        self.out.patch_u32(frame.offset, size)?;
        self.out.patch_u32(frame.offset + 4, frame.counter)?;
        self.arrays.pop();
        Ok(())
    }

    /// Open an array of documents; add elements with [`Self::open_document_element`]
    #[inline]
    pub fn open_document_array(&mut self, field_id: u16) -> Result<()> {
        self.begin_array(Kind::Document, field_id)
    }

    /// Open one document element of the innermost document array
    pub fn open_document_element(&mut self, doc_id: u16) -> Result<()> {
        self.check_nesting()?;
        self.element(Kind::Document)?;
        self.push_document(doc_id, Role::Element)
    }

    /// Close the innermost document element
    pub fn close_document_element(&mut self) -> Result<()> {
        self.pop_document(Role::Element).map(|_| ())
    }

    /// Open an array of binary values; add elements with [`Self::binary_element`]
    #[inline]
    pub fn open_binary_array(&mut self, field_id: u16) -> Result<()> {
        self.begin_array(Kind::Binary, field_id)
    }

    /// Append one element to the innermost binary array
    pub fn binary_element(&mut self, value: &[u8]) -> Result<()> {
        let len = Self::check_binary(value)?;
        self.element(Kind::Binary)?;
        self.put_binary(value, len)
    }

    /// Open an array of strings; add elements with [`Self::string_element`]
    #[inline]
    pub fn open_string_array(&mut self, field_id: u16) -> Result<()> {
        self.begin_array(Kind::String, field_id)
    }

    /// Append one element to the innermost string array
    pub fn string_element(&mut self, value: &str) -> Result<()> {
        let reserved = self.check_string(value)?;
        self.element(Kind::String)?;
        self.put_string(value, reserved)
    }

    /// Write a complete fixed-width array in one call
    fn packed_array<T: Copy>(
        &mut self,
        kind: Kind,
        field_id: u16,
        values: &[T],
        put: fn(&mut GrowableBuffer, T) -> Result<()>,
    ) -> Result<()> {
        let count = u32::try_from(values.len()).map_err(|_| Error::RecordTooLarge)?;
        let width = kind.fixed_width().unwrap_or(1);
        let bytes = values
            .len()
            .checked_mul(width)
            .ok_or(Error::CapacityExceeded)?;

        self.begin_array(kind, field_id)?;
        self.out.reserve(bytes)?;
        for &value in values {
            put(&mut *self.out, value)?;
        }
        self.out.pad(pad4(bytes))?;
        if let Some(frame) = self.arrays.last_mut() {
            frame.counter = count;
        }
        self.close_array()
    }

    /// Write a bool array, one byte per element, padded to 4 bytes
    pub fn bool_array(&mut self, field_id: u16, values: &[bool]) -> Result<()> {
        self.packed_array(Kind::Bool, field_id, values, |out, v| out.put_u8(u8::from(v)))
    }

    /// Write an int32 array
    pub fn int32_array(&mut self, field_id: u16, values: &[i32]) -> Result<()> {
        self.packed_array(Kind::Int32, field_id, values, GrowableBuffer::put_i32)
    }

    /// Write a uint32 array
    pub fn uint32_array(&mut self, field_id: u16, values: &[u32]) -> Result<()> {
        self.packed_array(Kind::Uint32, field_id, values, GrowableBuffer::put_u32)
    }

    /// Write an int64 array
    pub fn int64_array(&mut self, field_id: u16, values: &[i64]) -> Result<()> {
        self.packed_array(Kind::Int64, field_id, values, GrowableBuffer::put_i64)
    }

    /// Write a uint64 array
    pub fn uint64_array(&mut self, field_id: u16, values: &[u64]) -> Result<()> {
        self.packed_array(Kind::Uint64, field_id, values, GrowableBuffer::put_u64)
    }

    /// Write a float32 array
    pub fn float32_array(&mut self, field_id: u16, values: &[f32]) -> Result<()> {
        self.packed_array(Kind::Float32, field_id, values, GrowableBuffer::put_f32)
    }

    /// Write a float64 array
    pub fn float64_array(&mut self, field_id: u16, values: &[f64]) -> Result<()> {
        self.packed_array(Kind::Float64, field_id, values, GrowableBuffer::put_f64)
    }

    /// Write a datetime array of raw tick counts
    pub fn datetime_array(&mut self, field_id: u16, ticks: &[u64]) -> Result<()> {
        self.packed_array(Kind::DateTime, field_id, ticks, GrowableBuffer::put_u64)
    }
}
