//! Zero-copy document decoder
//!
//! The decoder never trusts a length field: every size is checked against
//! the enclosing record before it is used, and anything that does not fit
//! is reported as [`Error::TruncatedOrCorrupt`] with the offending offset.
//! Nesting past [`crate::MAX_NESTING_DEPTH`] is [`Error::NestingTooDeep`].
//! Records of unknown kinds are kept verbatim so that documents written by
//! a newer schema stay readable.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::tag::{align4, Form, Kind, Tag, DOCUMENT_HEADER_SIZE, FIELD_HEADER_SIZE};
use crate::value::{DecodedArray, DecodedDocument, DecodedField, DecodedValue};
use crate::MAX_NESTING_DEPTH;

/// Decode a buffer holding exactly one root document
pub fn read_document(buf: &[u8]) -> Result<DecodedDocument<'_>> {
    let decoder = Decoder::new(buf);
    let (doc, end) = decoder.document(0, buf.len(), 0)?;
    if end != buf.len() {
        return Err(Error::corrupt(end));
    }
    Ok(doc)
}

/// Decode a buffer holding zero or more concatenated root documents
pub fn read_documents(buf: &[u8]) -> Result<Vec<DecodedDocument<'_>>> {
    let decoder = Decoder::new(buf);
    let mut docs = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let (doc, end) = decoder.document(pos, buf.len(), 0)?;
        docs.push(doc);
        pos = end;
    }
    Ok(docs)
}

/// Total length of the document record starting at `offset`
pub fn document_len(buf: &[u8], offset: usize) -> Result<usize> {
    let mut cursor = Cursor::at(buf, offset);
    if cursor.remaining() < DOCUMENT_HEADER_SIZE {
        return Err(Error::corrupt(offset));
    }
    let size = cursor.get_u32()? as usize;
    let len = size.checked_add(4).ok_or(Error::corrupt(offset))?;
    if len < DOCUMENT_HEADER_SIZE || len > buf.len() - offset {
        return Err(Error::corrupt(offset));
    }
    Ok(len)
}

/// Total length of the field record starting at `offset`
///
/// Only the tag and, where present, the record's own size field are
/// inspected. Plain-form records of unknown kinds cannot be sized and are
/// reported as corrupt.
pub fn field_len(buf: &[u8], offset: usize) -> Result<usize> {
    let mut cursor = Cursor::at(buf, offset);
    if cursor.remaining() < FIELD_HEADER_SIZE {
        return Err(Error::corrupt(offset));
    }
    let tag = Tag::parse(cursor.get_u8()?, offset)?;
    cursor.skip(3)?;

    let payload = match (tag.form, tag.kind) {
        (Form::Compact, _) | (Form::Single, Some(Kind::Bool)) => 0,
        (Form::Single, Some(Kind::Int32 | Kind::Uint32 | Kind::Float32)) => 4,
        (Form::Single, Some(Kind::Int64 | Kind::Uint64 | Kind::Float64 | Kind::DateTime)) => 8,
        (Form::Single, Some(Kind::String)) => {
            let reserved = cursor.get_u32()? as usize;
            reserved.checked_add(4).ok_or(Error::corrupt(offset))?
        }
        (Form::Single, Some(Kind::Binary)) => {
            let len = cursor.get_u32()? as usize;
            align4(len).checked_add(4).ok_or(Error::corrupt(offset))?
        }
        (Form::Single, Some(Kind::Document)) => document_len(buf, offset + FIELD_HEADER_SIZE)?,
        (Form::Array, _) => {
            let size = cursor.get_u32()? as usize;
            if size < 4 {
                return Err(Error::corrupt(offset));
            }
            size.checked_add(4).ok_or(Error::corrupt(offset))?
        }
        (Form::Single, None) => return Err(Error::corrupt(offset)),
    };

    let len = FIELD_HEADER_SIZE + payload;
    if len > buf.len() - offset {
        return Err(Error::corrupt(offset));
    }
    Ok(len)
}

/// Bounded read cursor; positions are absolute offsets into the input
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor over `buf` starting at `pos`
    #[inline]
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the end of the input
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Skip `n` bytes
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.get_bytes(n).map(|_| ())
    }

    /// Read `n` raw bytes
    #[inline]
    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::corrupt(self.pos));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    fn get_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.get_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_bytes(1)?[0])
    }

    /// Read a u16 value (native byte order)
    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        self.get_array().map(u16::from_ne_bytes)
    }

    /// Read a u32 value (native byte order)
    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        self.get_array().map(u32::from_ne_bytes)
    }

    /// Read a u64 value (native byte order)
    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        self.get_array().map(u64::from_ne_bytes)
    }

    /// Read an i32 value (native byte order)
    #[inline]
    pub fn get_i32(&mut self) -> Result<i32> {
        self.get_array().map(i32::from_ne_bytes)
    }

    /// Read an i64 value (native byte order)
    #[inline]
    pub fn get_i64(&mut self) -> Result<i64> {
        self.get_array().map(i64::from_ne_bytes)
    }

    /// Read an f32 value (native byte order)
    #[inline]
    pub fn get_f32(&mut self) -> Result<f32> {
        self.get_array().map(f32::from_ne_bytes)
    }

    /// Read an f64 value (native byte order)
    #[inline]
    pub fn get_f64(&mut self) -> Result<f64> {
        self.get_array().map(f64::from_ne_bytes)
    }

    /// Read a string payload: reserved size, content, zero padding
    pub fn get_string(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let reserved = self.get_u32()? as usize;
        let region = self.get_bytes(reserved)?;
        let len = region
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::corrupt(start))?;
        core::str::from_utf8(&region[..len]).map_err(|_| Error::corrupt(start))
    }

    /// Read a binary payload: length, bytes, zero padding
    pub fn get_binary(&mut self) -> Result<&'a [u8]> {
        let len = self.get_u32()? as usize;
        let bytes = self.get_bytes(len)?;
        self.skip(align4(len) - len)?;
        Ok(bytes)
    }
}

struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Decode the document at `start`, which must end at or before `limit`
    fn document(
        &self,
        start: usize,
        limit: usize,
        depth: usize,
    ) -> Result<(DecodedDocument<'a>, usize)> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep { offset: start });
        }
        let region = &self.buf[..limit];
        let end = start + document_len(region, start)?;

        let mut cursor = Cursor::at(region, start + 4);
        let count = cursor.get_u16()?;
        let doc_id = cursor.get_u16()?;

        let region = &self.buf[..end];
        let mut fields = Vec::with_capacity(usize::from(count).min((end - start) / 4));
        let mut pos = start + DOCUMENT_HEADER_SIZE;
        let mut opaque_tail = false;

        while pos < end {
            if end - pos < FIELD_HEADER_SIZE {
                return Err(Error::corrupt(pos));
            }
            let tag = Tag::parse(region[pos], pos)?;
            let id = u16::from_ne_bytes([region[pos + 2], region[pos + 3]]);

            if tag.form == Form::Single && tag.kind.is_none() {
                // cannot be sized: keep the rest of this document as is
                tracing::debug!(tag = tag.raw, offset = pos, "unknown kind, keeping document tail");
                fields.push(DecodedField {
                    id,
                    value: DecodedValue::Unknown {
                        tag: tag.raw,
                        raw: &region[pos..end],
                    },
                });
                opaque_tail = true;
                break;
            }

            let next = pos + field_len(region, pos)?;
            let value = self.field_value(tag, pos, next, depth)?;
            fields.push(DecodedField { id, value });
            pos = next;
        }

        if !opaque_tail && fields.len() != usize::from(count) {
            return Err(Error::corrupt(start));
        }
        Ok((DecodedDocument { doc_id, fields }, end))
    }

    /// Decode the payload of the record spanning `[pos, next)`
    fn field_value(
        &self,
        tag: Tag,
        pos: usize,
        next: usize,
        depth: usize,
    ) -> Result<DecodedValue<'a>> {
        let region = &self.buf[..next];
        let inline = region[pos + 1];
        let mut cursor = Cursor::at(region, pos + FIELD_HEADER_SIZE);

        let kind = match tag.kind {
            Some(kind) => kind,
            None => {
                tracing::debug!(tag = tag.raw, offset = pos, "unknown kind preserved");
                return Ok(DecodedValue::Unknown {
                    tag: tag.raw,
                    raw: &region[pos..next],
                });
            }
        };

        let value = match tag.form {
            Form::Compact => match kind {
                Kind::Int32 => DecodedValue::Int32(i32::from(inline as i8)),
                Kind::Uint32 => DecodedValue::Uint32(u32::from(inline)),
                Kind::Int64 => DecodedValue::Int64(i64::from(inline as i8)),
                Kind::Uint64 => DecodedValue::Uint64(u64::from(inline)),
                // Tag::parse only accepts compact integer kinds
                _ => return Err(Error::corrupt(pos)),
            },
            Form::Single => match kind {
                Kind::Bool => DecodedValue::Bool(inline != 0),
                Kind::Int32 => DecodedValue::Int32(cursor.get_i32()?),
                Kind::Uint32 => DecodedValue::Uint32(cursor.get_u32()?),
                Kind::Int64 => DecodedValue::Int64(cursor.get_i64()?),
                Kind::Uint64 => DecodedValue::Uint64(cursor.get_u64()?),
                Kind::Float32 => DecodedValue::Float32(cursor.get_f32()?),
                Kind::Float64 => DecodedValue::Float64(cursor.get_f64()?),
                Kind::DateTime => DecodedValue::DateTime(cursor.get_u64()?),
                Kind::String => DecodedValue::String(cursor.get_string()?),
                Kind::Binary => DecodedValue::Binary(cursor.get_binary()?),
                Kind::Document => {
                    let (doc, _) = self.document(cursor.position(), next, depth + 1)?;
                    DecodedValue::Document(doc)
                }
            },
            Form::Array => {
                cursor.skip(4)?; // size, already checked by field_len
                let count = cursor.get_u32()? as usize;
                DecodedValue::Array(self.array(kind, count, cursor.position(), next, depth)?)
            }
        };
        Ok(value)
    }

    /// Decode `count` elements packed in `[start, end)`
    fn array(
        &self,
        kind: Kind,
        count: usize,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<DecodedArray<'a>> {
        let region = &self.buf[..end];

        if let Some(width) = kind.fixed_width() {
            let bytes = count.checked_mul(width).ok_or(Error::corrupt(start))?;
            if bytes > end - start || align4(bytes) != end - start {
                return Err(Error::corrupt(start));
            }
            let packed = &region[start..start + bytes];
            return Ok(unpack(kind, packed));
        }

        // variable-size elements, never more than one per 4 bytes
        let capacity = count.min((end - start) / 4);
        let mut cursor = Cursor::at(region, start);
        let array = match kind {
            Kind::String => {
                let mut items = Vec::with_capacity(capacity);
                for _ in 0..count {
                    items.push(cursor.get_string()?);
                }
                DecodedArray::Strings(items)
            }
            Kind::Binary => {
                let mut items = Vec::with_capacity(capacity);
                for _ in 0..count {
                    items.push(cursor.get_binary()?);
                }
                DecodedArray::Binaries(items)
            }
            _ => {
                let mut items = Vec::with_capacity(capacity);
                for _ in 0..count {
                    let (doc, next) = self.document(cursor.position(), end, depth + 1)?;
                    items.push(doc);
                    cursor = Cursor::at(region, next);
                }
                DecodedArray::Documents(items)
            }
        };

        if cursor.position() != end {
            return Err(Error::corrupt(cursor.position()));
        }
        Ok(array)
    }
}

/// Copy fixed-width elements out of `packed`
fn unpack<'a>(kind: Kind, packed: &[u8]) -> DecodedArray<'a> {
    fn chunks<T, const N: usize>(packed: &[u8], f: fn([u8; N]) -> T) -> Vec<T> {
        packed
            .chunks_exact(N)
            .map(|c| {
                let mut bytes = [0u8; N];
                bytes.copy_from_slice(c);
                f(bytes)
            })
            .collect()
    }

    match kind {
        Kind::Bool => DecodedArray::Bools(packed.iter().map(|&b| b != 0).collect()),
        Kind::Int32 => DecodedArray::Int32s(chunks(packed, i32::from_ne_bytes)),
        Kind::Uint32 => DecodedArray::Uint32s(chunks(packed, u32::from_ne_bytes)),
        Kind::Float32 => DecodedArray::Float32s(chunks(packed, f32::from_ne_bytes)),
        Kind::Int64 => DecodedArray::Int64s(chunks(packed, i64::from_ne_bytes)),
        Kind::Uint64 => DecodedArray::Uint64s(chunks(packed, u64::from_ne_bytes)),
        Kind::Float64 => DecodedArray::Float64s(chunks(packed, f64::from_ne_bytes)),
        _ => DecodedArray::DateTimes(chunks(packed, u64::from_ne_bytes)),
    }
}
