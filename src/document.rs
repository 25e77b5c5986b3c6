//! Message types bound to the encoder and decoder
//!
//! Code generated from a [`Schema`](crate::schema::Schema) implements
//! [`Document`] for each message: one struct field per schema field, the
//! schema field id used as the wire field id. The helpers in this module
//! keep the generated `deserialize` bodies short:
//!
//! ```rust
//! use tagdoc::document::{expect, Document};
//! use tagdoc::{DecodedDocument, Result, Serializer};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Document for Point {
//!     const DOC_ID: u16 = 1;
//!
//!     fn serialize_fields(&self, ser: &mut Serializer<'_>) -> Result<()> {
//!         ser.int32_single(1, self.x)?;
//!         ser.int32_single(2, self.y)
//!     }
//!
//!     fn deserialize(doc: &DecodedDocument<'_>) -> Result<Self> {
//!         let mut out = Self::default();
//!         for field in doc.iter() {
//!             match field.id {
//!                 1 => out.x = expect(field, field.value.as_i32())?,
//!                 2 => out.y = expect(field, field.value.as_i32())?,
//!                 _ => {}
//!             }
//!         }
//!         Ok(out)
//!     }
//! }
//!
//! let bytes = Point { x: 3, y: -400 }.serialize()?;
//! assert_eq!(Point::from_bytes(&bytes)?, Point { x: 3, y: -400 });
//! # Ok::<(), tagdoc::Error>(())
//! ```

use alloc::vec::Vec;

use crate::buffer::GrowableBuffer;
use crate::decoder::read_document;
use crate::encoder::Serializer;
use crate::error::{Error, Result};
use crate::value::{DecodedDocument, DecodedField};

/// Shared handle for message fields stored by shared ownership
pub type Shared<T> = alloc::rc::Rc<T>;

/// A message type with a fixed document id
pub trait Document: Sized {
    /// Document id written in the record header
    const DOC_ID: u16;

    /// Write this message's fields into the currently open document
    fn serialize_fields(&self, ser: &mut Serializer<'_>) -> Result<()>;

    /// Build a value from a decoded document
    ///
    /// Implementations ignore unknown field ids.
    fn deserialize(doc: &DecodedDocument<'_>) -> Result<Self>;

    /// Encode as a root document into a fresh buffer
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = GrowableBuffer::new();
        self.serialize_into(&mut buf)?;
        Ok(buf.into_vec())
    }

    /// Append as a root document to `buf`
    fn serialize_into(&self, buf: &mut GrowableBuffer) -> Result<()> {
        let mut ser = Serializer::new(buf);
        ser.open_root_document(Self::DOC_ID)?;
        self.serialize_fields(&mut ser)?;
        ser.close_root_document()
    }

    /// Write as a document-valued field of the current document
    fn write_nested(&self, field_id: u16, ser: &mut Serializer<'_>) -> Result<()> {
        ser.open_nested_document(field_id, Self::DOC_ID)?;
        self.serialize_fields(ser)?;
        ser.close_nested_document()
    }

    /// Write as one element of the innermost document array
    fn write_element(&self, ser: &mut Serializer<'_>) -> Result<()> {
        ser.open_document_element(Self::DOC_ID)?;
        self.serialize_fields(ser)?;
        ser.close_document_element()
    }

    /// Decode a root document, checking its document id
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = read_document(bytes)?;
        check_doc_id::<Self>(&doc)?;
        Self::deserialize(&doc)
    }
}

/// Fail unless `doc` carries `T`'s document id
pub fn check_doc_id<T: Document>(doc: &DecodedDocument<'_>) -> Result<()> {
    if doc.doc_id != T::DOC_ID {
        return Err(Error::UnexpectedDocument {
            expected: T::DOC_ID,
            found: doc.doc_id,
        });
    }
    Ok(())
}

/// Unwrap a typed accessor result for `field`
#[inline]
pub fn expect<T>(field: &DecodedField<'_>, value: Option<T>) -> Result<T> {
    value.ok_or(Error::FieldKindMismatch { field_id: field.id })
}

/// Decode a document-valued field as `T`
pub fn nested<T: Document>(field: &DecodedField<'_>) -> Result<T> {
    let doc = expect(field, field.value.as_document())?;
    check_doc_id::<T>(doc)?;
    T::deserialize(doc)
}

/// Decode a document-array field as a sequence of `T`
pub fn elements<T: Document>(field: &DecodedField<'_>) -> Result<Vec<T>> {
    let array = expect(field, field.value.as_array())?;
    let docs = expect(field, array.as_documents())?;
    docs.iter()
        .map(|doc| {
            check_doc_id::<T>(doc)?;
            T::deserialize(doc)
        })
        .collect()
}

/// Write a repeated message field as a document array
pub fn write_elements<T: Document>(
    ser: &mut Serializer<'_>,
    field_id: u16,
    items: &[T],
) -> Result<()> {
    ser.open_document_array(field_id)?;
    for item in items {
        item.write_element(ser)?;
    }
    ser.close_array()
}
