//! tagdoc: compact self-describing binary documents
//!
//! A document is a tree of tag/length/value field records written in a
//! single forward pass into a growable buffer. Headers whose values are
//! only known at the end (sizes, counts) are reserved as zeros and
//! backpatched by offset when the document or array closes.
//!
//! # Wire Format
//!
//! All multi-byte values use the host's native byte order.
//!
//! ```text
//! Document record:
//! +-----------+-----------+-----------+----------------------------+
//! | Size u32  | Count u16 | DocId u16 | Field records ...          |
//! +-----------+-----------+-----------+----------------------------+
//!   Size = bytes after the size field, Count = direct fields
//!
//! Field record:
//! +--------+--------------+-----------+----------------------------+
//! | Tag u8 | Pad/Value u8 | Id u16    | Payload (depends on tag)   |
//! +--------+--------------+-----------+----------------------------+
//!
//! Array payload (tag 0x81..0x8B):
//! +-----------+-----------+----------------------------------------+
//! | Size u32  | Count u32 | Packed elements                        |
//! +-----------+-----------+----------------------------------------+
//! ```
//!
//! | Tag         | Kind            | Payload                                 |
//! |-------------|-----------------|-----------------------------------------|
//! | 0x01        | document        | document record                         |
//! | 0x02        | binary          | len u32, bytes, zero pad to 4           |
//! | 0x03        | datetime        | u64 ticks                               |
//! | 0x04 / 0x05 | float32/float64 | f32 / f64                               |
//! | 0x06        | string          | reserved u32, utf8, zero pad (with NUL) |
//! | 0x07        | bool            | none, value in the pad byte             |
//! | 0x08..0x0B  | int32..uint64   | full-width value                        |
//! | 0x48..0x4B  | compact ints    | none, value in the pad byte             |
//!
//! # Example
//!
//! ```rust
//! use tagdoc::*;
//!
//! let mut buf = GrowableBuffer::new();
//! let mut ser = Serializer::new(&mut buf);
//!
//! ser.open_root_document(1)?;
//! ser.bool_single(1, true)?;
//! ser.float32_single(2, 5.5)?;
//! ser.uint32_single(3, 200)?; // compact: fits in one byte
//! ser.close_root_document()?;
//!
//! let doc = read_document(buf.as_slice())?;
//! assert_eq!(doc.doc_id, 1);
//! assert_eq!(doc.get(3).and_then(DecodedValue::as_u32), Some(200));
//! # Ok::<(), tagdoc::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod buffer;
pub mod decoder;
pub mod document;
pub mod encoder;
pub mod error;
pub mod schema;
pub mod tag;
pub mod value;

// Re-export main types
pub use buffer::GrowableBuffer;
pub use decoder::{document_len, field_len, read_document, read_documents};
pub use document::{Document, Shared};
pub use encoder::Serializer;
pub use error::{Error, Result};
pub use tag::Kind;
pub use value::{DecodedArray, DecodedDocument, DecodedField, DecodedValue};

/// Largest encodable buffer (4 GiB - 1)
pub const MAX_DOCUMENT_SIZE: usize = u32::MAX as usize;

/// Deepest document nesting below the root, enforced by both the encoder
/// and the decoder
pub const MAX_NESTING_DEPTH: usize = 64;
