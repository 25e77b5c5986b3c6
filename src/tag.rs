//! Wire kinds, tag bytes and alignment helpers
//!
//! A tag byte is a base kind in the low six bits plus two form bits:
//!
//! ```text
//!   bit 7   bit 6   bits 5..0
//!  +-------+-------+-----------+
//!  | ARRAY |COMPACT| base kind |
//!  +-------+-------+-----------+
//! ```
//!
//! Only the four integer kinds have a compact form, and only fixed-width
//! kinds plus document/binary/string have an array form. Both form bits set
//! at once is never valid.

use crate::error::{Error, Result};

/// Compact-form flag (value inlined in the pad byte)
pub const COMPACT_FLAG: u8 = 0x40;

/// Array-form flag
pub const ARRAY_FLAG: u8 = 0x80;

/// Mask selecting the base kind bits of a tag
pub const KIND_MASK: u8 = 0x3F;

/// Size of a field record header: tag, pad/value byte, field id
pub const FIELD_HEADER_SIZE: usize = 4;

/// Size of a document record header: size, count, document id
pub const DOCUMENT_HEADER_SIZE: usize = 8;

/// Size of the array header following the field header: size, count
pub const ARRAY_HEADER_SIZE: usize = 8;

/// Base kind of a field record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// Nested document
    Document = 0x01,
    /// Length-prefixed raw bytes
    Binary = 0x02,
    /// 64-bit tick count
    DateTime = 0x03,
    /// IEEE 754 single precision
    Float32 = 0x04,
    /// IEEE 754 double precision
    Float64 = 0x05,
    /// UTF-8 text
    String = 0x06,
    /// Boolean, inlined in the pad byte
    Bool = 0x07,
    /// Signed 32-bit integer
    Int32 = 0x08,
    /// Unsigned 32-bit integer
    Uint32 = 0x09,
    /// Signed 64-bit integer
    Int64 = 0x0A,
    /// Unsigned 64-bit integer
    Uint64 = 0x0B,
}

impl Kind {
    /// Map a base kind byte to a known kind
    #[inline]
    pub const fn from_base(base: u8) -> Option<Kind> {
        Some(match base {
            0x01 => Kind::Document,
            0x02 => Kind::Binary,
            0x03 => Kind::DateTime,
            0x04 => Kind::Float32,
            0x05 => Kind::Float64,
            0x06 => Kind::String,
            0x07 => Kind::Bool,
            0x08 => Kind::Int32,
            0x09 => Kind::Uint32,
            0x0A => Kind::Int64,
            0x0B => Kind::Uint64,
            _ => return None,
        })
    }

    /// Tag byte for a single field of this kind
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Tag byte for the compact form
    #[inline]
    pub const fn compact_tag(self) -> u8 {
        self as u8 | COMPACT_FLAG
    }

    /// Tag byte for an array of this kind
    #[inline]
    pub const fn array_tag(self) -> u8 {
        self as u8 | ARRAY_FLAG
    }

    /// Whether values of this kind have a one-byte compact form
    #[inline]
    pub const fn has_compact_form(self) -> bool {
        matches!(self, Kind::Int32 | Kind::Uint32 | Kind::Int64 | Kind::Uint64)
    }

    /// Width of one packed element in a fixed-width array, if any
    #[inline]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Kind::Bool => Some(1),
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => Some(4),
            Kind::Int64 | Kind::Uint64 | Kind::Float64 | Kind::DateTime => Some(8),
            Kind::Document | Kind::Binary | Kind::String => None,
        }
    }

    /// Short lowercase name used by diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Document => "document",
            Kind::Binary => "binary",
            Kind::DateTime => "datetime",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Int32 => "int32",
            Kind::Uint32 => "uint32",
            Kind::Int64 => "int64",
            Kind::Uint64 => "uint64",
        }
    }
}

impl core::fmt::Display for Kind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Record form selected by the tag's high bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// Full-width payload after the field header
    Single,
    /// Value inlined in the pad byte, no payload
    Compact,
    /// Sized array header followed by packed elements
    Array,
}

/// A parsed tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Raw tag byte as found on the wire
    pub raw: u8,
    /// Record form
    pub form: Form,
    /// Known base kind, `None` for kinds this reader does not know
    pub kind: Option<Kind>,
}

impl Tag {
    /// Parse a tag byte found at `offset`
    ///
    /// Unknown base kinds are accepted so that newer writers stay readable;
    /// both form bits set, or a zero base kind, is corrupt input.
    #[inline]
    pub fn parse(raw: u8, offset: usize) -> Result<Tag> {
        let form = match raw & (ARRAY_FLAG | COMPACT_FLAG) {
            0 => Form::Single,
            COMPACT_FLAG => Form::Compact,
            ARRAY_FLAG => Form::Array,
            _ => return Err(Error::corrupt(offset)),
        };
        let base = raw & KIND_MASK;
        if base == 0 {
            return Err(Error::corrupt(offset));
        }
        let kind = Kind::from_base(base);

        // Known kinds must use a form they support.
        if let Some(kind) = kind {
            let valid = match form {
                Form::Single => true,
                Form::Compact => kind.has_compact_form(),
                Form::Array => true,
            };
            if !valid {
                return Err(Error::corrupt(offset));
            }
        }

        Ok(Tag { raw, form, kind })
    }
}

/// Round `n` up to the next multiple of 4
#[inline]
pub const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Number of zero bytes needed to pad `n` to a multiple of 4
#[inline]
pub const fn pad4(n: usize) -> usize {
    align4(n) - n
}

/// Reserved size of a string payload holding `len` content bytes
///
/// Always leaves room for at least one zero terminator.
#[inline]
pub const fn string_reserved_size(len: usize) -> usize {
    align4(len + 1)
}
