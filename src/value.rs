//! Decoded documents and values
//!
//! Decoding borrows from the input: strings, binary values and unknown
//! records are zero-copy slices. Fixed-width arrays are copied out, since
//! their elements carry no alignment guarantee inside the input.

use alloc::vec::Vec;

use crate::tag::Kind;

/// A decoded document record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedDocument<'a> {
    /// Document id from the record header
    pub doc_id: u16,
    /// Direct fields in wire order
    pub fields: Vec<DecodedField<'a>>,
}

/// One field of a decoded document
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField<'a> {
    /// Field id from the field header
    pub id: u16,
    /// Field payload
    pub value: DecodedValue<'a>,
}

/// Payload of a decoded field
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue<'a> {
    /// Boolean
    Bool(bool),
    /// Signed 32-bit integer (compact or full form)
    Int32(i32),
    /// Unsigned 32-bit integer (compact or full form)
    Uint32(u32),
    /// Signed 64-bit integer (compact or full form)
    Int64(i64),
    /// Unsigned 64-bit integer (compact or full form)
    Uint64(u64),
    /// Single precision float
    Float32(f32),
    /// Double precision float
    Float64(f64),
    /// Raw datetime ticks
    DateTime(u64),
    /// UTF-8 text
    String(&'a str),
    /// Raw bytes
    Binary(&'a [u8]),
    /// Nested document
    Document(DecodedDocument<'a>),
    /// Homogeneous array
    Array(DecodedArray<'a>),
    /// Record of a kind this reader does not know, kept verbatim
    Unknown {
        /// Raw tag byte
        tag: u8,
        /// The whole record, field header included
        raw: &'a [u8],
    },
}

/// Elements of a decoded array
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedArray<'a> {
    /// Document elements
    Documents(Vec<DecodedDocument<'a>>),
    /// Binary elements
    Binaries(Vec<&'a [u8]>),
    /// Datetime elements
    DateTimes(Vec<u64>),
    /// Float32 elements
    Float32s(Vec<f32>),
    /// Float64 elements
    Float64s(Vec<f64>),
    /// String elements
    Strings(Vec<&'a str>),
    /// Bool elements
    Bools(Vec<bool>),
    /// Int32 elements
    Int32s(Vec<i32>),
    /// Uint32 elements
    Uint32s(Vec<u32>),
    /// Int64 elements
    Int64s(Vec<i64>),
    /// Uint64 elements
    Uint64s(Vec<u64>),
}

impl<'a> DecodedDocument<'a> {
    /// First field with the given id
    pub fn get(&self, id: u16) -> Option<&DecodedValue<'a>> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    /// Number of direct fields
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in wire order
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, DecodedField<'a>> {
        self.fields.iter()
    }
}

impl<'a> DecodedValue<'a> {
    /// Wire kind, or `None` for unknown records
    pub fn kind(&self) -> Option<Kind> {
        Some(match self {
            DecodedValue::Bool(_) => Kind::Bool,
            DecodedValue::Int32(_) => Kind::Int32,
            DecodedValue::Uint32(_) => Kind::Uint32,
            DecodedValue::Int64(_) => Kind::Int64,
            DecodedValue::Uint64(_) => Kind::Uint64,
            DecodedValue::Float32(_) => Kind::Float32,
            DecodedValue::Float64(_) => Kind::Float64,
            DecodedValue::DateTime(_) => Kind::DateTime,
            DecodedValue::String(_) => Kind::String,
            DecodedValue::Binary(_) => Kind::Binary,
            DecodedValue::Document(_) => Kind::Document,
            DecodedValue::Array(a) => a.kind(),
            DecodedValue::Unknown { .. } => return None,
        })
    }

    /// Boolean value
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DecodedValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Int32 value
    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            DecodedValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Uint32 value
    #[inline]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            DecodedValue::Uint32(v) => Some(*v),
            _ => None,
        }
    }

    /// Int64 value
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Uint64 value
    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DecodedValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    /// Float32 value
    #[inline]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            DecodedValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    /// Float64 value
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DecodedValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Datetime ticks
    #[inline]
    pub fn as_datetime(&self) -> Option<u64> {
        match self {
            DecodedValue::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// String value
    #[inline]
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            DecodedValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Binary value
    #[inline]
    pub fn as_binary(&self) -> Option<&'a [u8]> {
        match self {
            DecodedValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Nested document
    #[inline]
    pub fn as_document(&self) -> Option<&DecodedDocument<'a>> {
        match self {
            DecodedValue::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Array value
    #[inline]
    pub fn as_array(&self) -> Option<&DecodedArray<'a>> {
        match self {
            DecodedValue::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl<'a> DecodedArray<'a> {
    /// Element kind
    pub fn kind(&self) -> Kind {
        match self {
            DecodedArray::Documents(_) => Kind::Document,
            DecodedArray::Binaries(_) => Kind::Binary,
            DecodedArray::DateTimes(_) => Kind::DateTime,
            DecodedArray::Float32s(_) => Kind::Float32,
            DecodedArray::Float64s(_) => Kind::Float64,
            DecodedArray::Strings(_) => Kind::String,
            DecodedArray::Bools(_) => Kind::Bool,
            DecodedArray::Int32s(_) => Kind::Int32,
            DecodedArray::Uint32s(_) => Kind::Uint32,
            DecodedArray::Int64s(_) => Kind::Int64,
            DecodedArray::Uint64s(_) => Kind::Uint64,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            DecodedArray::Documents(v) => v.len(),
            DecodedArray::Binaries(v) => v.len(),
            DecodedArray::DateTimes(v) => v.len(),
            DecodedArray::Float32s(v) => v.len(),
            DecodedArray::Float64s(v) => v.len(),
            DecodedArray::Strings(v) => v.len(),
            DecodedArray::Bools(v) => v.len(),
            DecodedArray::Int32s(v) => v.len(),
            DecodedArray::Uint32s(v) => v.len(),
            DecodedArray::Int64s(v) => v.len(),
            DecodedArray::Uint64s(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Document elements
    pub fn as_documents(&self) -> Option<&[DecodedDocument<'a>]> {
        match self {
            DecodedArray::Documents(v) => Some(v),
            _ => None,
        }
    }

    /// String elements
    pub fn as_strings(&self) -> Option<&[&'a str]> {
        match self {
            DecodedArray::Strings(v) => Some(v),
            _ => None,
        }
    }

    /// Binary elements
    pub fn as_binaries(&self) -> Option<&[&'a [u8]]> {
        match self {
            DecodedArray::Binaries(v) => Some(v),
            _ => None,
        }
    }

    /// Int32 elements
    pub fn as_i32s(&self) -> Option<&[i32]> {
        match self {
            DecodedArray::Int32s(v) => Some(v),
            _ => None,
        }
    }

    /// Int64 elements
    pub fn as_i64s(&self) -> Option<&[i64]> {
        match self {
            DecodedArray::Int64s(v) => Some(v),
            _ => None,
        }
    }

    /// Bool elements
    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            DecodedArray::Bools(v) => Some(v),
            _ => None,
        }
    }

    /// Uint32 elements
    pub fn as_u32s(&self) -> Option<&[u32]> {
        match self {
            DecodedArray::Uint32s(v) => Some(v),
            _ => None,
        }
    }

    /// Uint64 elements
    pub fn as_u64s(&self) -> Option<&[u64]> {
        match self {
            DecodedArray::Uint64s(v) => Some(v),
            _ => None,
        }
    }

    /// Float32 elements
    pub fn as_f32s(&self) -> Option<&[f32]> {
        match self {
            DecodedArray::Float32s(v) => Some(v),
            _ => None,
        }
    }

    /// Float64 elements
    pub fn as_f64s(&self) -> Option<&[f64]> {
        match self {
            DecodedArray::Float64s(v) => Some(v),
            _ => None,
        }
    }

    /// Datetime elements as raw tick counts
    ///
    /// Distinct from [`Self::as_u64s`] although both hold `u64`.
    pub fn as_datetimes(&self) -> Option<&[u64]> {
        match self {
            DecodedArray::DateTimes(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_document_get_returns_first_match() {
        let doc = DecodedDocument {
            doc_id: 1,
            fields: vec![
                DecodedField { id: 1, value: DecodedValue::Uint32(5) },
                DecodedField { id: 2, value: DecodedValue::String("x") },
                DecodedField { id: 1, value: DecodedValue::Uint32(6) },
            ],
        };
        assert_eq!(doc.get(1).and_then(DecodedValue::as_u32), Some(5));
        assert_eq!(doc.get(2).and_then(DecodedValue::as_str), Some("x"));
        assert!(doc.get(3).is_none());
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_accessors_are_kind_strict() {
        let value = DecodedValue::Int64(-3);
        assert_eq!(value.as_i64(), Some(-3));
        assert_eq!(value.as_i32(), None);
        assert_eq!(value.kind(), Some(Kind::Int64));

        let unknown = DecodedValue::Unknown { tag: 0x4F, raw: &[0x4F, 1, 0, 0] };
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn test_array_kind_and_len() {
        let array = DecodedArray::Bools(vec![true, false]);
        assert_eq!(array.kind(), Kind::Bool);
        assert_eq!(array.len(), 2);
        assert!(DecodedArray::Strings(vec![]).is_empty());
        assert_eq!(DecodedValue::Array(array).kind(), Some(Kind::Bool));
    }

    #[test]
    fn test_array_accessors_are_kind_strict() {
        let bools = DecodedArray::Bools(vec![true]);
        let u32s = DecodedArray::Uint32s(vec![7]);
        let u64s = DecodedArray::Uint64s(vec![8]);
        let f32s = DecodedArray::Float32s(vec![1.5]);
        let f64s = DecodedArray::Float64s(vec![2.5]);
        let ticks = DecodedArray::DateTimes(vec![9]);

        assert_eq!(bools.as_bools(), Some(&[true][..]));
        assert_eq!(u32s.as_u32s(), Some(&[7][..]));
        assert_eq!(u64s.as_u64s(), Some(&[8][..]));
        assert_eq!(f32s.as_f32s(), Some(&[1.5][..]));
        assert_eq!(f64s.as_f64s(), Some(&[2.5][..]));
        assert_eq!(ticks.as_datetimes(), Some(&[9][..]));

        // same element width or type is not enough
        assert_eq!(u64s.as_datetimes(), None);
        assert_eq!(ticks.as_u64s(), None);
        assert_eq!(u32s.as_i32s(), None);
        assert_eq!(f32s.as_f64s(), None);
        assert_eq!(f64s.as_f32s(), None);
        assert_eq!(bools.as_u32s(), None);
        assert_eq!(DecodedArray::Int64s(vec![1]).as_u64s(), None);
        assert_eq!(DecodedArray::Int32s(vec![1]).as_bools(), None);
    }
}
