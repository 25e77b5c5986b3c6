//! Error types for the tagdoc encoder and decoder

use thiserror::Error;

/// Errors that can occur while encoding or decoding a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The buffer would grow past the 32-bit size model
    #[error("buffer would exceed the 4 GiB document limit")]
    CapacityExceeded,
    /// A single record's size or count does not fit its header field
    #[error("record size or count does not fit its header field")]
    RecordTooLarge,
    /// Encoder calls issued out of order, or with no suitable open parent
    #[error("encoder misuse: {0}")]
    EncoderMisuse(&'static str),
    /// A close call with no matching open frame
    #[error("unbalanced frame: close without matching open")]
    UnbalancedFrame,
    /// Documents nested deeper than [`crate::MAX_NESTING_DEPTH`]
    #[error("document nesting too deep at offset {offset}")]
    NestingTooDeep {
        /// Offset where the offending document starts
        offset: usize,
    },
    /// Declared length overruns the input, or a tag is not a valid kind
    #[error("truncated or corrupt input at offset {offset}")]
    TruncatedOrCorrupt {
        /// Byte offset of the offending record
        offset: usize,
    },
    /// A decoded document has a different id than the type being read
    #[error("expected document id {expected}, found {found}")]
    UnexpectedDocument {
        /// Document id of the target type
        expected: u16,
        /// Document id found on the wire
        found: u16,
    },
    /// A known field id carries a value of the wrong kind
    #[error("field {field_id} has an unexpected kind")]
    FieldKindMismatch {
        /// Offending field id
        field_id: u16,
    },
}

impl Error {
    /// Returns a static description of the error kind
    pub const fn description(&self) -> &'static str {
        match self {
            Error::CapacityExceeded => "buffer would exceed the 4 GiB document limit",
            Error::RecordTooLarge => "record size or count does not fit its header field",
            Error::EncoderMisuse(_) => "encoder calls issued out of order",
            Error::UnbalancedFrame => "close without matching open",
            Error::NestingTooDeep { .. } => "document nesting too deep",
            Error::TruncatedOrCorrupt { .. } => "truncated or corrupt input",
            Error::UnexpectedDocument { .. } => "unexpected document id",
            Error::FieldKindMismatch { .. } => "field has an unexpected kind",
        }
    }

    /// Whether the error was produced by the decoder
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::TruncatedOrCorrupt { .. }
                | Error::UnexpectedDocument { .. }
                | Error::FieldKindMismatch { .. }
        )
    }

    #[inline]
    pub(crate) const fn corrupt(offset: usize) -> Self {
        Error::TruncatedOrCorrupt { offset }
    }
}

/// Result type alias for tagdoc operations
pub type Result<T> = core::result::Result<T, Error>;
