//! Abstract schema model
//!
//! This is the shape a schema parser hands to a code generator: messages,
//! their numbered fields, field types and repetition. The encoder itself
//! never looks at a schema; the model exists so that generated types and
//! tooling agree on how each schema type is lowered onto the wire.

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::tag::Kind;

/// How a message-typed field holds its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Storage {
    /// Owned inline
    #[default]
    Value,
    /// Behind a shared handle, which lets message types reference each other
    Shared,
}

/// Type of a schema field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit float
    Float64,
    /// 32-bit float
    Float32,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 32-bit integer
    Uint32,
    /// Unsigned 64-bit integer
    Uint64,
    /// Signed 32-bit integer, same wire form as `Int32`
    Sint32,
    /// Signed 64-bit integer, same wire form as `Int64`
    Sint64,
    /// Boolean
    Bool,
    /// UTF-8 text
    String,
    /// Raw bytes
    Binary,
    /// Reference to an enum, lowered to a signed 32-bit integer
    Enum(String),
    /// Reference to another message
    Message {
        /// Referenced message name
        name: String,
        /// Inline or shared ownership
        storage: Storage,
    },
}

impl FieldType {
    /// Wire kind a value of this type is written as
    pub fn wire_kind(&self) -> Kind {
        match self {
            FieldType::Float64 => Kind::Float64,
            FieldType::Float32 => Kind::Float32,
            FieldType::Int32 | FieldType::Sint32 | FieldType::Enum(_) => Kind::Int32,
            FieldType::Int64 | FieldType::Sint64 => Kind::Int64,
            FieldType::Uint32 => Kind::Uint32,
            FieldType::Uint64 => Kind::Uint64,
            FieldType::Bool => Kind::Bool,
            FieldType::String => Kind::String,
            FieldType::Binary => Kind::Binary,
            FieldType::Message { .. } => Kind::Document,
        }
    }

    /// Referenced message name, if this is a message type
    pub fn message_name(&self) -> Option<&str> {
        match self {
            FieldType::Message { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A numbered field of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Wire field id
    pub id: u16,
    /// Field type
    pub ty: FieldType,
    /// Whether the field holds an ordered sequence
    pub repeated: bool,
}

impl Field {
    /// Tag byte written for this field (array form when repeated)
    ///
    /// Repeated integer fields use the array tag; singular integers may be
    /// written in compact form instead, see [`Kind::compact_tag`].
    pub fn wire_tag(&self) -> u8 {
        let kind = self.ty.wire_kind();
        if self.repeated {
            kind.array_tag()
        } else {
            kind.tag()
        }
    }
}

/// A message declaration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Message name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl Message {
    /// Field with the given wire id
    pub fn field(&self, id: u16) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// A parsed schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Dotted package name
    pub package: String,
    /// Messages in declaration order
    pub messages: Vec<Message>,
}

/// Problems found by [`Schema::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two messages share a name
    #[error("message `{0}` declared twice")]
    DuplicateMessage(String),
    /// Two fields of one message share an id
    #[error("field id {id} used twice in `{message}`")]
    DuplicateFieldId {
        /// Message name
        message: String,
        /// Repeated id
        id: u16,
    },
    /// Two fields of one message share a name
    #[error("field `{field}` declared twice in `{message}`")]
    DuplicateFieldName {
        /// Message name
        message: String,
        /// Repeated name
        field: String,
    },
    /// Field ids start at 1
    #[error("field `{field}` in `{message}` has id 0")]
    ZeroFieldId {
        /// Message name
        message: String,
        /// Field name
        field: String,
    },
    /// A field references a message that is not declared
    #[error("field `{field}` in `{message}` references unknown message `{target}`")]
    UnknownMessage {
        /// Message name
        message: String,
        /// Field name
        field: String,
        /// Missing message name
        target: String,
    },
    /// More messages than document ids
    #[error("schema declares more than 65535 messages")]
    TooManyMessages,
}

impl Schema {
    /// Message with the given name
    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// Document id of a message: its 1-based position in the schema
    pub fn doc_id(&self, name: &str) -> Option<u16> {
        let index = self.messages.iter().position(|m| m.name == name)?;
        u16::try_from(index + 1).ok()
    }

    /// Package name split on dots, empty segments dropped
    pub fn namespace(&self) -> Vec<&str> {
        self.package.split('.').filter(|s| !s.is_empty()).collect()
    }

    /// Check ids, names and message references
    pub fn validate(&self) -> core::result::Result<(), SchemaError> {
        if self.messages.len() > usize::from(u16::MAX) {
            return Err(SchemaError::TooManyMessages);
        }

        for (i, message) in self.messages.iter().enumerate() {
            if self.messages[..i].iter().any(|m| m.name == message.name) {
                return Err(SchemaError::DuplicateMessage(message.name.clone()));
            }

            for (j, field) in message.fields.iter().enumerate() {
                if field.id == 0 {
                    return Err(SchemaError::ZeroFieldId {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }
                let earlier = &message.fields[..j];
                if earlier.iter().any(|f| f.id == field.id) {
                    return Err(SchemaError::DuplicateFieldId {
                        message: message.name.clone(),
                        id: field.id,
                    });
                }
                if earlier.iter().any(|f| f.name == field.name) {
                    return Err(SchemaError::DuplicateFieldName {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if let Some(target) = field.ty.message_name() {
                    if self.message(target).is_none() {
                        return Err(SchemaError::UnknownMessage {
                            message: message.name.clone(),
                            field: field.name.clone(),
                            target: target.into(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
