//! PDF Parser Module
//!
//! Reads a complete PDF byte buffer into an owned [`Document`](crate::Document):
//! header, cross-reference sections (classic tables, xref streams and hybrid
//! files), indirect objects, object streams and the trailer. Parsing is strict:
//! a structure that cannot be read aborts the whole load, there is no partial
//! recovery.

pub mod filters;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod reader;
pub mod xref;

pub use self::lexer::{Lexer, Token};
pub use self::reader::PdfReader;
pub use self::xref::{XRefEntry, XRefTable};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref table")]
    InvalidXRef,

    #[error("Invalid trailer")]
    InvalidTrailer,

    #[error("Circular reference detected")]
    CircularReference,

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Encryption not supported")]
    EncryptionNotSupported,
}

impl ParseError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }
}
