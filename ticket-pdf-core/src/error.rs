use crate::objects::ObjectId;
use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid object reference: {0}")]
    InvalidReference(ObjectId),

    #[error("Unbalanced graphics state: restore without save at operator {index}")]
    UnbalancedGraphicsState { index: usize },

    #[error("Template must contain exactly one page, found {0}")]
    UnsupportedPageCount(usize),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Unsupported font encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Composite font {0} cannot encode text")]
    CompositeFontEncoding(String),

    #[error("Font error: {0}")]
    FontError(String),

    #[error("Compression error: {0}")]
    CompressionError(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inconsistent booking data: {0}")]
    Consistency(String),

    #[error("Ticket URL does not belong to this store: {0}")]
    InvalidTicketUrl(String),

    #[error("Invalid configuration data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`PdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed object model, unbalanced state stack or wrong page count.
    Structural,
    /// A feature the engine deliberately does not implement.
    UnsupportedFeature,
    /// Booking data that contradicts itself.
    Consistency,
    /// File system or (de)serialization failure outside the PDF model.
    Io,
}

impl PdfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfError::Parse(_)
            | PdfError::InvalidStructure(_)
            | PdfError::InvalidReference(_)
            | PdfError::UnbalancedGraphicsState { .. }
            | PdfError::UnsupportedPageCount(_)
            | PdfError::CompressionError(_)
            | PdfError::InvalidImage(_) => ErrorKind::Structural,
            PdfError::UnsupportedFeature(_)
            | PdfError::UnsupportedEncoding(_)
            | PdfError::CompositeFontEncoding(_)
            | PdfError::FontError(_) => ErrorKind::UnsupportedFeature,
            PdfError::Consistency(_) | PdfError::InvalidTicketUrl(_) => ErrorKind::Consistency,
            PdfError::Io(_) | PdfError::Json(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
