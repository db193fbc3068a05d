use thiserror::Error;

/// Errors raised while building, validating, reading or writing CIFTI-2 documents.
#[derive(Debug, Error)]
pub enum CiftiError {
    /// A document element is structurally incomplete or violates a cross-element rule.
    #[error("CIFTI-2 header error: {0}")]
    Header(String),

    /// A value could not be coerced to the shape or type an element requires.
    #[error("invalid value: {0}")]
    ValueCoercion(String),

    /// An element of the wrong kind was placed into a typed container.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The byte container is not a NIfTI-2 file carrying a CIFTI-2 extension.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("xml: {0}")]
    Xml(String),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CiftiError>;

impl CiftiError {
    pub(crate) fn header(msg: impl Into<String>) -> Self {
        CiftiError::Header(msg.into())
    }

    pub(crate) fn coercion(msg: impl Into<String>) -> Self {
        CiftiError::ValueCoercion(msg.into())
    }

    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        CiftiError::Xml(err.to_string())
    }
}
