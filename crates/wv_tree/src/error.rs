use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// TreeError

/// Errors raised while converting a [`Document`](crate::Document) to or from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("XML content is not valid UTF-8")]
    Utf8,

    #[error("invalid escape sequence in XML content: {0}")]
    Escape(String),

    #[error("closing tag `{0}` has no matching start tag")]
    Unbalanced(String),

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("document has no root element")]
    Empty,

    #[error("failed to write XML: {0}")]
    Write(String),
}
