//! Error types for weft operations.

use thiserror::Error;

/// Errors that can occur during document rendering, parsing, or plugin management.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid document structure: missing required field `{0}`")]
    DocumentStructure(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Format validation failed: {0}")]
    FormatValidation(String),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
