//! Error types for the caqhex-core library.

use thiserror::Error;

/// Main error type for the caqhex library.
#[derive(Error, Debug)]
pub enum CaqhexError {
    /// Text reconstruction error.
    #[error("text error: {0}")]
    Text(#[from] TextError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to text reconstruction from token streams.
#[derive(Error, Debug)]
pub enum TextError {
    /// No tokens were present on any page of the document.
    #[error("document contains no tokens on any page")]
    NoTokens,
}

/// Errors related to field extraction.
///
/// Absence of a value is never an error: it is encoded in the field result
/// itself. These variants cover structural failures only.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A configured value pattern failed to compile.
    #[error("invalid value pattern for {field}: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// A dynamically built label pattern failed to compile.
    #[error("invalid label pattern for {field} (label '{label}'): {source}")]
    Label {
        field: String,
        label: String,
        #[source]
        source: regex::Error,
    },

    /// A strategy-level pattern (organization name, sibling indicator)
    /// failed to compile.
    #[error("invalid strategy pattern: {0}")]
    StrategyPattern(#[from] regex::Error),
}

/// Result type for the caqhex library.
pub type Result<T> = std::result::Result<T, CaqhexError>;
