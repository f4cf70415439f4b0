//! Text reconstruction and section location.

mod reconstructor;
mod section;

pub use reconstructor::{reconstruct, SourceProfile};
pub use section::{locate_section, SectionSlice};

use serde::{Deserialize, Serialize};

/// A single word token with its bounding-box edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Word text content.
    pub text: String,
    /// Left edge coordinate.
    pub left: f32,
    /// Top edge coordinate.
    pub top: f32,
    /// Right edge coordinate.
    pub right: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, left: f32, top: f32, right: f32) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            right,
        }
    }
}

/// Tokens belonging to one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTokens {
    /// Page number (1-indexed).
    pub number: u32,
    /// Word tokens on this page, in arbitrary order.
    pub tokens: Vec<Token>,
}

/// Check whether reconstructed text came from OCR, by scanning for the OCR
/// page marker the reconstructor embeds.
pub fn is_ocr_text(text: &str) -> bool {
    text.contains("(OCR) ---")
}
