//! Data models for extraction results and summaries.

pub mod result;
pub mod summary;

pub use result::{
    Direction, DocumentExtractionResult, ExtractionMethod, FieldExtractionResult, SourceKind,
};
pub use summary::{summarize, ConfidenceLevel, ExtractionSummary};
