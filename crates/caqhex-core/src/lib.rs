//! Core library for CAQH Data Summary intake triage.
//!
//! This crate provides:
//! - Reading-order text reconstruction from per-page token streams
//! - Best-effort document section location
//! - Bidirectional label-proximity field extraction with confidence scoring
//! - Field-specific strategies (organization names, repeated policy blocks,
//!   sibling-ID disambiguation, future-date selection)
//! - A document-type gate and the per-document extraction orchestrator
//!
//! PDF byte decoding and OCR token production are external collaborators:
//! the library consumes their word/coordinate output (or pre-reconstructed
//! plain text) and produces structured field results for downstream
//! validation and review tooling.

pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod models;
pub mod text;

pub use config::{
    ExtractionConfig, FieldConfig, OrgNameParams, PolicyField, StrategyKind, Tuning,
    DEFAULT_FIELDS,
};
pub use error::{CaqhexError, ExtractionError, Result, TextError};
pub use extract::{
    select_policy, DocumentExtractor, ExtractionContext, FieldStrategy, PolicyBlock,
    SelectedPolicy, StrategyRegistry,
};
pub use gate::{DocumentKind, DocumentTypeChecker, GateDecision, Recommendation};
pub use models::{
    summarize, ConfidenceLevel, Direction, DocumentExtractionResult, ExtractionMethod,
    ExtractionSummary, FieldExtractionResult, SourceKind,
};
pub use text::{is_ocr_text, locate_section, reconstruct, PageTokens, SectionSlice, SourceProfile, Token};
