//! Extraction result models with confidence scoring.

use serde::{Deserialize, Serialize};

/// Where a candidate value was found relative to its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Value appeared before the label.
    Before,
    /// Value appeared after the label (expected form layout).
    After,
    /// Value was assembled from both sides of the label.
    Bidirectional,
    /// Value was derived by a field-specific post-processor.
    Derived,
}

/// The code path that produced a field result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Value pattern matched in the window after the label.
    PatternAfter,
    /// Value pattern matched in the window before the label.
    PatternBefore,
    /// Line-based heuristic fallback (no pattern match).
    LineHeuristic,
    /// Multi-line organization name assembly and normalization.
    OrgName,
    /// Field taken from the selected repeated policy block.
    PolicyBlock,
    /// Future-date selection over all date candidates.
    DateSelect,
    /// Label search ran but produced no value.
    LabelProximity,
    /// Document failed the type gate; no search was attempted.
    WrongDocument,
    /// No configuration entry exists for the field.
    NoConfig,
    /// The strategy returned an internal error.
    Failed,
}

/// Primary text source for a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Native PDF text extraction.
    NativePdf,
    /// OCR-derived text (detected via page markers).
    Ocr,
    /// Pre-reconstructed plain text with no page markers.
    #[default]
    PlainText,
}

/// Result of extracting a single field from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldExtractionResult {
    /// Name of the field extracted.
    pub field_name: String,

    /// The extracted value, or `None` if not found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_value: Option<String>,

    /// Confidence score in [0.0, 1.0].
    pub confidence: f32,

    /// Which code path produced this result.
    pub extraction_method: ExtractionMethod,

    /// Surrounding text where the value was found (for reviewers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text_context: Option<String>,

    /// Errors encountered during extraction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Warnings about extraction quality or ambiguity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Additional notes about the extraction process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FieldExtractionResult {
    /// Create a result with a value; confidence is clamped to [0.0, 1.0].
    pub fn found(
        field_name: impl Into<String>,
        value: impl Into<String>,
        confidence: f32,
        method: ExtractionMethod,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            extracted_value: Some(value.into()),
            confidence: confidence.clamp(0.0, 1.0),
            extraction_method: method,
            raw_text_context: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            notes: None,
        }
    }

    /// Create a no-value result with confidence 0.0.
    pub fn not_found(
        field_name: impl Into<String>,
        method: ExtractionMethod,
        errors: Vec<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            extracted_value: None,
            confidence: 0.0,
            extraction_method: method,
            raw_text_context: None,
            errors,
            warnings: Vec::new(),
            notes: None,
        }
    }

    /// Create a no-value result with an explicit confidence (used for the
    /// "label present but empty" case, which scores 0.3 rather than 0.0).
    pub fn empty_value(
        field_name: impl Into<String>,
        confidence: f32,
        method: ExtractionMethod,
        errors: Vec<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            extracted_value: None,
            confidence: confidence.clamp(0.0, 1.0),
            extraction_method: method,
            raw_text_context: None,
            errors,
            warnings: Vec::new(),
            notes: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.raw_text_context = Some(context.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes = Some(note.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Complete extraction result for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExtractionResult {
    /// Name or path of the processed document.
    pub document_name: String,

    /// Number of fields extraction was attempted for.
    pub total_fields_attempted: usize,

    /// Number of fields that produced a value.
    pub fields_extracted: usize,

    /// One result per requested field, in request order.
    pub field_results: Vec<FieldExtractionResult>,

    /// Total extraction time in milliseconds.
    pub elapsed_ms: u64,

    /// Primary text source for the document.
    pub source: SourceKind,

    /// Whether the document passed the type gate.
    pub passed_gate: bool,

    /// Document-level errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Document-level warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Additional notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DocumentExtractionResult {
    /// Look up a field result by name.
    pub fn field(&self, name: &str) -> Option<&FieldExtractionResult> {
        self.field_results.iter().find(|r| r.field_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_found_clamps_confidence() {
        let result =
            FieldExtractionResult::found("ssn", "123-45-6789", 1.3, ExtractionMethod::PatternAfter);
        assert_eq!(result.confidence, 1.0);

        let result =
            FieldExtractionResult::found("ssn", "123-45-6789", -0.2, ExtractionMethod::PatternAfter);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_not_found_has_zero_confidence() {
        let result = FieldExtractionResult::not_found(
            "medicaid_id",
            ExtractionMethod::LabelProximity,
            vec!["label not found".to_string()],
        );
        assert_eq!(result.confidence, 0.0);
        assert!(result.extracted_value.is_none());
    }

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractionMethod::WrongDocument).unwrap();
        assert_eq!(json, "\"wrong_document\"");
        let json = serde_json::to_string(&ExtractionMethod::PatternAfter).unwrap();
        assert_eq!(json, "\"pattern_after\"");
    }

    #[test]
    fn test_field_lookup() {
        let doc = DocumentExtractionResult {
            document_name: "test.pdf".to_string(),
            total_fields_attempted: 1,
            fields_extracted: 1,
            field_results: vec![FieldExtractionResult::found(
                "ssn",
                "123-45-6789",
                0.9,
                ExtractionMethod::PatternAfter,
            )],
            elapsed_ms: 1,
            source: SourceKind::PlainText,
            passed_gate: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            notes: None,
        };
        assert!(doc.field("ssn").is_some());
        assert!(doc.field("npi").is_none());
    }
}
