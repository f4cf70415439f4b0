//! Document-type gate for CAQH Data Summary detection.
//!
//! Wrong submissions seen in production: liability coverage letters,
//! resumes, screenshots, truncated exports. The gate runs over reconstructed
//! text before any field extraction is attempted; the orchestrator consumes
//! its decision and never runs the checker itself.

use serde::{Deserialize, Serialize};

/// Classified document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A valid CAQH Data Summary.
    ValidCaqh,
    /// Some other document entirely.
    WrongDocument,
    /// A Word document was submitted instead of a PDF export.
    WordDocument,
    /// Could not be classified.
    Unknown,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ValidCaqh => "valid_caqh",
            DocumentKind::WrongDocument => "wrong_document",
            DocumentKind::WordDocument => "word_document",
            DocumentKind::Unknown => "unknown",
        }
    }
}

/// What the intake pipeline should do with the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ProcessNormally,
    RejectWrongDocument,
    NeedsReview,
}

/// The gate's verdict on one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the document is a valid CAQH Data Summary.
    pub is_valid_caqh: bool,

    /// Classified document kind.
    pub document_type: DocumentKind,

    /// Required markers that were absent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_markers: Vec<String>,

    /// Human-readable reason.
    pub message: String,

    /// Suggested handling.
    pub recommendation: Recommendation,
}

impl GateDecision {
    /// A passing decision.
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid_caqh: true,
            document_type: DocumentKind::ValidCaqh,
            missing_markers: Vec::new(),
            message: message.into(),
            recommendation: Recommendation::ProcessNormally,
        }
    }

    /// A rejecting decision.
    pub fn rejected(kind: DocumentKind, message: impl Into<String>) -> Self {
        Self {
            is_valid_caqh: false,
            document_type: kind,
            missing_markers: Vec::new(),
            message: message.into(),
            recommendation: Recommendation::RejectWrongDocument,
        }
    }
}

/// Markers that must all appear in a valid CAQH Data Summary.
const REQUIRED_MARKERS: [(&str, &str); 3] = [
    ("caqh", "CAQH reference or branding"),
    ("data summary", "Data Summary title"),
    ("provider", "Provider information section"),
];

/// At least two of these sections should be present.
const EXPECTED_SECTIONS: [&str; 5] = [
    "individual npi",
    "practice location",
    "professional license",
    "education",
    "social security",
];

/// Phrases typical of the documents people submit by mistake. Consulted
/// only when the CAQH markers are absent: "liability coverage" legitimately
/// appears inside the Professional Liability section of a real export.
const WRONG_DOCUMENT_PATTERNS: [&str; 6] = [
    "liability coverage",
    "insurance certificate",
    "resume",
    "curriculum vitae",
    "attestation letter",
    "reference letter",
];

/// Minimum plausible text length for a real export.
const MIN_TEXT_LENGTH: usize = 2000;

/// Text-based CAQH Data Summary detector.
///
/// Constructed explicitly by the process entry point and passed to callers
/// that need it; holds no global state.
#[derive(Debug, Clone)]
pub struct DocumentTypeChecker {
    min_text_length: usize,
}

impl DocumentTypeChecker {
    pub fn new() -> Self {
        Self {
            min_text_length: MIN_TEXT_LENGTH,
        }
    }

    /// Override the minimum text length (tests, unusual templates).
    pub fn with_min_text_length(mut self, min: usize) -> Self {
        self.min_text_length = min;
        self
    }

    /// Classify the document from its reconstructed text.
    pub fn validate(&self, text: &str) -> GateDecision {
        let lower = text.to_lowercase();

        let missing: Vec<String> = REQUIRED_MARKERS
            .iter()
            .filter(|(marker, _)| !lower.contains(marker))
            .map(|(_, description)| description.to_string())
            .collect();

        if !missing.is_empty() {
            if let Some(pattern) = self.wrong_document_pattern(&lower) {
                return GateDecision::rejected(
                    DocumentKind::WrongDocument,
                    format!(
                        "document appears to be '{pattern}', not a CAQH Data Summary; \
                         please submit the complete CAQH Data Summary PDF from CAQH ProView"
                    ),
                );
            }

            let mut decision = GateDecision::rejected(
                DocumentKind::WrongDocument,
                format!(
                    "document is missing required CAQH markers: {}; this does not appear \
                     to be a CAQH Data Summary",
                    missing.join(", ")
                ),
            );
            decision.missing_markers = missing;
            return decision;
        }

        if text.len() < self.min_text_length {
            return GateDecision::rejected(
                DocumentKind::WrongDocument,
                format!(
                    "document is too short ({} characters); CAQH Data Summary exports are \
                     typically much longer - this may be a screenshot or partial export",
                    text.len()
                ),
            );
        }

        let sections_found = self.count_expected_sections(&lower);
        if sections_found < 2 {
            return GateDecision::rejected(
                DocumentKind::WrongDocument,
                format!(
                    "document contains only {sections_found} expected CAQH section(s); \
                     valid exports contain multiple sections (Practice Location, \
                     Professional License, Education, ...)"
                ),
            );
        }

        GateDecision::valid(format!(
            "document appears to be a valid CAQH Data Summary \
             ({sections_found} expected sections found, {} characters)",
            text.len()
        ))
    }

    /// Quick boolean form of [`validate`](Self::validate).
    pub fn quick_check(&self, text: &str) -> bool {
        self.validate(text).is_valid_caqh
    }

    fn count_expected_sections(&self, lower: &str) -> usize {
        EXPECTED_SECTIONS
            .iter()
            .filter(|section| lower.contains(*section))
            .count()
    }

    fn wrong_document_pattern(&self, lower: &str) -> Option<&'static str> {
        WRONG_DOCUMENT_PATTERNS
            .iter()
            .find(|pattern| lower.contains(*pattern))
            .copied()
    }
}

impl Default for DocumentTypeChecker {
    fn default() -> Self {
        Self::new()
    }
}
