//! Summary statistics over a document extraction result.

use serde::{Deserialize, Serialize};

use super::result::{DocumentExtractionResult, SourceKind};

/// Coarse confidence bucket for an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Confidence >= 0.90.
    High,
    /// 0.70 <= confidence < 0.90.
    Medium,
    /// Confidence < 0.70.
    Low,
}

impl ConfidenceLevel {
    /// Bucket a confidence score.
    pub fn from_score(confidence: f32) -> Self {
        if confidence >= 0.90 {
            ConfidenceLevel::High
        } else if confidence >= 0.70 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// High-level metrics about extraction quality for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_fields: usize,
    pub fields_extracted: usize,
    pub fields_not_found: usize,
    /// Percentage of fields successfully extracted.
    pub extraction_rate: f32,
    /// Average confidence across extracted fields.
    pub avg_confidence: f32,
    pub high_confidence_fields: usize,
    pub medium_confidence_fields: usize,
    pub low_confidence_fields: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub source: SourceKind,
}

/// Generate summary statistics from a document extraction result.
pub fn summarize(result: &DocumentExtractionResult) -> ExtractionSummary {
    let total_fields = result.total_fields_attempted;
    let fields_extracted = result.fields_extracted;
    let fields_not_found = total_fields.saturating_sub(fields_extracted);

    let extraction_rate = if total_fields > 0 {
        fields_extracted as f32 / total_fields as f32 * 100.0
    } else {
        0.0
    };

    let extracted: Vec<_> = result
        .field_results
        .iter()
        .filter(|r| r.extracted_value.is_some())
        .collect();

    let avg_confidence = if extracted.is_empty() {
        0.0
    } else {
        extracted.iter().map(|r| r.confidence).sum::<f32>() / extracted.len() as f32
    };

    let high = extracted
        .iter()
        .filter(|r| ConfidenceLevel::from_score(r.confidence) == ConfidenceLevel::High)
        .count();
    let medium = extracted
        .iter()
        .filter(|r| ConfidenceLevel::from_score(r.confidence) == ConfidenceLevel::Medium)
        .count();
    let low = extracted
        .iter()
        .filter(|r| ConfidenceLevel::from_score(r.confidence) == ConfidenceLevel::Low)
        .count();

    let total_errors =
        result.errors.len() + result.field_results.iter().map(|r| r.errors.len()).sum::<usize>();
    let total_warnings = result.warnings.len()
        + result.field_results.iter().map(|r| r.warnings.len()).sum::<usize>();

    ExtractionSummary {
        total_fields,
        fields_extracted,
        fields_not_found,
        extraction_rate,
        avg_confidence,
        high_confidence_fields: high,
        medium_confidence_fields: medium,
        low_confidence_fields: low,
        total_errors,
        total_warnings,
        source: result.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::{ExtractionMethod, FieldExtractionResult};
    use pretty_assertions::assert_eq;

    fn doc_with(results: Vec<FieldExtractionResult>) -> DocumentExtractionResult {
        let extracted = results.iter().filter(|r| r.extracted_value.is_some()).count();
        DocumentExtractionResult {
            document_name: "doc.pdf".to_string(),
            total_fields_attempted: results.len(),
            fields_extracted: extracted,
            field_results: results,
            elapsed_ms: 0,
            source: SourceKind::NativePdf,
            passed_gate: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            notes: None,
        }
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.90), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.89), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.70), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.69), ConfidenceLevel::Low);
    }

    #[test]
    fn test_summarize_counts() {
        let doc = doc_with(vec![
            FieldExtractionResult::found("a", "1", 0.95, ExtractionMethod::PatternAfter),
            FieldExtractionResult::found("b", "2", 0.75, ExtractionMethod::PatternBefore),
            FieldExtractionResult::not_found("c", ExtractionMethod::LabelProximity, vec![]),
        ]);

        let summary = summarize(&doc);
        assert_eq!(summary.total_fields, 3);
        assert_eq!(summary.fields_extracted, 2);
        assert_eq!(summary.fields_not_found, 1);
        assert_eq!(summary.high_confidence_fields, 1);
        assert_eq!(summary.medium_confidence_fields, 1);
        assert_eq!(summary.low_confidence_fields, 0);
        assert!((summary.avg_confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_summarize_empty() {
        let doc = doc_with(vec![]);
        let summary = summarize(&doc);
        assert_eq!(summary.extraction_rate, 0.0);
        assert_eq!(summary.avg_confidence, 0.0);
    }
}
