//! Document extraction orchestrator.
//!
//! Drives the configured strategies over the requested field list. The gate
//! decision short-circuits everything: extraction against the wrong document
//! would only produce misleading low-confidence matches. Every requested
//! field gets exactly one result; a field's failure never aborts the rest.

use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::insurance::{select_policy, SelectedPolicy};
use super::{ExtractionContext, StrategyRegistry};
use crate::config::{ExtractionConfig, FieldConfig, PolicyField, StrategyKind, DEFAULT_FIELDS};
use crate::error::Result;
use crate::gate::GateDecision;
use crate::models::result::{
    DocumentExtractionResult, ExtractionMethod, FieldExtractionResult, SourceKind,
};
use crate::text::{is_ocr_text, reconstruct, PageTokens, SourceProfile};

/// The externally called entry point: per-document field extraction.
pub struct DocumentExtractor {
    config: ExtractionConfig,
    registry: StrategyRegistry,
    reference_date: NaiveDate,
}

impl DocumentExtractor {
    /// Build an extractor, resolving every field's strategy up front.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let registry = StrategyRegistry::from_config(&config)?;
        Ok(Self {
            config,
            registry,
            reference_date: chrono::Local::now().date_naive(),
        })
    }

    /// Fix the reference date used for future/past partitioning (tests,
    /// reprocessing of historical batches).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract fields from pre-reconstructed text.
    pub fn extract_document(
        &self,
        document_name: &str,
        text: &str,
        gate: &GateDecision,
        field_names: &[String],
    ) -> DocumentExtractionResult {
        let start = Instant::now();
        let fields = effective_fields(field_names);

        info!(
            document = document_name,
            fields = fields.len(),
            "extracting fields"
        );

        if !gate.is_valid_caqh {
            let field_results: Vec<FieldExtractionResult> = fields
                .iter()
                .map(|name| {
                    FieldExtractionResult::not_found(
                        name.clone(),
                        ExtractionMethod::WrongDocument,
                        vec![gate.message.clone()],
                    )
                    .with_note(format!(
                        "wrong document type: {}",
                        gate.document_type.as_str()
                    ))
                })
                .collect();

            return DocumentExtractionResult {
                document_name: document_name.to_string(),
                total_fields_attempted: field_results.len(),
                fields_extracted: 0,
                field_results,
                elapsed_ms: start.elapsed().as_millis() as u64,
                source: source_kind(text),
                passed_gate: false,
                errors: vec![gate.message.clone()],
                warnings: Vec::new(),
                notes: Some(format!("document type: {}", gate.document_type.as_str())),
            };
        }

        // The winning policy block is parsed at most once per document.
        let mut policy_cache: Option<Option<SelectedPolicy>> = None;

        let mut field_results = Vec::with_capacity(fields.len());
        for name in &fields {
            let result = match self.config.field(name) {
                None => FieldExtractionResult::not_found(
                    name.clone(),
                    ExtractionMethod::NoConfig,
                    vec![format!("no configuration found for field: {name}")],
                ),
                Some(field_config) => match &field_config.strategy {
                    StrategyKind::PolicyBlock { field } => {
                        let selected = policy_cache
                            .get_or_insert_with(|| {
                                select_policy(text, &field_config.date_formats)
                            })
                            .as_ref();
                        self.policy_field_result(name, selected, *field)
                    }
                    _ => self.run_strategy(name, text, field_config),
                },
            };
            field_results.push(result);
        }

        let fields_extracted = field_results
            .iter()
            .filter(|r| r.extracted_value.is_some())
            .count();

        debug!(
            document = document_name,
            extracted = fields_extracted,
            attempted = field_results.len(),
            "extraction complete"
        );

        DocumentExtractionResult {
            document_name: document_name.to_string(),
            total_fields_attempted: field_results.len(),
            fields_extracted,
            field_results,
            elapsed_ms: start.elapsed().as_millis() as u64,
            source: source_kind(text),
            passed_gate: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            notes: None,
        }
    }

    /// Reconstruct per-page tokens, then extract. A reconstruction failure
    /// becomes a zero-attempt result, never a propagated error.
    pub fn extract_pages(
        &self,
        document_name: &str,
        pages: &[PageTokens],
        profile: SourceProfile,
        gate: &GateDecision,
        field_names: &[String],
    ) -> DocumentExtractionResult {
        let start = Instant::now();

        match reconstruct(pages, profile, &self.config.tuning) {
            Ok(text) => self.extract_document(document_name, &text, gate, field_names),
            Err(e) => {
                warn!(document = document_name, error = %e, "reconstruction failed");
                DocumentExtractionResult {
                    document_name: document_name.to_string(),
                    total_fields_attempted: 0,
                    fields_extracted: 0,
                    field_results: Vec::new(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    source: SourceKind::PlainText,
                    passed_gate: gate.is_valid_caqh,
                    errors: vec![format!("failed to read document: {e}")],
                    warnings: Vec::new(),
                    notes: None,
                }
            }
        }
    }

    fn run_strategy(
        &self,
        field_name: &str,
        text: &str,
        field_config: &FieldConfig,
    ) -> FieldExtractionResult {
        let ctx = ExtractionContext {
            field_name,
            text,
            config: field_config,
            tuning: &self.config.tuning,
            org_name: &self.config.org_name,
            reference_date: self.reference_date,
        };

        match self.registry.resolve(field_name).extract(&ctx) {
            Ok(result) => result,
            Err(e) => {
                warn!(field = field_name, error = %e, "field extraction failed");
                FieldExtractionResult::not_found(
                    field_name,
                    ExtractionMethod::Failed,
                    vec![e.to_string()],
                )
            }
        }
    }

    fn policy_field_result(
        &self,
        field_name: &str,
        selected: Option<&SelectedPolicy>,
        field: PolicyField,
    ) -> FieldExtractionResult {
        let Some(selected) = selected else {
            return FieldExtractionResult::not_found(
                field_name,
                ExtractionMethod::PolicyBlock,
                vec!["no insurance policy blocks found in document".to_string()],
            );
        };

        match selected.block.get(field) {
            Some(value) => {
                let mut result = FieldExtractionResult::found(
                    field_name,
                    value,
                    self.config.tuning.policy_field_confidence,
                    ExtractionMethod::PolicyBlock,
                )
                .with_note(format!(
                    "from policy '{}' selected among {} block(s) by furthest expiration",
                    selected.block.policy_number.as_deref().unwrap_or("unknown"),
                    selected.policy_count
                ));
                if let Some(expiration) = selected.expiration {
                    if expiration <= self.reference_date {
                        result
                            .warnings
                            .push(format!("selected policy expired on {expiration}"));
                    }
                }
                result
            }
            None => FieldExtractionResult::empty_value(
                field_name,
                self.config.tuning.empty_value_confidence,
                ExtractionMethod::PolicyBlock,
                vec!["selected policy block has no value for this field".to_string()],
            ),
        }
    }
}

fn effective_fields(field_names: &[String]) -> Vec<String> {
    if field_names.is_empty() {
        DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect()
    } else {
        field_names.to_vec()
    }
}

fn source_kind(text: &str) -> SourceKind {
    if is_ocr_text(text) {
        SourceKind::Ocr
    } else if text.contains("--- Page") {
        SourceKind::NativePdf
    } else {
        SourceKind::PlainText
    }
}
