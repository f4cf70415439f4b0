//! Field extraction strategies.
//!
//! One default strategy (bidirectional label-proximity search) plus named
//! overrides for fields with structural quirks. Strategies are resolved per
//! field at configuration-load time; the generic path never branches on
//! field names.

mod dates;
mod engine;
mod insurance;
mod org_name;
mod proximity;
mod sibling;

pub use dates::FutureDateStrategy;
pub use engine::DocumentExtractor;
pub use insurance::{select_policy, PolicyBlock, SelectedPolicy};
pub use org_name::OrgNameStrategy;
pub use proximity::LabelProximityStrategy;
pub use sibling::SiblingFilterStrategy;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};

use crate::config::{ExtractionConfig, FieldConfig, OrgNameParams, StrategyKind, Tuning};
use crate::error::ExtractionError;
use crate::models::result::{Direction, FieldExtractionResult};
use crate::text::{locate_section, SectionSlice};

/// A provisional value considered during a single field extraction.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Candidate value text.
    pub value: String,
    /// Base confidence before the pattern bonus.
    pub confidence: f32,
    /// Distance from the label (characters, or lines for the heuristic).
    pub distance: usize,
    /// Which side of the label the value came from.
    pub direction: Direction,
    /// Whether the value pattern confirmed this candidate.
    pub pattern_matched: bool,
}

/// Everything a strategy needs to extract one field from one document.
pub struct ExtractionContext<'a> {
    /// Name of the field being extracted.
    pub field_name: &'a str,
    /// Full document text.
    pub text: &'a str,
    /// The field's configuration entry.
    pub config: &'a FieldConfig,
    /// Shared tuning constants.
    pub tuning: &'a Tuning,
    /// Organization-name normalizer parameters.
    pub org_name: &'a OrgNameParams,
    /// Reference date for future/past partitioning.
    pub reference_date: NaiveDate,
}

impl ExtractionContext<'_> {
    /// The search scope: the configured section when one is set and found,
    /// otherwise the full text.
    pub fn scope(&self) -> SectionSlice<'_> {
        match &self.config.section {
            Some(section) => locate_section(self.text, section),
            None => SectionSlice {
                text: self.text,
                offset: 0,
                located: false,
            },
        }
    }

    /// Compile the configured value pattern, if any.
    pub(crate) fn value_pattern(&self) -> Result<Option<Regex>, ExtractionError> {
        match &self.config.pattern {
            Some(pattern) => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map(Some)
                .map_err(|e| ExtractionError::Pattern {
                    field: self.field_name.to_string(),
                    source: e,
                }),
            None => Ok(None),
        }
    }
}

/// A per-field extraction strategy.
pub trait FieldStrategy: Send + Sync {
    /// Extract the field. Absence of a value is encoded in the result;
    /// `Err` is reserved for structural failures (bad patterns).
    fn extract(&self, ctx: &ExtractionContext<'_>)
        -> Result<FieldExtractionResult, ExtractionError>;
}

/// Strategy lookup table, resolved once from configuration.
pub struct StrategyRegistry {
    default_strategy: Arc<dyn FieldStrategy>,
    overrides: HashMap<String, Arc<dyn FieldStrategy>>,
}

impl StrategyRegistry {
    /// Resolve every configured field's strategy. Policy-block fields are
    /// handled by the orchestrator directly and get no entry here.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let org: Arc<dyn FieldStrategy> = Arc::new(OrgNameStrategy::new(&config.org_name)?);
        let future_date: Arc<dyn FieldStrategy> = Arc::new(FutureDateStrategy);

        let mut overrides: HashMap<String, Arc<dyn FieldStrategy>> = HashMap::new();

        for (name, field) in &config.fields {
            match &field.strategy {
                StrategyKind::LabelProximity | StrategyKind::PolicyBlock { .. } => {}
                StrategyKind::OrgName => {
                    overrides.insert(name.clone(), Arc::clone(&org));
                }
                StrategyKind::FutureDate => {
                    overrides.insert(name.clone(), Arc::clone(&future_date));
                }
                StrategyKind::SiblingFilter => {
                    overrides.insert(
                        name.clone(),
                        Arc::new(SiblingFilterStrategy::new(&field.sibling_labels)?),
                    );
                }
            }
        }

        Ok(Self {
            default_strategy: Arc::new(LabelProximityStrategy),
            overrides,
        })
    }

    /// The strategy handling a field (default label-proximity when no
    /// override is registered).
    pub fn resolve(&self, field_name: &str) -> &dyn FieldStrategy {
        self.overrides
            .get(field_name)
            .map(|s| s.as_ref())
            .unwrap_or(self.default_strategy.as_ref())
    }
}

/// Largest index <= `idx` that lands on a char boundary.
pub(crate) fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut i = idx.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest index >= `idx` that lands on a char boundary.
pub(crate) fn ceil_boundary(text: &str, idx: usize) -> usize {
    let mut i = idx.min(text.len());
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
