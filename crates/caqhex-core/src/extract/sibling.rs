//! Sibling-label disambiguation for lookalike numeric IDs.
//!
//! A Medicaid ID and an NPI are both bare digit strings and often share a
//! region of the form. After candidate collection, the context around each
//! candidate is re-examined for labels belonging to the sibling field; a
//! candidate sitting next to a sibling label is discarded even when it was
//! the top-scoring match.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::proximity::{
    find_label, label_miss, label_regex, line_candidates, no_value_result, pattern_candidates,
    select_best, Windows,
};
use super::{ceil_boundary, floor_boundary, Candidate, ExtractionContext, FieldStrategy};
use crate::error::ExtractionError;
use crate::models::result::{Direction, ExtractionMethod, FieldExtractionResult};

/// Label-proximity with sibling-label context filtering.
pub struct SiblingFilterStrategy {
    indicators: Vec<Regex>,
}

impl SiblingFilterStrategy {
    /// Compile the sibling indicator patterns.
    pub fn new(patterns: &[String]) -> Result<Self, ExtractionError> {
        let indicators = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { indicators })
    }

    /// Whether the context around a candidate names the sibling field.
    fn is_sibling_labeled(
        &self,
        scope: &str,
        windows: &Windows<'_>,
        candidate: &Candidate,
        window: usize,
    ) -> bool {
        let value_len = candidate.value.len();
        let (start, end) = match candidate.direction {
            Direction::After => (
                windows.label_end.saturating_sub(window),
                windows.label_end + candidate.distance + value_len + window,
            ),
            _ => (
                windows
                    .label_start
                    .saturating_sub(candidate.distance + value_len + window),
                windows.label_start + window,
            ),
        };

        let start = floor_boundary(scope, start);
        let end = ceil_boundary(scope, end);
        let context = &scope[start..end];

        self.indicators.iter().any(|re| re.is_match(context))
    }
}

impl FieldStrategy for SiblingFilterStrategy {
    fn extract(
        &self,
        ctx: &ExtractionContext<'_>,
    ) -> Result<FieldExtractionResult, ExtractionError> {
        let pattern = ctx.value_pattern()?;
        let scope = ctx.scope();
        let mut fallback: Option<FieldExtractionResult> = None;

        for label in &ctx.config.labels {
            let re = label_regex(ctx.field_name, label)?;
            let Some(hit) = find_label(scope.text, &re) else {
                continue;
            };
            let windows = Windows::around(scope.text, &hit, ctx.config.max_distance);

            let mut candidates = match &pattern {
                Some(p) => {
                    pattern_candidates(&windows, p, ctx.tuning, ctx.config.max_distance, false)
                }
                None => Vec::new(),
            };

            if candidates.is_empty() {
                if ctx.config.pattern_required && pattern.is_some() {
                    if fallback.is_none() {
                        fallback = Some(
                            FieldExtractionResult::not_found(
                                ctx.field_name,
                                ExtractionMethod::LabelProximity,
                                vec![format!(
                                    "label '{label}' found but value does not match required pattern"
                                )],
                            )
                            .with_note("pattern required, heuristic fallback disabled"),
                        );
                    }
                    continue;
                }
                candidates = line_candidates(&windows, ctx.tuning);
            }

            if candidates.is_empty() {
                if fallback.is_none() {
                    fallback = Some(no_value_result(ctx, label, &windows));
                }
                continue;
            }

            let total = candidates.len();
            let survivors: Vec<Candidate> = candidates
                .into_iter()
                .filter(|c| {
                    !self.is_sibling_labeled(
                        scope.text,
                        &windows,
                        c,
                        ctx.tuning.sibling_context_window,
                    )
                })
                .collect();

            if survivors.is_empty() {
                debug!(
                    field = ctx.field_name,
                    rejected = total,
                    "all candidates carried sibling labels"
                );
                let rejection = FieldExtractionResult::not_found(
                    ctx.field_name,
                    ExtractionMethod::LabelProximity,
                    vec!["found candidate values but all were labeled as a sibling field"
                        .to_string()],
                )
                .with_note(format!(
                    "rejected {total} sibling-labeled value(s) to prevent a false positive"
                ));
                // This specific failure outranks a generic not-found from
                // another label.
                fallback = Some(rejection);
                continue;
            }

            return Ok(select_best(ctx, label, &windows, survivors));
        }

        Ok(fallback.unwrap_or_else(|| label_miss(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, OrgNameParams, Tuning};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn npi_indicators() -> Vec<String> {
        vec![
            r"\bNPI\s*:".to_string(),
            r"\bNPI\s+Number".to_string(),
            r"\bIndividual\s+NPI".to_string(),
            r"\bGroup\s+NPI".to_string(),
        ]
    }

    fn medicaid_config() -> FieldConfig {
        FieldConfig {
            labels: vec!["Medicaid ID".to_string()],
            pattern: Some(r"\d{6,12}".to_string()),
            max_distance: 60,
            pattern_required: true,
            sibling_labels: npi_indicators(),
            ..Default::default()
        }
    }

    fn extract(text: &str, config: &FieldConfig) -> FieldExtractionResult {
        let tuning = Tuning::default();
        let org = OrgNameParams::default();
        let strategy = SiblingFilterStrategy::new(&config.sibling_labels).unwrap();
        let ctx = ExtractionContext {
            field_name: "medicaid_id",
            text,
            config,
            tuning: &tuning,
            org_name: &org,
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        strategy.extract(&ctx).unwrap()
    }

    #[test]
    fn test_clean_candidate_survives() {
        let config = medicaid_config();
        let result = extract("Provider details\nMedicaid ID: 12345678\nCounty: Orange", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("12345678"));
        assert!(result.confidence >= 0.90);
    }

    #[test]
    fn test_sibling_collision_rejects_all_candidates() {
        // The NPI label sits inside every candidate's context window, so
        // both the before- and after-candidates are discarded.
        let config = medicaid_config();
        let result = extract("Individual NPI: 1234567890 Medicaid ID: 1234567890", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.errors[0].contains("sibling"));
        assert!(result.notes.as_deref().unwrap().contains("rejected"));
    }

    #[test]
    fn test_distant_sibling_label_does_not_reject() {
        // NPI appears far outside the candidate's context window.
        let filler = "x".repeat(120);
        let text =
            format!("Individual NPI: 1234567890\n{filler}\nMedicaid ID: 555666777\nCounty: Orange");
        let config = medicaid_config();
        let result = extract(&text, &config);

        assert_eq!(result.extracted_value.as_deref(), Some("555666777"));
    }

    #[test]
    fn test_label_miss_still_generic() {
        let config = medicaid_config();
        let result = extract("No identifiers here at all", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.errors[0].contains("could not find any of the labels"));
    }
}
