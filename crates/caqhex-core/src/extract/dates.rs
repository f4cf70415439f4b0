//! Future-date selection for expiration-style fields.
//!
//! Expiration labels frequently sit next to several dates (issue date,
//! renewal history, a neighboring field's date). Every pattern match in
//! both windows is collected and parsed; future dates are preferred,
//! furthest first. When nothing is in the future, the most recent past
//! date is still returned with an explicit expiration warning: showing an
//! expired value to a reviewer beats silence.

use chrono::NaiveDate;

use super::proximity::{
    context_snippet, find_label, label_miss, label_regex, no_value_result, pattern_candidates,
    Windows,
};
use super::{Candidate, ExtractionContext, FieldStrategy};
use crate::error::ExtractionError;
use crate::models::result::{ExtractionMethod, FieldExtractionResult};

/// Fallback formats when the field configuration lists none.
const FALLBACK_FORMATS: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d", "%m/%d/%y"];

/// Future-date selection over all date candidates near a label.
pub struct FutureDateStrategy;

impl FieldStrategy for FutureDateStrategy {
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

            let candidates = match &pattern {
                Some(p) => {
                    pattern_candidates(&windows, p, ctx.tuning, ctx.config.max_distance, true)
                }
                None => Vec::new(),
            };

            if candidates.is_empty() {
                if fallback.is_none() {
                    fallback = Some(no_value_result(ctx, label, &windows));
                }
                continue;
            }

            return Ok(self.select(ctx, label, &windows, candidates));
        }

        Ok(fallback.unwrap_or_else(|| label_miss(ctx)))
    }
}

impl FutureDateStrategy {
    /// Partition candidates by the reference date and pick the winner.
    fn select(
        &self,
        ctx: &ExtractionContext<'_>,
        label: &str,
        windows: &Windows<'_>,
        candidates: Vec<Candidate>,
    ) -> FieldExtractionResult {
        let formats = effective_formats(&ctx.config.date_formats);
        let total = candidates.len();

        let mut future: Vec<(Candidate, NaiveDate)> = Vec::new();
        let mut past: Vec<(Candidate, NaiveDate)> = Vec::new();
        let mut unparsed: Vec<Candidate> = Vec::new();

        for candidate in candidates {
            match parse_date(&candidate.value, &formats) {
                Some(date) if date > ctx.reference_date => future.push((candidate, date)),
                Some(date) => past.push((candidate, date)),
                None => unparsed.push(candidate),
            }
        }

        if !future.is_empty() {
            future.sort_by(|a, b| {
                b.1.cmp(&a.1).then(
                    b.0.confidence
                        .partial_cmp(&a.0.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
            });
            let (candidate, _) = future.into_iter().next().expect("future set not empty");
            let confidence = (candidate.confidence + ctx.tuning.future_date_boost
                + ctx.tuning.pattern_bonus)
                .min(1.0);

            return FieldExtractionResult::found(
                ctx.field_name,
                candidate.value,
                confidence,
                ExtractionMethod::DateSelect,
            )
            .with_context(context_snippet(windows, candidate.direction, ctx.tuning))
            .with_note(format!(
                "selected furthest future date from {total} candidate(s) near label '{label}'"
            ));
        }

        if !unparsed.is_empty() {
            unparsed.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.distance.cmp(&b.distance))
            });
            let candidate = unparsed.into_iter().next().expect("unparsed set not empty");
            let confidence = (candidate.confidence * ctx.tuning.unparsed_date_penalty
                + ctx.tuning.pattern_bonus)
                .min(1.0);

            return FieldExtractionResult::found(
                ctx.field_name,
                candidate.value,
                confidence,
                ExtractionMethod::DateSelect,
            )
            .with_context(context_snippet(windows, candidate.direction, ctx.tuning))
            .with_warnings(vec![
                "date value did not parse against any accepted format".to_string(),
            ])
            .with_note(format!("no parseable date among {total} candidate(s)"));
        }

        // Everything is in the past: return the most recent date, flagged.
        past.sort_by(|a, b| b.1.cmp(&a.1));
        let (candidate, date) = past.into_iter().next().expect("past set not empty");
        let days_expired = (ctx.reference_date - date).num_days();
        let confidence = (candidate.confidence * ctx.tuning.past_date_penalty
            + ctx.tuning.pattern_bonus)
            .min(1.0);

        FieldExtractionResult::found(
            ctx.field_name,
            candidate.value.clone(),
            confidence,
            ExtractionMethod::DateSelect,
        )
        .with_context(context_snippet(windows, candidate.direction, ctx.tuning))
        .with_warnings(vec![format!(
            "date {} expired {days_expired} days before the reference date",
            candidate.value
        )])
        .with_note(format!(
            "no future date among {total} candidate(s); most recent past date selected"
        ))
    }
}

fn effective_formats(configured: &[String]) -> Vec<String> {
    if configured.is_empty() {
        FALLBACK_FORMATS.iter().map(|s| s.to_string()).collect()
    } else {
        configured.to_vec()
    }
}

/// Parse a date string against the accepted formats, first hit wins.
pub(crate) fn parse_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    let value = value.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
