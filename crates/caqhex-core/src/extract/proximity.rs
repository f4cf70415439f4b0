//! Bidirectional label-proximity extraction.
//!
//! The layout places a value on either side of its label depending on how
//! the column structure survived reconstruction, so both windows are always
//! searched. After-label matches carry a higher base confidence than
//! before-label matches; proximity to the label erodes both.

use regex::Regex;

use super::{ceil_boundary, floor_boundary, Candidate, ExtractionContext, FieldStrategy};
use crate::config::Tuning;
use crate::error::ExtractionError;
use crate::models::result::{Direction, ExtractionMethod, FieldExtractionResult};

/// The default strategy: generic bidirectional label-proximity search.
pub struct LabelProximityStrategy;

impl FieldStrategy for LabelProximityStrategy {
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

            match search_windows(ctx, label, &windows, pattern.as_ref()) {
                outcome if outcome.extracted_value.is_some() => return Ok(outcome),
                outcome => {
                    // Keep the most informative miss: a found label beats
                    // the generic every-label-missing result.
                    if fallback.is_none() {
                        fallback = Some(outcome);
                    }
                }
            }
        }

        Ok(fallback.unwrap_or_else(|| label_miss(ctx)))
    }
}

/// Search both windows around one found label and build a result.
fn search_windows(
    ctx: &ExtractionContext<'_>,
    label: &str,
    windows: &Windows<'_>,
    pattern: Option<&Regex>,
) -> FieldExtractionResult {
    let mut candidates = match pattern {
        Some(re) => pattern_candidates(windows, re, ctx.tuning, ctx.config.max_distance, false),
        None => Vec::new(),
    };

    if candidates.is_empty() {
        if ctx.config.pattern_required && pattern.is_some() {
            return FieldExtractionResult::not_found(
                ctx.field_name,
                ExtractionMethod::LabelProximity,
                vec![format!(
                    "label '{label}' found but value does not match required pattern"
                )],
            )
            .with_note("pattern required, heuristic fallback disabled");
        }
        candidates = line_candidates(windows, ctx.tuning);
    }

    if candidates.is_empty() {
        return no_value_result(ctx, label, windows);
    }

    select_best(ctx, label, windows, candidates)
}

/// Compiled label occurrence within the search scope.
pub(crate) struct LabelHit {
    pub start: usize,
    pub end: usize,
}

/// The two character windows flanking a label match.
pub(crate) struct Windows<'a> {
    pub before: &'a str,
    pub after: &'a str,
    pub label_start: usize,
    pub label_end: usize,
}

impl<'a> Windows<'a> {
    pub(crate) fn around(scope: &'a str, hit: &LabelHit, radius: usize) -> Self {
        let after_end = ceil_boundary(scope, hit.end.saturating_add(radius));
        let before_start = floor_boundary(scope, hit.start.saturating_sub(radius));
        Self {
            before: &scope[before_start..hit.start],
            after: &scope[hit.end..after_end],
            label_start: hit.start,
            label_end: hit.end,
        }
    }
}

/// Build a case-insensitive label pattern with flexible inter-word
/// whitespace, an optional trailing colon, and a leading word-boundary
/// guard for short first words ("Name" must not match inside "FirstName").
pub(crate) fn label_regex(field: &str, label: &str) -> Result<Regex, ExtractionError> {
    let words: Vec<String> = label.split_whitespace().map(|w| regex::escape(w)).collect();
    let body = words.join(r"\s*");

    let short_first_word = label
        .split_whitespace()
        .next()
        .map(|w| w.chars().count() <= 6)
        .unwrap_or(false);
    let guard = if short_first_word { r"\b" } else { "" };

    let pattern = format!(r"(?i){guard}{body}\s*:?\s*");
    Regex::new(&pattern).map_err(|e| ExtractionError::Label {
        field: field.to_string(),
        label: label.to_string(),
        source: e,
    })
}

/// First occurrence of the label in the scope.
pub(crate) fn find_label(scope: &str, re: &Regex) -> Option<LabelHit> {
    re.find(scope).map(|m| LabelHit {
        start: m.start(),
        end: m.end(),
    })
}

/// Pattern matches in both windows, scored by distance and direction.
///
/// With `collect_all` every match in each window becomes a candidate
/// (needed for date selection); otherwise only the first after-match and
/// the closest before-match are considered.
pub(crate) fn pattern_candidates(
    windows: &Windows<'_>,
    pattern: &Regex,
    tuning: &Tuning,
    radius: usize,
    collect_all: bool,
) -> Vec<Candidate> {
    let radius = radius.max(1) as f32;
    let mut candidates = Vec::new();

    let after_matches: Vec<_> = pattern.find_iter(windows.after).collect();
    for m in &after_matches {
        let distance = m.start();
        let confidence =
            (tuning.after_base_confidence - distance as f32 / radius * tuning.after_distance_penalty)
                .max(0.0);
        candidates.push(Candidate {
            value: m.as_str().trim().to_string(),
            confidence,
            distance,
            direction: Direction::After,
            pattern_matched: true,
        });
        if !collect_all {
            break;
        }
    }

    let before_matches: Vec<_> = pattern.find_iter(windows.before).collect();
    let before_slice: &[_] = if collect_all {
        &before_matches
    } else {
        // Only the closest match to the label is worth scoring.
        match before_matches.last() {
            Some(last) => std::slice::from_ref(last),
            None => &[],
        }
    };
    for m in before_slice {
        let distance = windows.before.len() - m.end();
        let confidence = (tuning.before_base_confidence
            - distance as f32 / radius * tuning.before_distance_penalty)
            .max(0.0);
        candidates.push(Candidate {
            value: m.as_str().trim().to_string(),
            confidence,
            distance,
            direction: Direction::Before,
            pattern_matched: true,
        });
    }

    candidates
}

/// Line-based heuristic: the first plausible line near the label.
pub(crate) fn line_candidates(windows: &Windows<'_>, tuning: &Tuning) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (i, line) in windows.after.split('\n').take(3).enumerate() {
        let cleaned = clean_line(line);
        if cleaned.chars().count() > 1 {
            let confidence = (tuning.line_after_base - i as f32 * tuning.line_decay).max(0.0);
            candidates.push(Candidate {
                value: cleaned.to_string(),
                confidence,
                distance: i,
                direction: Direction::After,
                pattern_matched: false,
            });
            break;
        }
    }

    if candidates.is_empty() {
        let before_lines: Vec<&str> = windows.before.split('\n').collect();
        let tail = &before_lines[before_lines.len().saturating_sub(3)..];
        for (i, line) in tail.iter().rev().enumerate() {
            let cleaned = clean_line(line);
            if cleaned.chars().count() > 1 {
                let confidence = (tuning.line_before_base - i as f32 * tuning.line_decay).max(0.0);
                candidates.push(Candidate {
                    value: cleaned.to_string(),
                    confidence,
                    distance: i,
                    direction: Direction::Before,
                    pattern_matched: false,
                });
                break;
            }
        }
    }

    candidates
}

fn clean_line(line: &str) -> &str {
    line.trim().trim_end_matches(':').trim()
}

/// Rank candidates, apply the pattern bonus, and build the final result.
pub(crate) fn select_best(
    ctx: &ExtractionContext<'_>,
    label: &str,
    windows: &Windows<'_>,
    mut candidates: Vec<Candidate>,
) -> FieldExtractionResult {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.distance.cmp(&b.distance))
    });

    let best = candidates.into_iter().next().expect("candidates not empty");

    let mut confidence = best.confidence;
    if best.pattern_matched {
        // Pattern confirmation is stronger evidence than proximity alone.
        confidence = (confidence + ctx.tuning.pattern_bonus).min(1.0);
    }

    let method = match (best.pattern_matched, best.direction) {
        (true, Direction::Before) => ExtractionMethod::PatternBefore,
        (true, _) => ExtractionMethod::PatternAfter,
        (false, _) => ExtractionMethod::LineHeuristic,
    };

    let mut warnings = Vec::new();
    if best.value.chars().count() < 2 {
        warnings.push("extracted value is very short - may be incomplete".to_string());
    }

    FieldExtractionResult::found(ctx.field_name, best.value, confidence, method)
        .with_context(context_snippet(windows, best.direction, ctx.tuning))
        .with_warnings(warnings)
        .with_note(format!(
            "extracted using label '{label}' (value {} label, distance {})",
            direction_word(best.direction),
            best.distance
        ))
}

/// Label found but neither window produced anything.
pub(crate) fn no_value_result(
    ctx: &ExtractionContext<'_>,
    label: &str,
    windows: &Windows<'_>,
) -> FieldExtractionResult {
    let mut warnings = Vec::new();
    if let Some(pattern) = &ctx.config.pattern {
        warnings.push(format!("expected pattern: {pattern}"));
    }

    FieldExtractionResult::empty_value(
        ctx.field_name,
        ctx.tuning.empty_value_confidence,
        ExtractionMethod::LabelProximity,
        vec![format!(
            "label '{label}' found but no value extracted in either direction"
        )],
    )
    .with_context(context_snippet(windows, Direction::After, ctx.tuning))
    .with_warnings(warnings)
}

/// No configured label appeared anywhere in the scope.
pub(crate) fn label_miss(ctx: &ExtractionContext<'_>) -> FieldExtractionResult {
    let tried = ctx.config.labels.join(", ");
    let scope_note = ctx
        .config
        .section
        .as_deref()
        .map(|s| format!(" (searched in {s} section)"))
        .unwrap_or_default();

    FieldExtractionResult::not_found(
        ctx.field_name,
        ExtractionMethod::LabelProximity,
        vec![format!("could not find any of the labels: {tried}{scope_note}")],
    )
    .with_note(format!("tried labels: {tried}"))
}

pub(crate) fn context_snippet(windows: &Windows<'_>, direction: Direction, tuning: &Tuning) -> String {
    match direction {
        Direction::Before => {
            let start = floor_boundary(
                windows.before,
                windows.before.len().saturating_sub(tuning.context_chars),
            );
            windows.before[start..].to_string()
        }
        _ => {
            let end = floor_boundary(windows.after, tuning.context_chars);
            windows.after[..end].to_string()
        }
    }
}

fn direction_word(direction: Direction) -> &'static str {
    match direction {
        Direction::Before => "before",
        Direction::After => "after",
        Direction::Bidirectional => "around",
        Direction::Derived => "derived from",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, OrgNameParams, Tuning};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn field_config(labels: &[&str], pattern: Option<&str>) -> FieldConfig {
        FieldConfig {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            pattern: pattern.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    fn extract(text: &str, config: &FieldConfig) -> FieldExtractionResult {
        let tuning = Tuning::default();
        let org = OrgNameParams::default();
        let ctx = ExtractionContext {
            field_name: "test_field",
            text,
            config,
            tuning: &tuning,
            org_name: &org,
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        LabelProximityStrategy.extract(&ctx).unwrap()
    }

    #[test]
    fn test_simple_label_after_match() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("Medicaid ID: 12345678\n", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("12345678"));
        assert!(result.confidence >= 0.90);
        assert_eq!(result.extraction_method, ExtractionMethod::PatternAfter);
    }

    #[test]
    fn test_value_before_label() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("99887766\nMedicaid ID :\nOther text", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("99887766"));
        assert_eq!(result.extraction_method, ExtractionMethod::PatternBefore);
    }

    #[test]
    fn test_after_wins_at_equal_distance() {
        // Pattern matches at identical distances on both sides (one comma
        // each way); the after-match must win by its higher base confidence.
        let config = field_config(&["ID"], Some(r"\d{6}"));
        let result = extract("111111,ID:,222222", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("222222"));
        assert_eq!(result.extraction_method, ExtractionMethod::PatternAfter);
    }

    #[test]
    fn test_no_label_gives_zero_confidence() {
        let config = field_config(&["Medicaid ID", "Medicaid Number"], Some(r"\d{6,12}"));
        let result = extract("This document has no identifiers at all.", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.errors[0].contains("Medicaid ID"));
        assert!(result.errors[0].contains("Medicaid Number"));
    }

    #[test]
    fn test_label_found_but_empty_scores_point_three() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        // Label exists, nothing usable on either side.
        let result = extract("Medicaid ID:\n", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_pattern_required_disables_line_fallback() {
        let mut config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        config.pattern_required = true;
        let result = extract("Medicaid ID: not-a-number\nmore text here", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.errors[0].contains("required pattern"));
    }

    #[test]
    fn test_line_fallback_without_pattern() {
        let config = field_config(&["City"], None);
        let result = extract("City:\nMiami\nState: FL", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("Miami"));
        assert_eq!(result.extraction_method, ExtractionMethod::LineHeuristic);
        assert!(result.confidence <= 0.75);
    }

    #[test]
    fn test_labels_tried_in_priority_order() {
        let config = field_config(&["Medicaid Number", "Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("Medicaid ID: 555666777", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("555666777"));
        assert!(result.notes.as_deref().unwrap().contains("Medicaid ID"));
    }

    #[test]
    fn test_short_label_guard_rejects_embedded_match() {
        // "Name" must not match inside the merged token "FirstName".
        let config = field_config(&["Name"], None);
        let result = extract("FirstName: John\nnothing else", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_flexible_label_whitespace() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("Medicaid   ID :  12345678", &config);

        assert_eq!(result.extracted_value.as_deref(), Some("12345678"));
    }

    #[test]
    fn test_confidence_decays_with_distance() {
        let config = field_config(&["ID"], Some(r"\d{6}"));
        let near = extract("ID: 111222", &config);
        let far = extract("ID: ..................................111222", &config);

        assert!(near.confidence > far.confidence);
    }

    #[test]
    fn test_context_attached() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("Medicaid ID: 12345678 and surrounding context", &config);

        let context = result.raw_text_context.unwrap();
        assert!(context.contains("12345678"));
        assert!(context.len() <= 100);
    }

    #[test]
    fn test_pattern_bonus_applied() {
        let config = field_config(&["Medicaid ID"], Some(r"\d{6,12}"));
        let result = extract("Medicaid ID: 12345678", &config);

        // Distance 0 after-match: 0.90 base + 0.05 bonus.
        assert!((result.confidence - 0.95).abs() < 1e-6);
    }
}
