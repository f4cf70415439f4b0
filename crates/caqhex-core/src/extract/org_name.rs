//! Multi-line organization-name assembly and normalization.
//!
//! The practice-location name on these forms is an organization name of the
//! shape "<Prefix> <Keyword> - <Region>". Reconstruction regularly shreds
//! it: the dash disappears, form labels land in the middle of the name, and
//! the region qualifier splits around the keyword ("Emerald ... Corporation
//! Coast"). This strategy recognizes the known shapes, reassembles the
//! pieces, and re-emits one canonical string.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::proximity::{
    context_snippet, label_miss, label_regex, no_value_result, pattern_candidates, LabelHit,
    Windows,
};
use super::{ceil_boundary, floor_boundary, Candidate, ExtractionContext, FieldStrategy};
use crate::config::OrgNameParams;
use crate::error::ExtractionError;
use crate::models::result::{Direction, ExtractionMethod, FieldExtractionResult};

// Confidence ladder for the standalone shape patterns, strongest first.
const LABELED_SPLIT_CONFIDENCE: f32 = 0.95;
const INLINE_CONFIDENCE: f32 = 0.90;
const SPLIT_REGION_CONFIDENCE: f32 = 0.90;
const PARTIAL_REGION_CONFIDENCE: f32 = 0.85;
const NEARBY_REGION_CONFIDENCE: f32 = 0.85;
const REVERSED_CONFIDENCE: f32 = 0.80;

// Multi-line assembly scores higher when both sides of the label
// contributed fragments.
const ASSEMBLY_BOTH_SIDES_CONFIDENCE: f32 = 0.85;
const ASSEMBLY_ONE_SIDE_CONFIDENCE: f32 = 0.80;

lazy_static! {
    // Lines that terminate a practice name: the next form field.
    static ref NAME_STOP_PATTERNS: Vec<Regex> = [
        r"(?i)Street\s*Address",
        r"(?i)Street\s*\d",
        r"(?i)Street\s*:",
        r"^\d{3,5}\s",
        r"(?i)Tax\s+ID",
        r":\s*:",
        r"(?i)Phone\s+Number",
        r"(?i)Appointment\s+Phone",
        r"(?i)City\s*:",
        r"(?i)County\s*:",
        r"(?i)Zip\s*Code",
        r"(?i)Country\s*:",
        r"^\d{1,2}[/-]\d{1,2}[/-]\d{2,4}",
        r"^[A-Z]{2}\s+\d{5}",
        r"^\(\d{3}\)",
        r"^\d{3}[-.]?\d{3}[-.]?\d{4}",
        r"(?i)\b(?:Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\b",
        r"(?i)\d{1,2}:\d{2}\s*(?:AM|PM)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    // A line that is nothing but a form label.
    static ref LABEL_ONLY_LINE: Regex =
        Regex::new(r"(?i)^(?:Practice|Name|Location)\s*:?\s*$").unwrap();

    static ref EXACT_LABEL_LINE: Regex =
        Regex::new(r"(?i)^(?:Name\s*:?|Practice\s*:?)$").unwrap();

    static ref LABEL_WORDS: Regex =
        Regex::new(r"(?i)(?:Practice\s+Name|Name|Practice)\s*:?\s*").unwrap();

    // Junk the window sweeps in from neighboring form prose.
    static ref JUNK_PREFIXES: Vec<Regex> = [
        r"(?i)^.*?clinical\s+practice\s+including\s+special\s+",
        r"(?i)^.*?interests\s+",
        r"(?i)^.*?as\s+appears\s+on\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref TRAILING_PUNCT: Regex = Regex::new(r"[:\-]\s*$").unwrap();
    static ref INTERNAL_COLON: Regex = Regex::new(r"\s*:\s*").unwrap();
    static ref DASH_SPACING: Regex = Regex::new(r"\s+-\s*").unwrap();
    static ref DASH_LEADING: Regex = Regex::new(r"-\s+").unwrap();
}

/// Strategy for organization-name fields.
pub struct OrgNameStrategy {
    prefix: String,
    keyword: String,
    min_confidence: f32,
    prefix_re: Regex,
    labeled_split_re: Regex,
    inline_re: Regex,
    split_region_re: Regex,
    nearby_region_re: Regex,
    reversed_re: Regex,
    region_tail_re: Regex,
    keyword_strip_re: Regex,
}

impl OrgNameStrategy {
    /// Compile the shape patterns for the configured organization name.
    pub fn new(params: &OrgNameParams) -> Result<Self, ExtractionError> {
        let prefix_ws = params
            .prefix
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let keyword = regex::escape(&params.keyword);

        let build = |p: String| -> Result<Regex, ExtractionError> {
            RegexBuilder::new(&p)
                .build()
                .map_err(ExtractionError::StrategyPattern)
        };

        Ok(Self {
            prefix: params.prefix.clone(),
            keyword: params.keyword.clone(),
            min_confidence: params.min_confidence,
            prefix_re: build(format!(r"(?i){prefix_ws}"))?,
            // "Practice  <Prefix>\nName :\n<Keyword> Central Florida\n-"
            labeled_split_re: build(format!(
                r"(?is)Practice\s+{prefix_ws}\s*\n*.*?Name\s*:?\s*\n*{keyword}\s+(?:-\s*)?([A-Za-z\s]+?)(?:\n|$)"
            ))?,
            // "<Prefix> <Keyword> - Central Florida"
            inline_re: build(format!(
                r"(?is){prefix_ws}\s+{keyword}\s*[-\u{{2013}}]\s*([A-Za-z\s]+?)(?:\n|Street|Phone|Fax|$)"
            ))?,
            // "<Prefix> ... Emerald <Keyword> Coast -"
            split_region_re: build(format!(
                r"(?is){prefix_ws}\s*\n*.*?([A-Za-z\s]+?)\s*\n*{keyword}\s+([A-Za-z\s]+?)(?:\s*\n*[-\u{{2013}}]|\n|Street|Phone|$)"
            ))?,
            nearby_region_re: build(format!(
                r"(?i){keyword}\s*[-\u{{2013}}]?\s*([A-Za-z][A-Za-z\s&]+?)(?:\n|Street|Phone|$)"
            ))?,
            // "<Keyword> - Region ... <Prefix>"
            reversed_re: build(format!(
                r"(?is){keyword}\s*[-\u{{2013}}]?\s*([A-Za-z][A-Za-z\s&]+?)\s*\n*.*?{prefix_ws}"
            ))?,
            region_tail_re: build(format!(r"(?i){prefix_ws}\s+(?:{keyword}\s+)?(.+)$"))?,
            keyword_strip_re: build(format!(r"(?i)\b{keyword}\b\.?"))?,
        })
    }

    fn canonical(&self, region: &str) -> String {
        format!("{} {} - {}", self.prefix, self.keyword, region)
    }

    /// Try the known shape patterns against the full text, strongest first.
    fn standalone(&self, text: &str) -> Option<(String, f32)> {
        if let Some(caps) = self.labeled_split_re.captures(text) {
            let region = collapse_ws(&caps[1]);
            if !region.is_empty() {
                return Some((self.canonical(&region), LABELED_SPLIT_CONFIDENCE));
            }
        }

        if let Some(caps) = self.inline_re.captures(text) {
            let region = collapse_ws(&caps[1]);
            if !region.is_empty() {
                return Some((self.canonical(&region), INLINE_CONFIDENCE));
            }
        }

        if let Some(caps) = self.split_region_re.captures(text) {
            let part1 = LABEL_WORDS.replace_all(caps[1].trim(), "");
            let part1 = filter_region_words(&part1, true);
            let part2 = filter_region_words(caps[2].trim(), false);

            if !part1.is_empty() && !part2.is_empty() {
                return Some((
                    self.canonical(&format!("{part1} {part2}")),
                    SPLIT_REGION_CONFIDENCE,
                ));
            }
            if !part2.is_empty() && (2..=50).contains(&part2.len()) {
                return Some((self.canonical(&part2), PARTIAL_REGION_CONFIDENCE));
            }
        }

        // Any prefix occurrence with the keyword and a region close behind.
        for m in self.prefix_re.find_iter(text) {
            let end = ceil_boundary(text, (m.end() + 200).min(text.len()));
            let context = &text[m.start()..end];
            if let Some(caps) = self.nearby_region_re.captures(context) {
                let region = collapse_ws(&caps[1]);
                if (2..=50).contains(&region.len())
                    && !region.to_lowercase().starts_with("street")
                {
                    return Some((self.canonical(&region), NEARBY_REGION_CONFIDENCE));
                }
            }
        }

        if let Some(caps) = self.reversed_re.captures(text) {
            let region = collapse_ws(&caps[1]);
            if region.len() > 2 {
                return Some((self.canonical(&region), REVERSED_CONFIDENCE));
            }
        }

        None
    }

    /// First label occurrence that is not inside the tax-information
    /// subsection (the same "Name" label appears there over a W-9 note).
    fn find_label_filtered(&self, scope: &str, re: &Regex) -> Option<LabelHit> {
        for m in re.find_iter(scope) {
            let before_start = floor_boundary(scope, m.start().saturating_sub(200));
            let after_end = ceil_boundary(scope, (m.end() + 50).min(scope.len()));

            let before = scope[before_start..m.start()].to_lowercase();
            let after = scope[m.start()..after_end].to_lowercase();

            if before.contains("tax information") {
                continue;
            }
            if after.contains("w-9") || after.contains("appears on") {
                continue;
            }

            return Some(LabelHit {
                start: m.start(),
                end: m.end(),
            });
        }
        None
    }

    /// Assemble a name from line fragments on both sides of the label.
    fn assembly_candidate(&self, windows: &Windows<'_>) -> Option<Candidate> {
        // Fragments often precede the label ("Practice  <Prefix>" above a
        // "Name :" line), so both sides contribute.
        let before_lines: Vec<&str> = windows.before.split('\n').collect();
        let tail = &before_lines[before_lines.len().saturating_sub(3)..];
        let mut collected: Vec<String> = Vec::new();

        for line in tail.iter() {
            let trimmed = line.trim();
            if trimmed.len() > 1 && !LABEL_ONLY_LINE.is_match(trimmed) {
                collected.push(trimmed.to_string());
            }
        }
        let before_count = collected.len();

        for line in windows.after.split('\n').take(8) {
            if NAME_STOP_PATTERNS.iter().any(|re| re.is_match(line)) {
                break;
            }
            let cleaned = line.trim().trim_end_matches(':').trim();
            if !cleaned.is_empty() && !EXACT_LABEL_LINE.is_match(cleaned) {
                collected.push(cleaned.to_string());
            }
        }

        if collected.is_empty() {
            return None;
        }

        let after_count = collected.len() - before_count;
        let mut value = collected.join(" ");
        value = DASH_SPACING.replace_all(&value, " - ").into_owned();
        value = DASH_LEADING.replace_all(&value, "- ").into_owned();

        let confidence = if before_count > 0 && after_count > 0 {
            ASSEMBLY_BOTH_SIDES_CONFIDENCE
        } else {
            ASSEMBLY_ONE_SIDE_CONFIDENCE
        };

        Some(Candidate {
            value,
            confidence,
            distance: 0,
            direction: Direction::Bidirectional,
            pattern_matched: false,
        })
    }

    /// Normalize, reject, or clean the winning candidate.
    fn finish(
        &self,
        ctx: &ExtractionContext<'_>,
        label: &str,
        windows: &Windows<'_>,
        best: Candidate,
        pattern: Option<&Regex>,
    ) -> FieldExtractionResult {
        let mut value = collapse_ws(&best.value);
        let mut confidence = best.confidence;
        if best.pattern_matched {
            confidence = (confidence + ctx.tuning.pattern_bonus).min(1.0);
        }

        let is_org = self.prefix_re.is_match(&value);

        if ctx.config.pattern_required && !is_org {
            let shown: String = value.chars().take(50).collect();
            return FieldExtractionResult::not_found(
                ctx.field_name,
                ExtractionMethod::OrgName,
                vec![format!(
                    "practice location '{shown}' does not match the expected organization format"
                )],
            )
            .with_note("rejected non-matching organization");
        }

        if is_org {
            let exact = pattern
                .and_then(|p| p.find(&value))
                .map(|m| m.as_str().trim().to_string());
            match exact {
                Some(matched) => value = matched,
                None => {
                    // Dropped dash or transposed keyword: pull the region
                    // tail out and rebuild the canonical form.
                    let region = self.region_tail_re.captures(&value).map(|caps| {
                        let region = self.keyword_strip_re.replace_all(caps[1].trim(), "");
                        collapse_ws(&region)
                    });
                    if let Some(region) = region {
                        if !region.is_empty() {
                            value = self.canonical(&region);
                        }
                    }
                }
            }
        } else {
            for junk in JUNK_PREFIXES.iter() {
                let junk_end = junk.find(&value).map(|m| m.end());
                if let Some(end) = junk_end {
                    value = value[end..].to_string();
                    break;
                }
            }
            value = value.replace("as appears", "");
            value = value.replace("Name :", "");
            value = value.replace(":  :", "");
            value = TRAILING_PUNCT.replace_all(&value, "").into_owned();
            value = INTERNAL_COLON.replace_all(&value, " ").into_owned();
        }

        value = collapse_ws(&value);
        if value.is_empty() {
            return no_value_result(ctx, label, windows);
        }

        debug!(field = ctx.field_name, value = %value, "organization name normalized");

        FieldExtractionResult::found(ctx.field_name, value, confidence, ExtractionMethod::OrgName)
            .with_context(context_snippet(windows, best.direction, ctx.tuning))
            .with_note(format!("assembled from fragments around label '{label}'"))
    }
}

impl FieldStrategy for OrgNameStrategy {
    fn extract(
        &self,
        ctx: &ExtractionContext<'_>,
    ) -> Result<FieldExtractionResult, ExtractionError> {
        // A confident standalone hit short-circuits label search entirely.
        if let Some((name, confidence)) = self.standalone(ctx.text) {
            if confidence >= self.min_confidence {
                return Ok(FieldExtractionResult::found(
                    ctx.field_name,
                    name.clone(),
                    confidence,
                    ExtractionMethod::OrgName,
                )
                .with_note(format!("organization detected: {name}")));
            }
        }

        let pattern = ctx.value_pattern()?;
        let scope = ctx.scope();
        let mut fallback: Option<FieldExtractionResult> = None;

        for label in &ctx.config.labels {
            let re = label_regex(ctx.field_name, label)?;
            let Some(hit) = self.find_label_filtered(scope.text, &re) else {
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
                if let Some((name, confidence)) = self.standalone(ctx.text) {
                    candidates.push(Candidate {
                        value: name,
                        confidence,
                        distance: 0,
                        direction: Direction::Derived,
                        pattern_matched: false,
                    });
                }
            }

            if candidates.is_empty() {
                // Assembly still runs under a mandatory pattern: the
                // rejection must name the wrong organization, not a blank.
                if let Some(candidate) = self.assembly_candidate(&windows) {
                    candidates.push(candidate);
                }
            }

            if candidates.is_empty() {
                if ctx.config.pattern_required && pattern.is_some() {
                    if fallback.is_none() {
                        fallback = Some(
                            FieldExtractionResult::not_found(
                                ctx.field_name,
                                ExtractionMethod::OrgName,
                                vec![format!(
                                    "label '{label}' found but value does not match required pattern"
                                )],
                            )
                            .with_note("pattern required, heuristic fallback disabled"),
                        );
                    }
                    continue;
                }
                if fallback.is_none() {
                    fallback = Some(no_value_result(ctx, label, &windows));
                }
                continue;
            }

            candidates.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.distance.cmp(&b.distance))
            });
            let best = candidates.into_iter().next().expect("candidates not empty");

            let result = self.finish(ctx, label, &windows, best, pattern.as_ref());
            if result.extracted_value.is_some() {
                return Ok(result);
            }
            if fallback.is_none() || result.errors.iter().any(|e| e.contains("organization")) {
                fallback = Some(result);
            }
        }

        Ok(fallback.unwrap_or_else(|| label_miss(ctx)))
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop label words and single letters that leak into region fragments.
fn filter_region_words(part: &str, strip_labels: bool) -> String {
    part.split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .filter(|w| {
            !strip_labels
                || !matches!(
                    w.to_lowercase().as_str(),
                    "practice" | "name" | "location"
                )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, Tuning};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const CANONICAL_PATTERN: &str =
        r"Positive\s+Behavior\s+Supports\s+Corporation\s*-\s*[A-Za-z][A-Za-z ]+";

    fn org_config(pattern_required: bool) -> FieldConfig {
        FieldConfig {
            labels: vec![
                "Practice Name".to_string(),
                "Organization Name".to_string(),
                "Name".to_string(),
            ],
            pattern: Some(CANONICAL_PATTERN.to_string()),
            max_distance: 150,
            pattern_required,
            ..Default::default()
        }
    }

    fn extract(text: &str, config: &FieldConfig) -> FieldExtractionResult {
        let params = OrgNameParams::default();
        let strategy = OrgNameStrategy::new(&params).unwrap();
        let tuning = Tuning::default();
        let ctx = ExtractionContext {
            field_name: "practice_location_name",
            text,
            config,
            tuning: &tuning,
            org_name: &params,
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        strategy.extract(&ctx).unwrap()
    }

    #[test]
    fn test_inline_canonical_name() {
        let config = org_config(false);
        let result = extract(
            "Practice Name: Positive Behavior Supports Corporation - Suwannee River\nStreet 1: 10 Main St",
            &config,
        );

        assert_eq!(
            result.extracted_value.as_deref(),
            Some("Positive Behavior Supports Corporation - Suwannee River")
        );
        assert!(result.confidence >= 0.80);
        assert_eq!(result.extraction_method, ExtractionMethod::OrgName);
    }

    #[test]
    fn test_labeled_split_across_lines() {
        let config = org_config(false);
        let result = extract(
            "Practice  Positive Behavior Supports\nName :\nCorporation Central Florida\n-\nStreet 1:  907 Outer Rd",
            &config,
        );

        assert_eq!(
            result.extracted_value.as_deref(),
            Some("Positive Behavior Supports Corporation - Central Florida")
        );
        assert!(result.confidence >= 0.90);
    }

    #[test]
    fn test_region_split_around_keyword() {
        let config = org_config(false);
        let result = extract(
            "Positive Behavior Supports\nPractice Name:\nEmerald\nCorporation Coast\n-\nStreet 1: 5 Shore Dr",
            &config,
        );

        assert_eq!(
            result.extracted_value.as_deref(),
            Some("Positive Behavior Supports Corporation - Emerald Coast")
        );
    }

    #[test]
    fn test_non_org_name_kept_when_pattern_optional() {
        let config = org_config(false);
        let result = extract(
            "Practice Name: Neuro Dverse LLC\nStreet: 123 Main St",
            &config,
        );

        assert_eq!(result.extracted_value.as_deref(), Some("Neuro Dverse LLC"));
    }

    #[test]
    fn test_non_org_rejected_when_pattern_required() {
        let config = org_config(true);
        let result = extract(
            "Practice Name: Neuro Dverse LLC\nStreet: 123 Main St",
            &config,
        );

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.errors[0].contains("expected organization format"));
    }

    #[test]
    fn test_missing_dash_normalized() {
        let config = org_config(false);
        let result = extract(
            "Practice Name: Positive Behavior Supports Corporation Emerald Coast\nTax ID: 12-3456789",
            &config,
        );

        assert_eq!(
            result.extracted_value.as_deref(),
            Some("Positive Behavior Supports Corporation - Emerald Coast")
        );
    }

    #[test]
    fn test_tax_information_label_skipped() {
        // The "Name" label under Tax Information must not win over the real
        // practice-location entry further down.
        let config = org_config(false);
        let filler = "provider history line\n".repeat(12);
        let text = format!(
            "Tax Information\nName : Sunrise Billing W-9\n{filler}\n\n\nName :\nBright Path Therapy LLC\nStreet 1: 44 Bay Rd"
        );
        let result = extract(&text, &config);

        assert_eq!(
            result.extracted_value.as_deref(),
            Some("Bright Path Therapy LLC")
        );
    }

    #[test]
    fn test_no_label_and_no_org_misses() {
        let config = org_config(false);
        let result = extract("Completely unrelated text about weather.", &config);

        assert!(result.extracted_value.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_filter_region_words() {
        assert_eq!(filter_region_words("Practice Name Emerald", true), "Emerald");
        assert_eq!(filter_region_words("a Coast", false), "Coast");
    }
}
