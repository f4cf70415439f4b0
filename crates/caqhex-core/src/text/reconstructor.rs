//! Reading-order text reconstruction from per-page token streams.
//!
//! Multi-column CAQH forms lose label-value adjacency when tokens are read
//! in stream order. Reconstruction groups tokens into rows by vertical
//! proximity, orders rows top-to-bottom and words left-to-right, and inserts
//! width-scaled whitespace so that a column break still reads as a gap.

use std::collections::BTreeMap;

use tracing::debug;

use super::{PageTokens, Token};
use crate::config::Tuning;
use crate::error::TextError;

/// Source of the token stream; OCR coordinates are noisier and need wider
/// tolerances plus merged-token repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceProfile {
    /// Native PDF word extraction.
    Native,
    /// OCR word boxes.
    Ocr,
}

/// Reconstruct linearized reading-order text from per-page tokens.
///
/// Pages with no tokens contribute no lines. A document with zero tokens on
/// every page is an extraction failure, not an empty success.
pub fn reconstruct(
    pages: &[PageTokens],
    profile: SourceProfile,
    tuning: &Tuning,
) -> Result<String, TextError> {
    let total_tokens: usize = pages.iter().map(|p| p.tokens.len()).sum();
    if total_tokens == 0 {
        return Err(TextError::NoTokens);
    }

    let (row_tolerance, column_gap) = match profile {
        SourceProfile::Native => (tuning.native_row_tolerance, tuning.native_column_gap),
        SourceProfile::Ocr => (tuning.ocr_row_tolerance, tuning.ocr_column_gap),
    };

    let mut parts = String::new();

    for page in pages {
        if page.tokens.is_empty() {
            continue;
        }

        let lines = reconstruct_page(&page.tokens, profile, row_tolerance, column_gap, tuning);
        if lines.is_empty() {
            continue;
        }

        let marker = match profile {
            SourceProfile::Native => format!("\n--- Page {} ---\n", page.number),
            SourceProfile::Ocr => format!("\n--- Page {} (OCR) ---\n", page.number),
        };
        parts.push_str(&marker);
        parts.push_str(&lines.join("\n"));
    }

    debug!(
        "reconstructed {} chars from {} pages ({} tokens)",
        parts.len(),
        pages.len(),
        total_tokens
    );

    Ok(parts)
}

fn reconstruct_page(
    tokens: &[Token],
    profile: SourceProfile,
    row_tolerance: f32,
    column_gap: f32,
    tuning: &Tuning,
) -> Vec<String> {
    // Bucket tokens into rows by rounding the top edge to the nearest
    // multiple of the vertical tolerance.
    let mut rows: BTreeMap<i64, Vec<&Token>> = BTreeMap::new();
    for token in tokens {
        let key = (token.top / row_tolerance).round() as i64;
        rows.entry(key).or_default().push(token);
    }

    let mut lines = Vec::with_capacity(rows.len());

    for (_, mut row) in rows {
        row.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));

        let mut line = String::new();
        let mut prev_right: Option<f32> = None;

        for token in row {
            if let Some(right) = prev_right {
                let gap = token.left - right;
                if gap > tuning.word_gap {
                    // Double space marks a column separation.
                    if gap > column_gap {
                        line.push_str("  ");
                    } else {
                        line.push(' ');
                    }
                }
            }

            match profile {
                SourceProfile::Ocr => line.push_str(&split_merged_words(&token.text)),
                SourceProfile::Native => line.push_str(&token.text),
            }
            prev_right = Some(token.right);
        }

        if !line.trim().is_empty() {
            lines.push(line);
        }
    }

    lines
}

/// Insert a space at internal lowercase-to-uppercase transitions.
///
/// OCR merges adjacent form labels into one token ("SocialSecurity");
/// the transition is the only remaining evidence of the original gap.
fn split_merged_words(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev: Option<char> = None;

    for c in word.chars() {
        if let Some(p) = prev {
            if p.is_lowercase() && c.is_uppercase() {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tuning() -> Tuning {
        Tuning::default()
    }

    #[test]
    fn test_single_row_ordered_left_to_right() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("ID:", 43.0, 100.0, 55.0),
                Token::new("Medicaid", 10.0, 100.0, 38.0),
                Token::new("12345678", 60.0, 101.0, 90.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(text.contains("Medicaid ID: 12345678"));
        assert!(text.contains("--- Page 1 ---"));
    }

    #[test]
    fn test_rows_ordered_top_to_bottom() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("second", 10.0, 120.0, 40.0),
                Token::new("first", 10.0, 100.0, 30.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        let first_pos = text.find("first").unwrap();
        let second_pos = text.find("second").unwrap();
        assert!(first_pos < second_pos);
    }

    #[test]
    fn test_vertical_tolerance_groups_same_line() {
        // Tops 100 and 102 round to the same 5px bucket.
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("left", 10.0, 100.0, 30.0),
                Token::new("right", 35.0, 102.0, 55.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(text.contains("left right"));
    }

    #[test]
    fn test_large_gap_becomes_double_space() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("Name:", 10.0, 100.0, 40.0),
                Token::new("Phone:", 200.0, 100.0, 240.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(text.contains("Name:  Phone:"));
    }

    #[test]
    fn test_small_gap_single_space() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("First", 10.0, 100.0, 35.0),
                Token::new("Name", 45.0, 100.0, 70.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(text.contains("First Name"));
    }

    #[test]
    fn test_touching_tokens_no_space() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![
                Token::new("123-", 10.0, 100.0, 30.0),
                Token::new("45-6789", 31.0, 100.0, 60.0),
            ],
        }];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(text.contains("123-45-6789"));
    }

    #[test]
    fn test_ocr_splits_merged_labels() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![Token::new("SocialSecurity", 10.0, 100.0, 80.0)],
        }];

        let text = reconstruct(&pages, SourceProfile::Ocr, &tuning()).unwrap();
        assert!(text.contains("Social Security"));
        assert!(text.contains("--- Page 1 (OCR) ---"));
    }

    #[test]
    fn test_ocr_marker_detected() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![Token::new("word", 10.0, 100.0, 30.0)],
        }];

        let text = reconstruct(&pages, SourceProfile::Ocr, &tuning()).unwrap();
        assert!(crate::text::is_ocr_text(&text));

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(!crate::text::is_ocr_text(&text));
    }

    #[test]
    fn test_empty_page_skipped() {
        let pages = vec![
            PageTokens {
                number: 1,
                tokens: vec![],
            },
            PageTokens {
                number: 2,
                tokens: vec![Token::new("content", 10.0, 100.0, 50.0)],
            },
        ];

        let text = reconstruct(&pages, SourceProfile::Native, &tuning()).unwrap();
        assert!(!text.contains("--- Page 1 ---"));
        assert!(text.contains("--- Page 2 ---"));
    }

    #[test]
    fn test_no_tokens_is_error() {
        let pages = vec![PageTokens {
            number: 1,
            tokens: vec![],
        }];

        let result = reconstruct(&pages, SourceProfile::Native, &tuning());
        assert!(matches!(result, Err(TextError::NoTokens)));
    }

    #[test]
    fn test_split_merged_words() {
        assert_eq!(split_merged_words("SocialSecurity"), "Social Security");
        assert_eq!(split_merged_words("NPI"), "NPI");
        assert_eq!(split_merged_words("already split"), "already split");
    }
}
