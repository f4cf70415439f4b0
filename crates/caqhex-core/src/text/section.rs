//! Best-effort location of named document sections.
//!
//! CAQH exports repeat similar field labels across sections ("Phone" shows
//! up in both practice-location and insurance blocks). Restricting label
//! search to the requested section is the primary defense against
//! cross-section contamination. Location is best-effort: a section that
//! cannot be found yields the whole document, never an error.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A line that looks like the next major section header: an optional
    /// numbered SECTION prefix or a standalone run of uppercase words.
    static ref NEXT_SECTION_HEADER: Regex =
        Regex::new(r"\n\s*(?:SECTION\s+\d+|[A-Z][A-Z\s]{10,})\s*\n").unwrap();
}

/// A located sub-range of document text.
#[derive(Debug, Clone, Copy)]
pub struct SectionSlice<'a> {
    /// The section body (or the full text when not located).
    pub text: &'a str,
    /// Byte offset of the slice within the full text.
    pub offset: usize,
    /// Whether the section header was actually found.
    pub located: bool,
}

/// Find the sub-range of `text` belonging to the named section.
///
/// The section starts immediately after its header and ends at the next
/// major header, or at document end. Returns the full text unchanged when
/// the header cannot be found.
pub fn locate_section<'a>(text: &'a str, name: &str) -> SectionSlice<'a> {
    let whole = SectionSlice {
        text,
        offset: 0,
        located: false,
    };

    let words: Vec<&str> = name
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return whole;
    }

    for variant in header_variants(&words) {
        let pattern = format!(r"(?i)(?:SECTION\s+\d+\s*:?\s*)?{variant}");
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };

        if let Some(header) = re.find(text) {
            let start = header.end();
            let end = match NEXT_SECTION_HEADER.find(&text[start..]) {
                Some(next) => start + next.start(),
                None => text.len(),
            };
            return SectionSlice {
                text: &text[start..end],
                offset: start,
                located: true,
            };
        }
    }

    whole
}

/// Variant header spellings: all-caps with flexible whitespace, title case,
/// and the raw words with flexible whitespace.
fn header_variants(words: &[&str]) -> Vec<String> {
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    let upper: Vec<String> = words.iter().map(|w| regex::escape(&w.to_uppercase())).collect();
    let title: Vec<String> = words.iter().map(|w| regex::escape(&title_case(w))).collect();

    vec![
        upper.join(r"\s+"),
        title.join(" "),
        escaped.join(r"\s+"),
    ]
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "\
--- Page 1 ---
PERSONAL INFORMATION
Name: Jane Doe
Phone: 111-222-3333

PRACTICE LOCATIONS
Practice Name: Example Clinic
Phone: 555-666-7777

PROFESSIONAL LIABILITY INSURANCE
Policy Number: ABC-123
Phone: 999-888-7777
";

    #[test]
    fn test_locates_section_body() {
        let slice = locate_section(DOC, "practice_locations");
        assert!(slice.located);
        assert!(slice.text.contains("Example Clinic"));
        assert!(slice.text.contains("555-666-7777"));
    }

    #[test]
    fn test_section_stops_at_next_header() {
        let slice = locate_section(DOC, "practice_locations");
        assert!(!slice.text.contains("Policy Number"));
        assert!(!slice.text.contains("999-888-7777"));
    }

    #[test]
    fn test_missing_section_returns_full_text() {
        let slice = locate_section(DOC, "education");
        assert!(!slice.located);
        assert_eq!(slice.offset, 0);
        assert_eq!(slice.text, DOC);
    }

    #[test]
    fn test_offset_maps_into_full_text() {
        let slice = locate_section(DOC, "practice_locations");
        assert_eq!(&DOC[slice.offset..slice.offset + slice.text.len()], slice.text);
    }

    #[test]
    fn test_numbered_section_prefix() {
        let doc = "intro\nSECTION 3: PRACTICE LOCATIONS\nPractice Name: Clinic\n";
        let slice = locate_section(doc, "practice_locations");
        assert!(slice.located);
        assert!(slice.text.contains("Clinic"));
    }

    #[test]
    fn test_title_case_header() {
        let doc = "intro\nPractice Locations\nPractice Name: Clinic\n";
        let slice = locate_section(doc, "practice_locations");
        assert!(slice.located);
        assert!(slice.text.contains("Clinic"));
    }

    #[test]
    fn test_last_section_runs_to_document_end() {
        let slice = locate_section(DOC, "professional_liability_insurance");
        assert!(slice.located);
        assert!(slice.text.contains("999-888-7777"));
    }
}
