//! Repeated-block selection for professional liability insurance.
//!
//! Providers carry several policies; the insurance section repeats one
//! sub-block per policy, each opened by its own "Policy Number" label. All
//! fields must come from the single policy with the furthest expiration
//! date. Fields from different policies must never be mixed, so the whole
//! winning block is parsed as one unit.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::dates::parse_date;
use crate::config::PolicyField;

lazy_static! {
    static ref INSURANCE_SECTION: Regex =
        Regex::new(r"(?i)INSURANCE\s+INFORMATION").unwrap();

    static ref NEXT_MAJOR_SECTION: Regex = Regex::new(r"\n\s*[A-Z\s]{15,}\n").unwrap();

    static ref POLICY_NUMBER: Regex =
        Regex::new(r"(?i)Policy\s+Number\s*:?\s*([A-Z0-9\-]+)").unwrap();

    static ref COVERED_LOCATION: Regex =
        Regex::new(r"(?i)Covered\s+Practice\s+Locations?\s*:?\s*([^\n:]+)").unwrap();

    // A field label accidentally captured as a covered-location value.
    static ref LOCATION_LABEL_GUARD: Regex =
        Regex::new(r"(?i)^(?:Original|Current|Carrier|Street|City|State)").unwrap();

    static ref EFFECTIVE_DATE: Regex =
        Regex::new(r"(?i)Current\s+Effective\s+Date\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{4})")
            .unwrap();

    static ref EXPIRATION_DATE: Regex =
        Regex::new(r"(?i)Current\s+Expiration\s+Date\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{4})")
            .unwrap();

    static ref CARRIER_NAME: Regex =
        Regex::new(r"(?i)Carrier/Self\s+Insured\s+Name\s*:?\s*([^\n:]+)").unwrap();

    // Carrier name displaced before its label (reconstruction quirk):
    // the text between the expiration date and the carrier label.
    static ref CARRIER_BEFORE_LABEL: Regex = Regex::new(
        r"(?is)Current\s+Expiration\s+Date\s*:?\s*\d{1,2}[/-]\d{1,2}[/-]\d{4}\s*:?\s*([^\n]+?)\s*Carrier/Self\s+Insured\s+Name",
    )
    .unwrap();

    static ref CARRIER_FALLBACK: Regex = Regex::new(
        r"(?is)Current\s+Expiration\s+Date.*?\d{1,2}[/-]\d{1,2}[/-]\d{4}.*?([A-Za-z][^\n:]{3,100}?)\s+(?:Street\s+1|City\s*:)",
    )
    .unwrap();

    static ref CARRIER_LABEL_REMNANT: Regex =
        Regex::new(r"(?i)Carrier/Self\s+Insured\s+Name\s*:?\s*").unwrap();

    static ref STREET_1: Regex = Regex::new(r"(?i)Street\s+1\s*:?\s*([^\n:]+)").unwrap();

    static ref STREET_2: Regex =
        Regex::new(r"(?i)Street\s+2\s*:?\s*([^\n:]+?)\s*(?:\n|City|$)").unwrap();

    static ref CITY: Regex =
        Regex::new(r"(?i)City\s*:?\s*([A-Za-z\s\-']+?)\s*(?:Province|State|\n|$)").unwrap();

    static ref STATE: Regex = Regex::new(r"(?i)State\s*:?\s*([A-Za-z]{2})\b").unwrap();

    static ref COUNTRY: Regex =
        Regex::new(r"(?i)Country\s*:?\s*([A-Za-z\s]+?)\s*(?:\n|Zip|$)").unwrap();

    static ref ZIP: Regex =
        Regex::new(r"(?i)Zip\s+Code\s*:?\s*(\d{5}(?:-\d{4})?)").unwrap();
}

/// All fields of one insurance policy sub-block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyBlock {
    pub policy_number: Option<String>,
    pub covered_location: Option<String>,
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
    pub carrier_name: Option<String>,
    pub street_1: Option<String>,
    pub street_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

impl PolicyBlock {
    /// Read one field of the block.
    pub fn get(&self, field: PolicyField) -> Option<&str> {
        match field {
            PolicyField::PolicyNumber => self.policy_number.as_deref(),
            PolicyField::CoveredLocation => self.covered_location.as_deref(),
            PolicyField::EffectiveDate => self.effective_date.as_deref(),
            PolicyField::ExpirationDate => self.expiration_date.as_deref(),
            PolicyField::CarrierName => self.carrier_name.as_deref(),
            PolicyField::Street1 => self.street_1.as_deref(),
            PolicyField::Street2 => self.street_2.as_deref(),
            PolicyField::City => self.city.as_deref(),
            PolicyField::State => self.state.as_deref(),
            PolicyField::Country => self.country.as_deref(),
            PolicyField::Zip => self.zip.as_deref(),
        }
    }
}

/// The winning policy block with selection metadata.
#[derive(Debug, Clone)]
pub struct SelectedPolicy {
    /// Fields of the winning block.
    pub block: PolicyBlock,
    /// Parsed expiration date of the winning block, if any.
    pub expiration: Option<NaiveDate>,
    /// How many policy blocks the section contained.
    pub policy_count: usize,
}

/// Parse every policy block in the insurance section and select the one
/// with the furthest expiration date (first block when no date parses).
pub fn select_policy(text: &str, date_formats: &[String]) -> Option<SelectedPolicy> {
    let section_match = INSURANCE_SECTION.find(text)?;
    let section_start = section_match.end();
    let section_end = match NEXT_MAJOR_SECTION.find(&text[section_start..]) {
        Some(next) => section_start + next.start(),
        None => text.len(),
    };
    let section = &text[section_start..section_end];

    let starts: Vec<usize> = POLICY_NUMBER.find_iter(section).map(|m| m.start()).collect();
    if starts.is_empty() {
        return None;
    }

    let mut policies: Vec<(PolicyBlock, Option<NaiveDate>)> = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(section.len());
        let block = parse_policy(&section[start..end]);
        let expiration = block
            .expiration_date
            .as_deref()
            .and_then(|d| parse_date(d, date_formats));
        policies.push((block, expiration));
    }

    let policy_count = policies.len();
    debug!("insurance section contains {policy_count} policy block(s)");

    // Furthest expiration wins; blocks without a parseable date lose to any
    // dated block.
    let selected = policies
        .iter()
        .enumerate()
        .filter(|(_, (_, exp))| exp.is_some())
        .max_by_key(|(_, (_, exp))| *exp)
        .map(|(i, _)| i)
        .unwrap_or(0);

    let (block, expiration) = policies.swap_remove(selected);
    Some(SelectedPolicy {
        block,
        expiration,
        policy_count,
    })
}

/// Extract all fields from one policy sub-block.
fn parse_policy(policy_text: &str) -> PolicyBlock {
    let mut block = PolicyBlock {
        policy_number: capture(&POLICY_NUMBER, policy_text),
        effective_date: capture(&EFFECTIVE_DATE, policy_text),
        expiration_date: capture(&EXPIRATION_DATE, policy_text),
        street_1: capture(&STREET_1, policy_text),
        zip: capture(&ZIP, policy_text),
        ..Default::default()
    };

    // Covered location is often empty; an adjacent field label must not be
    // mistaken for a value.
    block.covered_location = capture(&COVERED_LOCATION, policy_text)
        .filter(|loc| !LOCATION_LABEL_GUARD.is_match(loc))
        .filter(|loc| loc.len() > 2);

    block.carrier_name = extract_carrier_name(policy_text);

    block.street_2 = capture(&STREET_2, policy_text).filter(|s| s.len() > 1);
    block.city = capture(&CITY, policy_text);
    block.state = capture(&STATE, policy_text).map(|s| s.to_uppercase());
    block.country = capture(&COUNTRY, policy_text).filter(|c| c.len() > 2);

    block
}

/// Carrier name, accounting for the value landing before its label.
fn extract_carrier_name(policy_text: &str) -> Option<String> {
    if let Some(after) = capture(&CARRIER_NAME, policy_text) {
        // A stub like "Inc." means the name proper was displaced before
        // the label; stitch the halves together.
        let name = if after.len() < 10 {
            match capture(&CARRIER_BEFORE_LABEL, policy_text) {
                Some(before) => format!("{before} {after}"),
                None => after,
            }
        } else {
            after
        };
        let name = name.trim().to_string();
        return (name.len() > 2).then_some(name);
    }

    capture(&CARRIER_FALLBACK, policy_text)
        .map(|name| CARRIER_LABEL_REMNANT.replace_all(&name, "").trim().to_string())
        .filter(|name| name.len() > 2)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
