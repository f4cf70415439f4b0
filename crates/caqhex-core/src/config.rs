//! Field extraction configuration.
//!
//! The configuration table is loaded once at startup and treated as
//! read-only for the lifetime of the process. One entry per extractable
//! field, keyed by field name, plus the tuning constants shared by every
//! extraction pass. The constants are empirically calibrated against the
//! CAQH ProView export template; treat them as a starting point when
//! retargeting another template revision.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which extraction strategy handles a field.
///
/// Resolved to a concrete strategy object at configuration-load time, not
/// at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Generic bidirectional label-proximity search.
    #[default]
    LabelProximity,
    /// Multi-line organization name assembly and normalization.
    OrgName,
    /// Future-date selection over all date candidates.
    FutureDate,
    /// Label-proximity with sibling-label context filtering.
    SiblingFilter,
    /// One field of the selected repeated policy block.
    PolicyBlock { field: PolicyField },
}

/// Fields of a single insurance policy block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyField {
    PolicyNumber,
    CoveredLocation,
    EffectiveDate,
    ExpirationDate,
    CarrierName,
    Street1,
    Street2,
    City,
    State,
    Country,
    Zip,
}

/// Configuration for extracting a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Labels to search for, tried in priority order.
    pub labels: Vec<String>,

    /// Regex pattern the value must match (if any).
    pub pattern: Option<String>,

    /// Maximum characters examined on each side of a matched label.
    pub max_distance: usize,

    /// Restrict the search to a named document section.
    pub section: Option<String>,

    /// Disable the line-based heuristic fallback when the pattern does not
    /// match.
    pub pattern_required: bool,

    /// Accepted date formats (chrono strftime syntax) for date fields.
    pub date_formats: Vec<String>,

    /// Regex patterns identifying a lookalike sibling field near a
    /// candidate (used by the sibling filter).
    pub sibling_labels: Vec<String>,

    /// Strategy handling this field.
    pub strategy: StrategyKind,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            pattern: None,
            max_distance: 50,
            section: None,
            pattern_required: false,
            date_formats: Vec::new(),
            sibling_labels: Vec::new(),
            strategy: StrategyKind::LabelProximity,
        }
    }
}

/// Empirically tuned constants for reconstruction and scoring.
///
/// Values mirror the calibration against the CAQH ProView template; none of
/// them has a principled derivation, so they are kept configurable rather
/// than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Vertical row tolerance for native PDF token streams (pixels).
    pub native_row_tolerance: f32,
    /// Vertical row tolerance for OCR token streams (noisier coordinates).
    pub ocr_row_tolerance: f32,
    /// Horizontal gap that produces a single space.
    pub word_gap: f32,
    /// Horizontal gap treated as a column break (native).
    pub native_column_gap: f32,
    /// Horizontal gap treated as a column break (OCR).
    pub ocr_column_gap: f32,

    /// Base confidence for a pattern match after the label.
    pub after_base_confidence: f32,
    /// Distance penalty slope for after-label matches.
    pub after_distance_penalty: f32,
    /// Base confidence for a pattern match before the label.
    pub before_base_confidence: f32,
    /// Distance penalty slope for before-label matches.
    pub before_distance_penalty: f32,
    /// Base confidence for the line heuristic after the label.
    pub line_after_base: f32,
    /// Base confidence for the line heuristic before the label.
    pub line_before_base: f32,
    /// Per-line confidence decay for the line heuristic.
    pub line_decay: f32,
    /// Confidence assigned when a label is found but yields no value.
    pub empty_value_confidence: f32,
    /// Flat bonus when the value pattern confirmed the candidate.
    pub pattern_bonus: f32,
    /// Characters of surrounding text attached as context.
    pub context_chars: usize,

    /// Confidence boost for future dates.
    pub future_date_boost: f32,
    /// Confidence multiplier for past dates.
    pub past_date_penalty: f32,
    /// Confidence multiplier for unparseable date candidates.
    pub unparsed_date_penalty: f32,

    /// Context window for sibling-label disambiguation.
    pub sibling_context_window: usize,

    /// Confidence assigned to fields read from the selected policy block.
    pub policy_field_confidence: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            native_row_tolerance: 5.0,
            ocr_row_tolerance: 8.0,
            word_gap: 3.0,
            native_column_gap: 20.0,
            ocr_column_gap: 40.0,
            after_base_confidence: 0.90,
            after_distance_penalty: 0.20,
            before_base_confidence: 0.85,
            before_distance_penalty: 0.25,
            line_after_base: 0.75,
            line_before_base: 0.70,
            line_decay: 0.15,
            empty_value_confidence: 0.3,
            pattern_bonus: 0.05,
            context_chars: 100,
            future_date_boost: 0.10,
            past_date_penalty: 0.70,
            unparsed_date_penalty: 0.90,
            sibling_context_window: 50,
            policy_field_confidence: 0.85,
        }
    }
}

/// Parameters for the organization-name normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgNameParams {
    /// Leading words of the expected organization name.
    pub prefix: String,
    /// Keyword between the prefix and the region qualifier.
    pub keyword: String,
    /// Minimum confidence at which a standalone-extractor hit is accepted
    /// without running label search.
    pub min_confidence: f32,
}

impl Default for OrgNameParams {
    fn default() -> Self {
        Self {
            prefix: "Positive Behavior Supports".to_string(),
            keyword: "Corporation".to_string(),
            min_confidence: 0.80,
        }
    }
}

/// Complete extraction configuration: per-field table plus shared tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Field configurations, keyed by field name.
    pub fields: HashMap<String, FieldConfig>,

    /// Shared tuning constants.
    pub tuning: Tuning,

    /// Organization-name normalizer parameters.
    pub org_name: OrgNameParams,
}

/// The five tier-1 fields extracted by default.
pub const DEFAULT_FIELDS: [&str; 5] = [
    "medicaid_id",
    "ssn",
    "individual_npi",
    "practice_location_name",
    "professional_license_expiration_date",
];

const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d", "%m/%d/%y"];

impl ExtractionConfig {
    /// Build the hand-tuned table for the CAQH ProView Data Summary export.
    pub fn caqh_default() -> Self {
        let mut fields = HashMap::new();

        fields.insert(
            "medicaid_id".to_string(),
            FieldConfig {
                labels: vec![
                    "Medicaid ID".to_string(),
                    "Medicaid Number".to_string(),
                    "Medicaid #".to_string(),
                ],
                pattern: Some(r"\d{6,12}".to_string()),
                max_distance: 60,
                pattern_required: true,
                sibling_labels: vec![
                    r"\bNPI\s*:".to_string(),
                    r"\bNPI\s+Number".to_string(),
                    r"\(Type\s+\d+\)\s*NPI".to_string(),
                    r"\bGroup\s+NPI".to_string(),
                    r"\bIndividual\s+NPI".to_string(),
                    r"National\s+Provider\s+Identifier".to_string(),
                ],
                strategy: StrategyKind::SiblingFilter,
                ..Default::default()
            },
        );

        fields.insert(
            "ssn".to_string(),
            FieldConfig {
                labels: vec![
                    "Social Security Number".to_string(),
                    "SSN".to_string(),
                ],
                pattern: Some(r"\d{3}-?\d{2}-?\d{4}".to_string()),
                pattern_required: true,
                ..Default::default()
            },
        );

        fields.insert(
            "individual_npi".to_string(),
            FieldConfig {
                labels: vec!["Individual NPI".to_string(), "NPI".to_string()],
                pattern: Some(r"\b\d{10}\b".to_string()),
                pattern_required: true,
                ..Default::default()
            },
        );

        fields.insert(
            "practice_location_name".to_string(),
            FieldConfig {
                labels: vec![
                    "Practice Name".to_string(),
                    "Practice Location Name".to_string(),
                    "Organization Name".to_string(),
                    "Name".to_string(),
                ],
                pattern: Some(
                    r"Positive\s+Behavior\s+Supports\s+Corporation\s*-\s*[A-Za-z][A-Za-z ]+"
                        .to_string(),
                ),
                max_distance: 150,
                section: Some("practice_locations".to_string()),
                strategy: StrategyKind::OrgName,
                ..Default::default()
            },
        );

        fields.insert(
            "professional_license_expiration_date".to_string(),
            FieldConfig {
                labels: vec![
                    "Expiration Date".to_string(),
                    "Expiration".to_string(),
                    "Expires".to_string(),
                ],
                pattern: Some(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}".to_string()),
                max_distance: 80,
                section: Some("professional_license".to_string()),
                date_formats: DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
                strategy: StrategyKind::FutureDate,
                ..Default::default()
            },
        );

        for (name, field) in [
            ("insurance_policy_number", PolicyField::PolicyNumber),
            ("insurance_covered_location", PolicyField::CoveredLocation),
            ("insurance_current_effective_date", PolicyField::EffectiveDate),
            ("insurance_current_expiration_date", PolicyField::ExpirationDate),
            ("insurance_carrier_name", PolicyField::CarrierName),
            ("insurance_address_street_1", PolicyField::Street1),
            ("insurance_address_street_2", PolicyField::Street2),
            ("insurance_address_city", PolicyField::City),
            ("insurance_address_state", PolicyField::State),
            ("insurance_address_country", PolicyField::Country),
            ("insurance_address_zip", PolicyField::Zip),
        ] {
            fields.insert(
                name.to_string(),
                FieldConfig {
                    section: Some("insurance_information".to_string()),
                    date_formats: DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
                    strategy: StrategyKind::PolicyBlock { field },
                    ..Default::default()
                },
            );
        }

        Self {
            fields,
            tuning: Tuning::default(),
            org_name: OrgNameParams::default(),
        }
    }

    /// Look up the configuration for a field.
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tuning_defaults_match_calibration() {
        let tuning = Tuning::default();
        assert_eq!(tuning.native_row_tolerance, 5.0);
        assert_eq!(tuning.ocr_row_tolerance, 8.0);
        assert_eq!(tuning.after_base_confidence, 0.90);
        assert_eq!(tuning.before_base_confidence, 0.85);
        assert_eq!(tuning.after_distance_penalty, 0.20);
        assert_eq!(tuning.before_distance_penalty, 0.25);
        assert_eq!(tuning.empty_value_confidence, 0.3);
        assert_eq!(tuning.pattern_bonus, 0.05);
    }

    #[test]
    fn test_caqh_default_has_all_tier1_fields() {
        let config = ExtractionConfig::caqh_default();
        for name in DEFAULT_FIELDS {
            assert!(config.field(name).is_some(), "missing field config: {name}");
        }
    }

    #[test]
    fn test_caqh_default_insurance_fields_use_policy_block() {
        let config = ExtractionConfig::caqh_default();
        let field = config.field("insurance_carrier_name").unwrap();
        assert_eq!(
            field.strategy,
            StrategyKind::PolicyBlock {
                field: PolicyField::CarrierName
            }
        );
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = ExtractionConfig::caqh_default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.fields.len(), config.fields.len());
        assert_eq!(
            parsed.field("medicaid_id").unwrap().pattern,
            config.field("medicaid_id").unwrap().pattern
        );
    }

    #[test]
    fn test_field_config_default_distance() {
        let field = FieldConfig::default();
        assert_eq!(field.max_distance, 50);
        assert!(!field.pattern_required);
    }
}
