//! Validation rule sets

use crate::GatekeeperError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_identity_field() -> String {
    "name".to_string()
}

fn default_description_field() -> String {
    "description".to_string()
}

fn default_data_field() -> String {
    "data".to_string()
}

fn default_full_count() -> usize {
    3
}

fn default_partial_count() -> usize {
    1
}

fn default_min_points() -> usize {
    3
}

fn default_min_series() -> usize {
    3
}

fn default_max_out_of_window_ratio() -> f64 {
    0.3
}

fn default_score_cap_ratio() -> f64 {
    0.5
}

fn default_capped_score() -> u8 {
    40
}

/// Word window for per-entry descriptions in an entity list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionRule {
    /// Field holding the description
    #[serde(default = "default_description_field")]
    pub field: String,

    /// Fewer words than this is a thin description
    pub min_words: usize,

    /// More words than this is an overlong description
    pub max_words: usize,

    /// Out-of-window fraction above which a failure is recorded
    #[serde(default = "default_max_out_of_window_ratio")]
    pub max_out_of_window_ratio: f64,

    /// Out-of-window fraction above which the section score is capped
    #[serde(default = "default_score_cap_ratio")]
    pub score_cap_ratio: f64,

    /// Section score ceiling once `score_cap_ratio` is exceeded
    #[serde(default = "default_capped_score")]
    pub capped_score: u8,
}

impl DescriptionRule {
    /// A window with default ratios
    pub fn window(min_words: usize, max_words: usize) -> Self {
        Self {
            field: default_description_field(),
            min_words,
            max_words,
            max_out_of_window_ratio: default_max_out_of_window_ratio(),
            score_cap_ratio: default_score_cap_ratio(),
            capped_score: default_capped_score(),
        }
    }
}

/// An array of entity objects (e.g. market players)
///
/// An entry is complete when its identity field is a non-empty string and at
/// least one attribute field holds a number or a string containing a digit.
/// With no attribute fields configured, any field other than the identity and
/// description fields counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityListRule {
    /// Field naming the entity
    #[serde(default = "default_identity_field")]
    pub identity_field: String,

    /// Fields that may carry dated or quantified attributes
    #[serde(default)]
    pub attribute_fields: Vec<String>,

    /// Complete entries needed for full marks
    #[serde(default = "default_full_count")]
    pub full_count: usize,

    /// Complete entries needed for partial marks
    #[serde(default = "default_partial_count")]
    pub partial_count: usize,

    /// Optional description word window
    #[serde(default)]
    pub description: Option<DescriptionRule>,
}

impl Default for EntityListRule {
    fn default() -> Self {
        Self {
            identity_field: default_identity_field(),
            attribute_fields: Vec::new(),
            full_count: default_full_count(),
            partial_count: default_partial_count(),
            description: None,
        }
    }
}

/// An array of data series, each with a numeric data array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSeriesRule {
    /// Field holding the data points inside each series
    #[serde(default = "default_data_field")]
    pub data_field: String,

    /// Numeric points a series needs to count
    #[serde(default = "default_min_points")]
    pub min_points: usize,

    /// Counting series needed for full marks
    #[serde(default = "default_min_series")]
    pub min_series: usize,
}

impl Default for NumericSeriesRule {
    fn default() -> Self {
        Self {
            data_field: default_data_field(),
            min_points: default_min_points(),
            min_series: default_min_series(),
        }
    }
}

/// A prose section with a word window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTextRule {
    /// Minimum words
    pub min_words: usize,

    /// Maximum words
    pub max_words: usize,
}

/// Rule for one declared section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionRule {
    /// Array of entity objects
    EntityList(EntityListRule),

    /// Array of numeric series
    NumericSeries(NumericSeriesRule),

    /// Prose string
    ProfileText(ProfileTextRule),
}

/// Declared sections and their rules, keyed by section name
///
/// The default rule set declares nothing and accepts every value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Section rules (ordered by name for deterministic reports)
    #[serde(default)]
    pub sections: BTreeMap<String, SectionRule>,
}

impl ValidationRules {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a section rule
    pub fn with_section(mut self, name: impl Into<String>, rule: SectionRule) -> Self {
        self.sections.insert(name.into(), rule);
        self
    }

    /// Declared section names, in report order
    pub fn section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    /// Market profile preset: players, market data and an overview
    pub fn market_profile() -> Self {
        Self::new()
            .with_section(
                "players",
                SectionRule::EntityList(EntityListRule {
                    description: Some(DescriptionRule::window(45, 150)),
                    ..EntityListRule::default()
                }),
            )
            .with_section("market_data", SectionRule::NumericSeries(NumericSeriesRule::default()))
            .with_section(
                "overview",
                SectionRule::ProfileText(ProfileTextRule {
                    min_words: 80,
                    max_words: 400,
                }),
            )
    }

    /// Strict preset: more entries, longer descriptions, tighter ratios
    pub fn strict() -> Self {
        Self::new()
            .with_section(
                "players",
                SectionRule::EntityList(EntityListRule {
                    full_count: 5,
                    partial_count: 3,
                    description: Some(DescriptionRule {
                        max_out_of_window_ratio: 0.2,
                        score_cap_ratio: 0.4,
                        capped_score: 30,
                        ..DescriptionRule::window(60, 150)
                    }),
                    ..EntityListRule::default()
                }),
            )
            .with_section(
                "market_data",
                SectionRule::NumericSeries(NumericSeriesRule {
                    min_points: 5,
                    min_series: 4,
                    ..NumericSeriesRule::default()
                }),
            )
            .with_section(
                "overview",
                SectionRule::ProfileText(ProfileTextRule {
                    min_words: 150,
                    max_words: 500,
                }),
            )
    }

    /// Lenient preset: fewer entries, short descriptions accepted
    pub fn lenient() -> Self {
        Self::new()
            .with_section(
                "players",
                SectionRule::EntityList(EntityListRule {
                    full_count: 2,
                    partial_count: 1,
                    description: Some(DescriptionRule {
                        max_out_of_window_ratio: 0.6,
                        score_cap_ratio: 0.8,
                        capped_score: 50,
                        ..DescriptionRule::window(15, 300)
                    }),
                    ..EntityListRule::default()
                }),
            )
            .with_section(
                "market_data",
                SectionRule::NumericSeries(NumericSeriesRule {
                    min_points: 2,
                    min_series: 1,
                    ..NumericSeriesRule::default()
                }),
            )
            .with_section(
                "overview",
                SectionRule::ProfileText(ProfileTextRule {
                    min_words: 30,
                    max_words: 800,
                }),
            )
    }

    /// Check rule consistency
    pub fn validate(&self) -> Result<(), String> {
        for (name, rule) in &self.sections {
            if name.trim().is_empty() {
                return Err("section names must not be empty".to_string());
            }
            match rule {
                SectionRule::EntityList(rule) => {
                    if rule.identity_field.is_empty() {
                        return Err(format!("{}: identity_field must not be empty", name));
                    }
                    if rule.full_count == 0 {
                        return Err(format!("{}: full_count must be greater than 0", name));
                    }
                    if rule.partial_count > rule.full_count {
                        return Err(format!("{}: partial_count cannot exceed full_count", name));
                    }
                    if let Some(desc) = &rule.description {
                        if desc.min_words > desc.max_words {
                            return Err(format!("{}: min_words cannot exceed max_words", name));
                        }
                        for (label, ratio) in [
                            ("max_out_of_window_ratio", desc.max_out_of_window_ratio),
                            ("score_cap_ratio", desc.score_cap_ratio),
                        ] {
                            if !(0.0..=1.0).contains(&ratio) {
                                return Err(format!("{}: {} must be between 0.0 and 1.0", name, label));
                            }
                        }
                        if desc.capped_score > 100 {
                            return Err(format!("{}: capped_score cannot exceed 100", name));
                        }
                    }
                }
                SectionRule::NumericSeries(rule) => {
                    if rule.min_points == 0 {
                        return Err(format!("{}: min_points must be greater than 0", name));
                    }
                    if rule.min_series == 0 {
                        return Err(format!("{}: min_series must be greater than 0", name));
                    }
                }
                SectionRule::ProfileText(rule) => {
                    if rule.min_words > rule.max_words {
                        return Err(format!("{}: min_words cannot exceed max_words", name));
                    }
                }
            }
        }
        Ok(())
    }

    /// Load rules from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, GatekeeperError> {
        toml::from_str(toml_str)
            .map_err(|e| GatekeeperError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize rules to a TOML string
    pub fn to_toml(&self) -> Result<String, GatekeeperError> {
        toml::to_string_pretty(self)
            .map_err(|e| GatekeeperError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(ValidationRules::default().validate().is_ok());
        assert!(ValidationRules::market_profile().validate().is_ok());
        assert!(ValidationRules::strict().validate().is_ok());
        assert!(ValidationRules::lenient().validate().is_ok());
    }

    #[test]
    fn test_default_declares_nothing() {
        assert!(ValidationRules::default().sections.is_empty());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let rules = ValidationRules::new().with_section(
            "overview",
            SectionRule::ProfileText(ProfileTextRule { min_words: 10, max_words: 5 }),
        );
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let rules = ValidationRules::new().with_section(
            "players",
            SectionRule::EntityList(EntityListRule {
                description: Some(DescriptionRule {
                    score_cap_ratio: 1.5,
                    ..DescriptionRule::window(10, 20)
                }),
                ..EntityListRule::default()
            }),
        );
        let err = rules.validate().unwrap_err();
        assert!(err.contains("score_cap_ratio"));
    }

    #[test]
    fn test_partial_above_full_rejected() {
        let rules = ValidationRules::new().with_section(
            "players",
            SectionRule::EntityList(EntityListRule {
                full_count: 2,
                partial_count: 3,
                ..EntityListRule::default()
            }),
        );
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_rules_from_toml_with_defaults() {
        let rules = ValidationRules::from_toml(
            r#"
            [sections.players]
            kind = "entity_list"
            attribute_fields = ["founded", "revenue"]

            [sections.players.description]
            min_words = 45
            max_words = 150

            [sections.market_data]
            kind = "numeric_series"

            [sections.overview]
            kind = "profile_text"
            min_words = 80
            max_words = 400
            "#,
        )
        .unwrap();

        match &rules.sections["players"] {
            SectionRule::EntityList(rule) => {
                assert_eq!(rule.identity_field, "name");
                assert_eq!(rule.full_count, 3);
                let desc = rule.description.as_ref().unwrap();
                assert_eq!(desc.max_out_of_window_ratio, 0.3);
                assert_eq!(desc.score_cap_ratio, 0.5);
            }
            other => panic!("unexpected rule {:?}", other),
        }
        assert!(matches!(rules.sections["market_data"], SectionRule::NumericSeries(_)));
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_rules_toml_round_trip() {
        let rules = ValidationRules::market_profile();
        let toml_str = rules.to_toml().unwrap();
        let parsed = ValidationRules::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_unknown_kind_is_config_error() {
        let result = ValidationRules::from_toml("[sections.x]\nkind = \"mystery\"\n");
        assert!(matches!(result, Err(GatekeeperError::Config(_))));
    }
}
