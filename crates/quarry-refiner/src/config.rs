//! Configuration for the refinement loop

use crate::RefineError;
use quarry_gatekeeper::ValidationRules;
use quarry_llm::RetryPolicy;
use quarry_synthesizer::SynthesizerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the refinement loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Maximum gap-filling iterations after the initial synthesis
    pub max_iterations: u32,

    /// Effective confidence (0-100) at which the result is ready
    pub confidence_threshold: u8,

    /// Gaps fetched per iteration (highest priority first)
    pub max_gaps_per_iteration: usize,

    /// Evidence fetches in flight at once
    pub fetch_concurrency: usize,

    /// Delay between successive fetch starts (milliseconds)
    pub inter_fetch_delay_ms: u64,

    /// Sections a resynthesis should change before a warning is logged
    pub min_changed_sections: usize,

    /// Whole-run timeout (seconds); None disables it
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    /// Output units for the self-assessment call
    pub assessment_output_units: u32,

    /// Declared top-level sections of the result document
    ///
    /// Empty means the section names of `validation`.
    #[serde(default)]
    pub required_sections: Vec<String>,

    /// Tier escalation settings
    #[serde(default)]
    pub synthesis: SynthesizerConfig,

    /// Retry policy for self-assessment calls and evidence fetches
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Content-depth rules
    #[serde(default)]
    pub validation: ValidationRules,
}

impl Default for RefinementConfig {
    /// Market-profile rules, three iterations, threshold 70
    fn default() -> Self {
        Self {
            max_iterations: 3,
            confidence_threshold: 70,
            max_gaps_per_iteration: 5,
            fetch_concurrency: 3,
            inter_fetch_delay_ms: 250,
            min_changed_sections: 1,
            run_timeout_secs: Some(900),
            assessment_output_units: 1_500,
            required_sections: Vec::new(),
            synthesis: SynthesizerConfig::default(),
            retry: RetryPolicy::default(),
            validation: ValidationRules::market_profile(),
        }
    }
}

impl RefinementConfig {
    /// Aggressive preset: one iteration, economy tiers, short run timeout
    pub fn aggressive() -> Self {
        Self {
            max_iterations: 1,
            confidence_threshold: 60,
            max_gaps_per_iteration: 3,
            fetch_concurrency: 3,
            inter_fetch_delay_ms: 100,
            min_changed_sections: 1,
            run_timeout_secs: Some(300),
            assessment_output_units: 1_000,
            required_sections: Vec::new(),
            synthesis: SynthesizerConfig::aggressive(),
            retry: RetryPolicy::default().with_max_attempts(2),
            validation: ValidationRules::lenient(),
        }
    }

    /// Lenient preset: more iterations and time, strict content rules
    pub fn lenient() -> Self {
        Self {
            max_iterations: 5,
            confidence_threshold: 80,
            max_gaps_per_iteration: 8,
            fetch_concurrency: 4,
            inter_fetch_delay_ms: 500,
            min_changed_sections: 1,
            run_timeout_secs: Some(1_800),
            assessment_output_units: 2_000,
            required_sections: Vec::new(),
            synthesis: SynthesizerConfig::lenient(),
            retry: RetryPolicy::default(),
            validation: ValidationRules::strict(),
        }
    }

    /// Declared sections, falling back to the validated section names
    pub fn schema(&self) -> Vec<String> {
        if self.required_sections.is_empty() {
            self.validation.section_names()
        } else {
            self.required_sections.clone()
        }
    }

    /// Delay between fetch starts as a Duration
    pub fn inter_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_fetch_delay_ms)
    }

    /// Run timeout as a Duration
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration, including nested sections
    pub fn validate(&self) -> Result<(), String> {
        if self.confidence_threshold > 100 {
            return Err("confidence_threshold cannot exceed 100".to_string());
        }
        if self.max_gaps_per_iteration == 0 {
            return Err("max_gaps_per_iteration must be greater than 0".to_string());
        }
        if self.fetch_concurrency == 0 {
            return Err("fetch_concurrency must be greater than 0".to_string());
        }
        if self.run_timeout_secs == Some(0) {
            return Err("run_timeout_secs must be greater than 0 when set".to_string());
        }
        if self.assessment_output_units == 0 {
            return Err("assessment_output_units must be greater than 0".to_string());
        }
        self.synthesis
            .validate()
            .map_err(|e| format!("synthesis: {}", e))?;
        self.retry.validate().map_err(|e| format!("retry: {}", e))?;
        self.validation
            .validate()
            .map_err(|e| format!("validation: {}", e))?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, RefineError> {
        toml::from_str(toml_str)
            .map_err(|e| RefineError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, RefineError> {
        toml::to_string_pretty(self)
            .map_err(|e| RefineError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
