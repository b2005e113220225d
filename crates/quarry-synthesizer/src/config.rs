//! Configuration for the tiered synthesizer

use crate::SynthesisError;
use quarry_domain::{SynthesisBudget, Tier};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_tiers() -> Vec<Tier> {
    Tier::ESCALATION.to_vec()
}

/// Configuration for the tiered synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Escalation order
    #[serde(default = "default_tiers")]
    pub tiers: Vec<Tier>,

    /// Timeout raced against each tier call (seconds)
    pub call_timeout_secs: u64,

    /// Output units requested by strict tiers; free-form tiers request more
    pub base_output_units: u32,

    /// Hard cap on service calls per budget (None = unbounded)
    #[serde(default)]
    pub max_calls: Option<u32>,
}

impl Default for SynthesizerConfig {
    /// Full four-tier escalation
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            call_timeout_secs: 120,
            base_output_units: 4_000,
            max_calls: None,
        }
    }
}

impl SynthesizerConfig {
    /// Aggressive preset: economy tiers only, short timeouts
    pub fn aggressive() -> Self {
        Self {
            tiers: vec![Tier::EconomyStrict, Tier::EconomyFreeForm],
            call_timeout_secs: 45,
            base_output_units: 2_000,
            max_calls: Some(8),
        }
    }

    /// Lenient preset: full escalation, long timeouts, large outputs
    pub fn lenient() -> Self {
        Self {
            tiers: default_tiers(),
            call_timeout_secs: 300,
            base_output_units: 8_000,
            max_calls: None,
        }
    }

    /// Per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// A fresh budget for one run
    pub fn budget(&self) -> SynthesisBudget {
        let budget = SynthesisBudget::new(self.base_output_units);
        match self.max_calls {
            Some(max) => budget.with_max_calls(max),
            None => budget,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.tiers.is_empty() {
            return Err("tiers must not be empty".to_string());
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if self.tiers[..i].contains(tier) {
                return Err(format!("tier {} listed more than once", tier));
            }
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        if self.base_output_units == 0 {
            return Err("base_output_units must be greater than 0".to_string());
        }
        if self.max_calls == Some(0) {
            return Err("max_calls must be greater than 0 when set".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, SynthesisError> {
        toml::from_str(toml_str)
            .map_err(|e| SynthesisError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, SynthesisError> {
        toml::to_string_pretty(self)
            .map_err(|e| SynthesisError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}
