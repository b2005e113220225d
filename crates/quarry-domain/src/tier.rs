//! Tier module - escalation steps against the generation service

use serde::{Deserialize, Serialize};

/// Service capability/cost level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Cheaper, faster model
    Economy,

    /// Stronger, more expensive model
    Premium,
}

/// Response-shape strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMode {
    /// The service is asked to return structured data directly
    Strict,

    /// Free text with an in-prompt "structured data only" instruction and a
    /// larger output allowance
    FreeForm,
}

/// One escalation tier: capability × response mode
///
/// Tiers are attempted cheapest first:
/// - EconomyStrict: cheap model, strict structured mode
/// - EconomyFreeForm: cheap model, free-form with more output budget
/// - PremiumStrict: strong model, strict structured mode
/// - PremiumFreeForm: strong model, free-form with more output budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Cheap model, strict structured mode
    EconomyStrict,

    /// Cheap model, free-form mode
    EconomyFreeForm,

    /// Strong model, strict structured mode
    PremiumStrict,

    /// Strong model, free-form mode
    PremiumFreeForm,
}

impl Tier {
    /// Default escalation order
    pub const ESCALATION: [Tier; 4] = [
        Tier::EconomyStrict,
        Tier::EconomyFreeForm,
        Tier::PremiumStrict,
        Tier::PremiumFreeForm,
    ];

    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::EconomyStrict => "economy-strict",
            Tier::EconomyFreeForm => "economy-free-form",
            Tier::PremiumStrict => "premium-strict",
            Tier::PremiumFreeForm => "premium-free-form",
        }
    }

    /// Parse a tier from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "economy-strict" => Some(Tier::EconomyStrict),
            "economy-free-form" => Some(Tier::EconomyFreeForm),
            "premium-strict" => Some(Tier::PremiumStrict),
            "premium-free-form" => Some(Tier::PremiumFreeForm),
            _ => None,
        }
    }

    /// Get the next tier in the default escalation (None at the top)
    pub fn next(&self) -> Option<Self> {
        match self {
            Tier::EconomyStrict => Some(Tier::EconomyFreeForm),
            Tier::EconomyFreeForm => Some(Tier::PremiumStrict),
            Tier::PremiumStrict => Some(Tier::PremiumFreeForm),
            Tier::PremiumFreeForm => None,
        }
    }

    /// Capability level of this tier
    pub fn capability(&self) -> Capability {
        match self {
            Tier::EconomyStrict | Tier::EconomyFreeForm => Capability::Economy,
            Tier::PremiumStrict | Tier::PremiumFreeForm => Capability::Premium,
        }
    }

    /// Response mode of this tier
    pub fn mode(&self) -> ResponseMode {
        match self {
            Tier::EconomyStrict | Tier::PremiumStrict => ResponseMode::Strict,
            Tier::EconomyFreeForm | Tier::PremiumFreeForm => ResponseMode::FreeForm,
        }
    }

    /// Whether the service should be asked for structured output directly
    pub fn is_strict(&self) -> bool {
        self.mode() == ResponseMode::Strict
    }

    /// Multiplier applied to the base output budget
    ///
    /// Free-form tiers get twice the allowance; they exist mostly to recover
    /// from strict-mode responses that were cut off.
    pub fn output_multiplier(&self) -> u32 {
        match self.mode() {
            ResponseMode::Strict => 1,
            ResponseMode::FreeForm => 2,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_escalation() {
        assert_eq!(Tier::EconomyStrict.next(), Some(Tier::EconomyFreeForm));
        assert_eq!(Tier::EconomyFreeForm.next(), Some(Tier::PremiumStrict));
        assert_eq!(Tier::PremiumStrict.next(), Some(Tier::PremiumFreeForm));
        assert_eq!(Tier::PremiumFreeForm.next(), None);
    }

    #[test]
    fn test_tier_parse_round_trip() {
        for tier in Tier::ESCALATION {
            assert_eq!(tier.as_str().parse::<Tier>(), Ok(tier));
        }
        assert!("gold".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_axes() {
        assert!(Tier::PremiumStrict.is_strict());
        assert_eq!(Tier::PremiumStrict.capability(), Capability::Premium);
        assert_eq!(Tier::EconomyFreeForm.output_multiplier(), 2);
    }
}
