//! Budget accounting for synthesis calls
//!
//! The budget is a plain value: each tier invocation takes it by value and
//! hands back an updated copy. Concurrent units of work each hold their own.

use crate::Tier;

/// Calls made and output units requested against the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisBudget {
    /// Output units requested by a strict-mode tier
    pub base_output_units: u32,

    /// Upper bound on calls (None = unbounded)
    pub max_calls: Option<u32>,

    /// Calls made so far
    pub calls_made: u32,

    /// Sum of output units requested so far
    pub output_units_requested: u64,
}

impl SynthesisBudget {
    /// Create a fresh budget
    pub fn new(base_output_units: u32) -> Self {
        Self {
            base_output_units,
            max_calls: None,
            calls_made: 0,
            output_units_requested: 0,
        }
    }

    /// Bound the number of calls
    pub fn with_max_calls(mut self, max_calls: u32) -> Self {
        self.max_calls = Some(max_calls);
        self
    }

    /// Output units a call at `tier` should request
    pub fn units_for(&self, tier: Tier) -> u32 {
        self.base_output_units.saturating_mul(tier.output_multiplier())
    }

    /// Record one call requesting `units`
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::SynthesisBudget;
    ///
    /// let budget = SynthesisBudget::new(1000);
    /// let after = budget.charge(2000);
    /// assert_eq!(budget.calls_made, 0);
    /// assert_eq!(after.calls_made, 1);
    /// assert_eq!(after.output_units_requested, 2000);
    /// ```
    #[must_use]
    pub fn charge(self, units: u32) -> Self {
        Self {
            calls_made: self.calls_made.saturating_add(1),
            output_units_requested: self.output_units_requested.saturating_add(units as u64),
            ..self
        }
    }

    /// Whether no further calls are allowed
    pub fn is_exhausted(&self) -> bool {
        self.max_calls.is_some_and(|max| self.calls_made >= max)
    }

    /// Calls left before exhaustion (None = unbounded)
    pub fn remaining_calls(&self) -> Option<u32> {
        self.max_calls.map(|max| max.saturating_sub(self.calls_made))
    }
}
