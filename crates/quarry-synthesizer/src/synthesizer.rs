//! Tier escalation against the generation service

use crate::prompt::prompt_for_tier;
use crate::{SynthesisError, SynthesizerConfig};
use quarry_domain::{
    GenerateOptions, GenerationService, RawResponse, SectionDocument, ServiceError,
    SynthesisBudget, SynthesisResult, Tier,
};
use quarry_extractor::{extract_with_repair, ExtractionStatus};
use quarry_llm::call_with_timeout;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How one tier attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// A structured value was recovered
    Success,

    /// The service answered but nothing could be extracted
    ExtractionFailed(ExtractionStatus),

    /// Transient service error or timeout
    ServiceFailed(ServiceError),

    /// Not attempted because the call budget ran out
    BudgetExhausted,
}

/// Log entry for one tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierAttempt {
    /// Tier attempted
    pub tier: Tier,

    /// Outcome
    pub outcome: AttemptOutcome,

    /// Whether the repair pass ran
    pub repaired: bool,

    /// Output units requested (0 when skipped)
    pub output_units: u32,

    /// Raw service response, when one arrived
    pub response: Option<RawResponse>,
}

impl TierAttempt {
    fn skipped(tier: Tier) -> Self {
        Self {
            tier,
            outcome: AttemptOutcome::BudgetExhausted,
            repaired: false,
            output_units: 0,
            response: None,
        }
    }
}

/// Result of one escalation run
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    /// First successful result, or None when every tier failed
    pub result: Option<SynthesisResult>,

    /// Per-tier attempt log, in order
    pub attempts: Vec<TierAttempt>,

    /// Budget after all calls made here
    pub budget: SynthesisBudget,
}

impl SynthesisOutcome {
    /// Number of service calls actually made
    pub fn calls_made(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::BudgetExhausted)
            .count()
    }
}

/// Escalates a prompt across tiers until one yields structured data
pub struct TieredSynthesizer<G>
where
    G: GenerationService,
{
    service: Arc<G>,
    config: SynthesizerConfig,
}

impl<G> TieredSynthesizer<G>
where
    G: GenerationService,
{
    /// Create a synthesizer, rejecting invalid configuration
    pub fn new(service: Arc<G>, config: SynthesizerConfig) -> Result<Self, SynthesisError> {
        config.validate().map_err(SynthesisError::Config)?;
        Ok(Self { service, config })
    }

    /// The generation service
    pub fn service(&self) -> &Arc<G> {
        &self.service
    }

    /// The configuration in use
    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Run the prompt through the configured tiers
    ///
    /// Returns on the first tier whose response yields an object or array.
    /// Arrays are wrapped under `section_N` keys and flagged `was_array`.
    /// `schema` names the declared sections of the resulting document.
    ///
    /// # Errors
    ///
    /// - `SynthesisError::Fatal` when the service rejects a call as fatal
    /// - `SynthesisError::Cancelled` when the token fires before or during a call
    pub async fn synthesize(
        &self,
        prompt: &str,
        schema: &[String],
        budget: SynthesisBudget,
        cancel: &CancellationToken,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        let mut budget = budget;
        let mut attempts = Vec::with_capacity(self.config.tiers.len());
        let timeout = self.config.call_timeout();

        for &tier in &self.config.tiers {
            if cancel.is_cancelled() {
                info!(tier = tier.as_str(), "Synthesis cancelled before tier call");
                return Err(SynthesisError::Cancelled);
            }

            if budget.is_exhausted() {
                warn!(tier = tier.as_str(), calls_made = budget.calls_made, "Call budget exhausted, skipping tier");
                attempts.push(TierAttempt::skipped(tier));
                continue;
            }

            let units = budget.units_for(tier);
            budget = budget.charge(units);

            let tier_prompt = prompt_for_tier(prompt, tier);
            let options = GenerateOptions {
                strict_structured_mode: tier.is_strict(),
                max_output_units: units,
                timeout,
                capability: tier.capability(),
                cancel: cancel.clone(),
            };

            debug!(tier = tier.as_str(), output_units = units, "Calling generation service");
            let call = self.service.generate(&tier_prompt, options);

            let text = match call_with_timeout(timeout, cancel, call).await {
                Ok(generated) => generated.text,
                Err(ServiceError::Cancelled) => {
                    info!(tier = tier.as_str(), "Synthesis cancelled during tier call");
                    return Err(SynthesisError::Cancelled);
                }
                Err(e) if e.is_fatal() => {
                    error!(tier = tier.as_str(), "Fatal service error: {}", e);
                    return Err(SynthesisError::Fatal(e));
                }
                Err(e) => {
                    warn!(tier = tier.as_str(), outcome = "service_failed", "Tier failed: {}", e);
                    attempts.push(TierAttempt {
                        tier,
                        outcome: AttemptOutcome::ServiceFailed(e),
                        repaired: false,
                        output_units: units,
                        response: None,
                    });
                    continue;
                }
            };

            let (extraction, repaired) = extract_with_repair(&text);
            let status = extraction.status;
            let succeeded = extraction.is_success();
            let response = RawResponse {
                text,
                tier_used: tier,
                succeeded,
            };

            match extraction.into_data() {
                Some(data) => {
                    let (object, was_array) = data.into_object();
                    let document = SectionDocument::from_object(schema.to_vec(), object);
                    info!(
                        tier = tier.as_str(),
                        outcome = "success",
                        repaired,
                        was_array,
                        sections = document.len(),
                        "Tier produced structured data"
                    );
                    attempts.push(TierAttempt {
                        tier,
                        outcome: AttemptOutcome::Success,
                        repaired,
                        output_units: units,
                        response: Some(response),
                    });
                    return Ok(SynthesisOutcome {
                        result: Some(SynthesisResult::new(document, was_array, tier)),
                        attempts,
                        budget,
                    });
                }
                None => {
                    warn!(
                        tier = tier.as_str(),
                        outcome = "extraction_failed",
                        repaired,
                        status = ?status,
                        "No structured data in response"
                    );
                    attempts.push(TierAttempt {
                        tier,
                        outcome: AttemptOutcome::ExtractionFailed(status),
                        repaired,
                        output_units: units,
                        response: Some(response),
                    });
                }
            }
        }

        warn!(attempts = attempts.len(), "All tiers exhausted without structured data");
        Ok(SynthesisOutcome {
            result: None,
            attempts,
            budget,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_llm::MockProvider;

    fn synthesizer(provider: MockProvider) -> TieredSynthesizer<MockProvider> {
        TieredSynthesizer::new(Arc::new(provider), SynthesizerConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SynthesizerConfig { tiers: vec![], ..SynthesizerConfig::default() };
        let result = TieredSynthesizer::new(Arc::new(MockProvider::default()), config);
        assert!(matches!(result, Err(SynthesisError::Config(_))));
    }

    #[tokio::test]
    async fn test_first_tier_success_stops_escalation() {
        let synth = synthesizer(MockProvider::new(r#"{"overview": "ok"}"#));
        let schema = vec!["overview".to_string()];
        let outcome = synth
            .synthesize("topic", &schema, synth.config().budget(), &CancellationToken::new())
            .await
            .unwrap();

        let result = outcome.result.unwrap();
        assert_eq!(result.tier_used, Tier::EconomyStrict);
        assert!(!result.was_array);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.budget.calls_made, 1);
        assert_eq!(synth.service().call_count(), 1);
    }

    #[tokio::test]
    async fn test_calls_made_excludes_skipped() {
        let config = SynthesizerConfig { max_calls: Some(1), ..SynthesizerConfig::default() };
        let synth = TieredSynthesizer::new(Arc::new(MockProvider::new("prose")), config).unwrap();
        let outcome = synth
            .synthesize("topic", &[], synth.config().budget(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.calls_made(), 1);
        assert_eq!(outcome.attempts.len(), 4);
    }
}
