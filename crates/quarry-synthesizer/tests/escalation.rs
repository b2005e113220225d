//! Tier escalation behavior against a scripted provider

use quarry_domain::{Capability, ServiceError, SynthesisBudget, Tier};
use quarry_extractor::ExtractionStatus;
use quarry_llm::{MockProvider, MockReply};
use quarry_synthesizer::{
    AttemptOutcome, SynthesisError, SynthesizerConfig, TieredSynthesizer, JSON_ONLY_INSTRUCTION,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PROMPT: &str = "Describe the TOPIC market";

fn schema() -> Vec<String> {
    vec!["overview".to_string(), "players".to_string()]
}

fn synthesizer(provider: &MockProvider) -> TieredSynthesizer<MockProvider> {
    TieredSynthesizer::new(Arc::new(provider.clone()), SynthesizerConfig::default()).unwrap()
}

fn budget() -> SynthesisBudget {
    SynthesisBudget::new(1_000)
}

#[tokio::test]
async fn test_prose_escalates_to_free_form_with_larger_allowance() {
    let provider = MockProvider::default();
    provider.script(JSON_ONLY_INSTRUCTION, vec![MockReply::text("```json\n{\"overview\": \"text\"}\n```")]);
    provider.script("TOPIC", vec![MockReply::text("I'm sorry, here is a summary in prose.")]);

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    let result = outcome.result.unwrap();
    assert_eq!(result.tier_used, Tier::EconomyFreeForm);
    assert_eq!(result.document.get("overview"), Some(&json!("text")));
    assert_eq!(result.document.missing_sections(), vec!["players"]);

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].strict);
    assert_eq!(calls[0].max_output_units, 1_000);
    assert!(!calls[1].strict);
    assert_eq!(calls[1].max_output_units, 2_000);
    assert!(calls[1].prompt.ends_with(JSON_ONLY_INSTRUCTION));

    assert_eq!(
        outcome.attempts[0].outcome,
        AttemptOutcome::ExtractionFailed(ExtractionStatus::NoJsonFound)
    );
    assert_eq!(outcome.budget.calls_made, 2);
    assert_eq!(outcome.budget.output_units_requested, 3_000);
}

#[tokio::test]
async fn test_truncated_response_is_repaired_within_tier() {
    let provider = MockProvider::new("{\"overview\": \"cut off\", \"players\": [{\"name\": \"A\"},");

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    let result = outcome.result.unwrap();
    assert_eq!(result.tier_used, Tier::EconomyStrict);
    assert_eq!(result.document.get("players"), Some(&json!([{"name": "A"}])));
    assert!(outcome.attempts[0].repaired);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_array_response_is_wrapped() {
    let provider = MockProvider::new(r#"[{"name": "A"}, {"name": "B"}]"#);

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    let result = outcome.result.unwrap();
    assert!(result.was_array);
    assert_eq!(result.document.extension("section_0"), Some(&json!({"name": "A"})));
    assert_eq!(result.document.extension("section_1"), Some(&json!({"name": "B"})));
}

#[tokio::test]
async fn test_transient_error_moves_to_next_tier() {
    let provider = MockProvider::default();
    provider.script(JSON_ONLY_INSTRUCTION, vec![MockReply::text("{\"overview\": \"ok\"}")]);
    provider.script("TOPIC", vec![MockReply::Error(ServiceError::RateLimited)]);

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.result.unwrap().tier_used, Tier::EconomyFreeForm);
    assert_eq!(
        outcome.attempts[0].outcome,
        AttemptOutcome::ServiceFailed(ServiceError::RateLimited)
    );
}

#[tokio::test]
async fn test_fatal_error_aborts_escalation() {
    let provider = MockProvider::with_default(MockReply::Error(ServiceError::Unauthorized(
        "bad key".into(),
    )));

    let result = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SynthesisError::Fatal(ServiceError::Unauthorized(_)))));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_cancelled_token_makes_no_calls() {
    let provider = MockProvider::default();
    let token = CancellationToken::new();
    token.cancel();

    let result = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &token)
        .await;

    assert!(matches!(result, Err(SynthesisError::Cancelled)));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_tier_failure() {
    let provider = MockProvider::default();
    provider.script(JSON_ONLY_INSTRUCTION, vec![MockReply::text("{\"overview\": \"fast\"}")]);
    provider.script(
        "TOPIC",
        vec![MockReply::Delayed(Duration::from_secs(600), "{\"overview\": \"slow\"}".into())],
    );

    let config = SynthesizerConfig { call_timeout_secs: 5, ..SynthesizerConfig::default() };
    let synth = TieredSynthesizer::new(Arc::new(provider.clone()), config).unwrap();
    let outcome = synth
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.result.unwrap().tier_used, Tier::EconomyFreeForm);
    assert_eq!(
        outcome.attempts[0].outcome,
        AttemptOutcome::ServiceFailed(ServiceError::Timeout(Duration::from_secs(5)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_call() {
    let provider = MockProvider::with_default(MockReply::Delayed(
        Duration::from_secs(60),
        "{}".into(),
    ));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let result = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &token)
        .await;

    assert!(matches!(result, Err(SynthesisError::Cancelled)));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_all_tiers_exhausted_returns_none() {
    let provider = MockProvider::new("no structure here at all");

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.result.is_none());
    let tiers: Vec<Tier> = outcome.attempts.iter().map(|a| a.tier).collect();
    assert_eq!(tiers, Tier::ESCALATION.to_vec());

    let capabilities: Vec<Capability> = provider.calls().iter().map(|c| c.capability).collect();
    assert_eq!(
        capabilities,
        vec![Capability::Economy, Capability::Economy, Capability::Premium, Capability::Premium]
    );
}

#[tokio::test]
async fn test_budget_cap_skips_remaining_tiers() {
    let provider = MockProvider::new("still prose");

    let outcome = synthesizer(&provider)
        .synthesize(PROMPT, &schema(), budget().with_max_calls(2), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.result.is_none());
    assert_eq!(provider.call_count(), 2);
    assert_eq!(outcome.attempts[2].outcome, AttemptOutcome::BudgetExhausted);
    assert_eq!(outcome.attempts[3].outcome, AttemptOutcome::BudgetExhausted);
    assert!(outcome.budget.is_exhausted());
}

#[tokio::test]
async fn test_custom_tier_order() {
    let provider = MockProvider::new("{\"overview\": \"x\"}");
    let config = SynthesizerConfig {
        tiers: vec![Tier::PremiumStrict],
        ..SynthesizerConfig::default()
    };
    let synth = TieredSynthesizer::new(Arc::new(provider.clone()), config).unwrap();

    let outcome = synth
        .synthesize(PROMPT, &schema(), budget(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.result.unwrap().tier_used, Tier::PremiumStrict);
    assert_eq!(provider.calls()[0].capability, Capability::Premium);
}
