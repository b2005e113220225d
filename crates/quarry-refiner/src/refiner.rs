//! The gap-analysis and refinement loop

use crate::diagnostics::{AbortReason, IterationScore, RefinementDiagnostics};
use crate::evidence::{fetch_evidence, Evidence};
use crate::gaps::{combine_gaps, has_actionable, parse_assessment, select_for_fetch, validator_gaps, SelfAssessment};
use crate::merge::merge_into;
use crate::prompts::PromptBuilder;
use crate::{RefineError, RefinementConfig};
use quarry_domain::{
    EvidenceSource, GapDescriptor, GenerateOptions, GenerationService, RunId, SectionDocument,
    ServiceError, SynthesisResult, Tier,
};
use quarry_extractor::extract_with_repair;
use quarry_gatekeeper::{ContentValidator, ValidationReport};
use quarry_synthesizer::{SynthesisError, TieredSynthesizer};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Refinement loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Waiting for the first successful synthesis
    Initial,
    /// Validating and self-assessing the current result
    Scoring,
    /// Fetching evidence for the top gaps
    GapFilling,
    /// Revising the result with new evidence
    Resynthesizing,
    /// Effective confidence cleared the threshold
    Converged,
    /// Out of iterations or actionable gaps; needs review
    Exhausted,
    /// Cancelled, timed out or hit a fatal error; needs review
    Aborted,
}

impl LoopState {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Initial => "initial",
            LoopState::Scoring => "scoring",
            LoopState::GapFilling => "gap_filling",
            LoopState::Resynthesizing => "resynthesizing",
            LoopState::Converged => "converged",
            LoopState::Exhausted => "exhausted",
            LoopState::Aborted => "aborted",
        }
    }

    /// Whether the loop stops in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Converged | LoopState::Exhausted | LoopState::Aborted)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of a refinement run
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    /// Best result the run produced
    pub result: SynthesisResult,

    /// How the run went
    pub diagnostics: RefinementDiagnostics,
}

/// Drives synthesis, scoring, gap filling and resynthesis for one topic at a time
///
/// Each call to [`RefinementLoop::run_refinement`] owns its own result;
/// concurrent runs on one loop share nothing but the collaborators.
pub struct RefinementLoop<G, E>
where
    G: GenerationService,
    E: EvidenceSource,
{
    synthesizer: TieredSynthesizer<G>,
    evidence: Arc<E>,
    validator: ContentValidator,
    config: RefinementConfig,
}

fn enter(state: &mut LoopState, next: LoopState, iteration: u32) {
    debug!(from = state.as_str(), to = next.as_str(), iteration, "Loop state change");
    *state = next;
}

impl<G, E> RefinementLoop<G, E>
where
    G: GenerationService,
    E: EvidenceSource,
{
    /// Create a loop, rejecting invalid configuration
    pub fn new(service: Arc<G>, evidence: Arc<E>, config: RefinementConfig) -> Result<Self, RefineError> {
        config.validate().map_err(RefineError::Config)?;
        let validator = ContentValidator::new(config.validation.clone())?;
        let synthesizer = TieredSynthesizer::new(service, config.synthesis.clone())?;

        Ok(Self {
            synthesizer,
            evidence,
            validator,
            config,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &RefinementConfig {
        &self.config
    }

    /// The content validator in use
    pub fn validator(&self) -> &ContentValidator {
        &self.validator
    }

    /// Synthesize a result for `topic` and refine it until it converges
    ///
    /// The run works on a child of `cancel`, which the run timeout also
    /// cancels. Once an initial result exists, cancellation, timeout and
    /// fatal service errors end the run `Aborted` with the best result so far.
    ///
    /// # Errors
    ///
    /// - `RefineError::NoInitialResult` when no tier yields structured data
    /// - `RefineError::Cancelled` when cancelled before the initial result
    /// - `RefineError::Fatal` on a fatal service error before the initial result
    pub async fn run_refinement(
        &self,
        topic: &str,
        initial_evidence: &str,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, RefineError> {
        let run_id = RunId::new();
        let span = info_span!("refinement", run_id = %run_id, topic);
        self.run(run_id, topic, initial_evidence, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: RunId,
        topic: &str,
        initial_evidence: &str,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, RefineError> {
        let run_token = cancel.child_token();
        // Stops the timeout timer when the run returns
        let _guard = run_token.clone().drop_guard();
        let timed_out = Arc::new(AtomicBool::new(false));

        if let Some(limit) = self.config.run_timeout() {
            let token = run_token.clone();
            let flag = Arc::clone(&timed_out);
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!(timeout_secs = limit.as_secs(), "Run timeout exceeded, cancelling");
                        flag.store(true, Ordering::SeqCst);
                        token.cancel();
                    }
                }
            });
        }

        let abort_reason =
            |error: Option<&ServiceError>| AbortReason::classify(error, timed_out.load(Ordering::SeqCst));

        let schema = self.config.schema();
        let prompts = PromptBuilder::new(topic, &schema);
        let mut diagnostics = RefinementDiagnostics::new(run_id);
        let mut state = LoopState::Initial;

        info!(
            max_iterations = self.config.max_iterations,
            threshold = self.config.confidence_threshold,
            sections = schema.len(),
            "Starting refinement run"
        );

        let initial = self
            .synthesizer
            .synthesize(
                &prompts.synthesis(initial_evidence),
                &schema,
                self.synthesizer.config().budget(),
                &run_token,
            )
            .await?;
        let mut budget = initial.budget;
        diagnostics.synthesis_calls += initial.calls_made() as u32;

        let Some(mut result) = initial.result else {
            warn!(attempts = initial.attempts.len(), "No tier produced a structurally valid result");
            return Err(RefineError::NoInitialResult);
        };
        if result.was_array {
            warn!("Initial synthesis was array-shaped; sections were wrapped");
        }

        let mut iteration = 0u32;
        let mut selected: Vec<GapDescriptor> = Vec::new();
        let mut evidence: Vec<Evidence> = Vec::new();
        enter(&mut state, LoopState::Scoring, iteration);

        loop {
            if !state.is_terminal() && run_token.is_cancelled() {
                diagnostics.abort_reason = Some(abort_reason(None));
                enter(&mut state, LoopState::Aborted, iteration);
            }

            match state {
                LoopState::Scoring => {
                    let report = self.validator.validate_document(&result.document);
                    let assessment = match self.assess(&prompts, &result.document, &report, &run_token).await {
                        Ok(assessment) => assessment,
                        Err(e) => {
                            diagnostics.abort_reason = Some(abort_reason(Some(&e)));
                            enter(&mut state, LoopState::Aborted, iteration);
                            continue;
                        }
                    };

                    let external = assessment.as_ref().map_or(0, |a| a.confidence_score);
                    let effective = external.min(report.score);
                    let gaps = combine_gaps([
                        validator_gaps(&report, topic),
                        assessment.map(|a| a.gaps).unwrap_or_default(),
                    ]);

                    info!(
                        iteration,
                        external,
                        validator = report.score,
                        effective,
                        gaps = gaps.len(),
                        "Scored result"
                    );
                    diagnostics.record_score(IterationScore {
                        iteration,
                        external,
                        validator: report.score,
                        effective,
                        gaps: gaps.len(),
                    });

                    if effective >= self.config.confidence_threshold {
                        diagnostics.ready_for_client = true;
                        enter(&mut state, LoopState::Converged, iteration);
                    } else if iteration >= self.config.max_iterations || !has_actionable(&gaps) {
                        enter(&mut state, LoopState::Exhausted, iteration);
                    } else {
                        selected = select_for_fetch(&gaps, self.config.max_gaps_per_iteration);
                        enter(&mut state, LoopState::GapFilling, iteration);
                    }
                }
                LoopState::GapFilling => {
                    diagnostics.evidence_fetches += selected.len();
                    match fetch_evidence(
                        self.evidence.as_ref(),
                        &selected,
                        self.config.fetch_concurrency,
                        self.config.inter_fetch_delay(),
                        &self.config.retry,
                        &run_token,
                    )
                    .await
                    {
                        Ok(fetched) => {
                            evidence = fetched;
                            enter(&mut state, LoopState::Resynthesizing, iteration);
                        }
                        Err(e) => {
                            diagnostics.abort_reason = Some(abort_reason(Some(&e)));
                            enter(&mut state, LoopState::Aborted, iteration);
                        }
                    }
                }
                LoopState::Resynthesizing => {
                    let revision = prompts.revision(&result.document, &selected, &evidence);
                    selected.clear();
                    evidence.clear();

                    let outcome = match self
                        .synthesizer
                        .synthesize(&revision, &schema, budget, &run_token)
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(SynthesisError::Fatal(e)) => {
                            diagnostics.abort_reason = Some(abort_reason(Some(&e)));
                            enter(&mut state, LoopState::Aborted, iteration);
                            continue;
                        }
                        Err(SynthesisError::Config(msg)) => {
                            diagnostics.abort_reason = Some(AbortReason::Config(msg));
                            enter(&mut state, LoopState::Aborted, iteration);
                            continue;
                        }
                        Err(SynthesisError::Cancelled) => {
                            diagnostics.abort_reason = Some(abort_reason(None));
                            enter(&mut state, LoopState::Aborted, iteration);
                            continue;
                        }
                    };

                    budget = outcome.budget;
                    diagnostics.synthesis_calls += outcome.calls_made() as u32;
                    iteration += 1;
                    diagnostics.iterations = iteration;

                    match outcome.result {
                        Some(revised) if revised.was_array => {
                            warn!(iteration, "Resynthesis was array-shaped, keeping previous result");
                            diagnostics.discarded_resyntheses += 1;
                        }
                        Some(revised) => {
                            let merge = merge_into(&mut result.document, &revised.document);
                            if merge.changed() < self.config.min_changed_sections {
                                warn!(
                                    iteration,
                                    changed = merge.changed(),
                                    expected = self.config.min_changed_sections,
                                    "Resynthesis changed fewer sections than expected"
                                );
                            } else {
                                debug!(iteration, changed = ?merge.changed_sections, "Merged resynthesis");
                            }
                        }
                        None if budget.is_exhausted() => {
                            warn!(iteration, "Call budget exhausted during resynthesis");
                            enter(&mut state, LoopState::Exhausted, iteration);
                            continue;
                        }
                        None => {
                            warn!(iteration, "Resynthesis produced no structured data, keeping previous result");
                        }
                    }

                    enter(&mut state, LoopState::Scoring, iteration);
                }
                LoopState::Initial | LoopState::Converged | LoopState::Exhausted | LoopState::Aborted => break,
            }
        }

        diagnostics.final_state = state;
        diagnostics.needs_review = !diagnostics.ready_for_client;
        info!(
            final_state = state.as_str(),
            iterations = diagnostics.iterations,
            confidence = diagnostics.final_confidence_score,
            ready_for_client = diagnostics.ready_for_client,
            "Refinement run finished"
        );

        Ok(RefinementOutcome { result, diagnostics })
    }

    /// Ask the service to assess the current document
    ///
    /// Ok(None) when the assessment cannot be obtained or parsed; Err only
    /// for cancellation and fatal errors.
    async fn assess(
        &self,
        prompts: &PromptBuilder<'_>,
        document: &SectionDocument,
        report: &ValidationReport,
        cancel: &CancellationToken,
    ) -> Result<Option<SelfAssessment>, ServiceError> {
        let prompt = prompts.assessment(document, report);
        let prompt: &str = &prompt;
        let service: &G = self.synthesizer.service();
        let tier = Tier::EconomyStrict;
        let max_output_units = self.config.assessment_output_units;
        let timeout = self.config.retry.per_attempt_timeout();

        let response = self
            .config
            .retry
            .run(cancel, "self_assessment", move || {
                service.generate(
                    prompt,
                    GenerateOptions {
                        strict_structured_mode: tier.is_strict(),
                        max_output_units,
                        timeout,
                        capability: tier.capability(),
                        cancel: cancel.clone(),
                    },
                )
            })
            .await;

        match response {
            Ok(generated) => {
                let (extraction, repaired) = extract_with_repair(&generated.text);
                let assessment = extraction
                    .into_data()
                    .and_then(|data| parse_assessment(&data.into_value()));
                if assessment.is_none() {
                    warn!(repaired, "Self-assessment unparseable, external score 0");
                }
                Ok(assessment)
            }
            Err(e) if e.is_cancelled() || e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Self-assessment failed, external score 0: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_llm::{MockEvidenceSource, MockProvider};

    #[test]
    fn test_terminal_states() {
        assert!(LoopState::Converged.is_terminal());
        assert!(LoopState::Exhausted.is_terminal());
        assert!(LoopState::Aborted.is_terminal());
        assert!(!LoopState::Scoring.is_terminal());
        assert!(!LoopState::GapFilling.is_terminal());
        assert_eq!(LoopState::GapFilling.to_string(), "gap_filling");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RefinementConfig { fetch_concurrency: 0, ..RefinementConfig::default() };
        let result = RefinementLoop::new(
            Arc::new(MockProvider::default()),
            Arc::new(MockEvidenceSource::new("")),
            config,
        );
        assert!(matches!(result, Err(RefineError::Config(_))));
    }
}
