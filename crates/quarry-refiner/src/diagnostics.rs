//! Per-run diagnostics for the refinement loop

use crate::refiner::LoopState;
use quarry_domain::{RefinementState, RunId, ServiceError};
use std::fmt;

/// Why a run ended `Aborted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller's token fired
    Cancelled,
    /// The run timeout fired
    RunTimeout,
    /// A service error no retry or tier can recover from
    Fatal(ServiceError),
    /// Invalid configuration surfaced mid-run
    Config(String),
}

impl AbortReason {
    /// Reason for a run stopped by its token, optionally with the error that stopped it
    pub(crate) fn classify(error: Option<&ServiceError>, timed_out: bool) -> Self {
        match error {
            Some(e) if e.is_fatal() => AbortReason::Fatal(e.clone()),
            _ if timed_out => AbortReason::RunTimeout,
            _ => AbortReason::Cancelled,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("cancelled"),
            AbortReason::RunTimeout => f.write_str("run timeout exceeded"),
            AbortReason::Fatal(e) => write!(f, "fatal service error: {}", e),
            AbortReason::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

/// Scores recorded by one scoring pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationScore {
    /// Iteration the pass scored (0 = initial synthesis)
    pub iteration: u32,

    /// Self-assessed confidence (0 when unavailable)
    pub external: u8,

    /// Content validator score
    pub validator: u8,

    /// min(external, validator)
    pub effective: u8,

    /// Gaps identified by the pass
    pub gaps: usize,
}

/// Diagnostics returned with every refinement result
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementDiagnostics {
    /// Run identifier (also attached to the run's tracing span)
    pub run_id: RunId,

    /// Gap-filling iterations completed
    pub iterations: u32,

    /// Effective confidence from the last scoring pass
    pub final_confidence_score: u8,

    /// Whether the result cleared the confidence threshold
    pub ready_for_client: bool,

    /// One entry per scoring pass, in order
    pub per_iteration_scores: Vec<IterationScore>,

    /// Terminal state of the loop
    pub final_state: LoopState,

    /// Whether a human should review the result
    pub needs_review: bool,

    /// Why the run aborted, when it did
    pub abort_reason: Option<AbortReason>,

    /// Generation calls spent on synthesis and resynthesis
    pub synthesis_calls: u32,

    /// Evidence fetches attempted
    pub evidence_fetches: usize,

    /// Array-shaped resyntheses that were dropped
    pub discarded_resyntheses: u32,
}

impl RefinementDiagnostics {
    pub(crate) fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            iterations: 0,
            final_confidence_score: 0,
            ready_for_client: false,
            per_iteration_scores: Vec::new(),
            final_state: LoopState::Initial,
            needs_review: false,
            abort_reason: None,
            synthesis_calls: 0,
            evidence_fetches: 0,
            discarded_resyntheses: 0,
        }
    }

    pub(crate) fn record_score(&mut self, score: IterationScore) {
        self.final_confidence_score = score.effective;
        self.per_iteration_scores.push(score);
    }

    /// Snapshot as a `RefinementState`
    pub fn state(&self) -> RefinementState {
        RefinementState {
            iteration: self.iterations,
            confidence_score: self.final_confidence_score,
            ready_for_client: self.ready_for_client,
            cancelled: matches!(self.abort_reason, Some(AbortReason::Cancelled)),
        }
    }

    /// Human-readable run report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Refinement Run {}", self.run_id),
            "======================".to_string(),
            format!("Final state: {}", self.final_state.as_str()),
            format!("Iterations: {}", self.iterations),
            format!("Final confidence: {}", self.final_confidence_score),
            format!("Ready for client: {}", self.ready_for_client),
            format!("Needs review: {}", self.needs_review),
        ];

        if let Some(reason) = &self.abort_reason {
            lines.push(format!("Abort reason: {}", reason));
        }
        lines.push(String::new());

        if !self.per_iteration_scores.is_empty() {
            lines.push("Scores by iteration:".to_string());
            for score in &self.per_iteration_scores {
                lines.push(format!(
                    "  {}: external={} validator={} effective={} gaps={}",
                    score.iteration, score.external, score.validator, score.effective, score.gaps
                ));
            }
            lines.push(String::new());
        }

        lines.push(format!("Synthesis calls: {}", self.synthesis_calls));
        lines.push(format!("Evidence fetches: {}", self.evidence_fetches));
        if self.discarded_resyntheses > 0 {
            lines.push(format!("Discarded resyntheses: {}", self.discarded_resyntheses));
        }

        lines.join("\n")
    }
}
