//! Prompt construction for synthesis, self-assessment and revision

use crate::evidence::Evidence;
use quarry_domain::{GapDescriptor, SectionDocument};
use quarry_gatekeeper::ValidationReport;

/// First line of every initial synthesis prompt
pub const SYNTHESIS_HEADING: &str = "## Synthesis request";

/// First line of every self-assessment prompt
pub const ASSESSMENT_HEADING: &str = "## Self-assessment request";

/// First line of every revision prompt
pub const REVISION_HEADING: &str = "## Revision request";

const SYNTHESIS_INSTRUCTIONS: &str = r#"You are compiling a structured research profile.

Return a single JSON object whose top-level keys are exactly the required sections listed below.
Use the evidence provided; do not invent figures. Prefer dated and quantified statements.
Entity lists are arrays of objects with at least a "name" field."#;

const ASSESSMENT_INSTRUCTIONS: &str = r#"You are reviewing a structured research profile for completeness and accuracy.

Return a single JSON object in this format:
{
  "confidence_score": 0-100,
  "gaps": [
    {
      "area": "section or topic",
      "description": "what is missing or weak",
      "follow_up_query": "search query that would fill the gap",
      "priority": "high" | "medium"
    }
  ],
  "verification_needed": ["statement that should be checked"]
}

Score conservatively. Only mark a gap "high" if the profile is misleading or unusable without it."#;

const REVISION_INSTRUCTIONS: &str = r#"You are revising a structured research profile using new evidence.

Return the complete revised JSON object with the same top-level keys as the current profile.
Keep every existing section. Extend or correct sections the new evidence covers; leave the rest as they are."#;

/// Builds prompts for one refinement run
pub struct PromptBuilder<'a> {
    topic: &'a str,
    schema: &'a [String],
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for a topic and its declared sections
    pub fn new(topic: &'a str, schema: &'a [String]) -> Self {
        Self { topic, schema }
    }

    fn push_header(&self, prompt: &mut String, heading: &str, instructions: &str) {
        prompt.push_str(heading);
        prompt.push_str("\n\n");
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("Topic: {}\n", self.topic));
        if !self.schema.is_empty() {
            prompt.push_str(&format!("Required sections: {}\n", self.schema.join(", ")));
        }
        prompt.push('\n');
    }

    /// Initial synthesis from the caller's evidence
    pub fn synthesis(&self, evidence: &str) -> String {
        let mut prompt = String::new();
        self.push_header(&mut prompt, SYNTHESIS_HEADING, SYNTHESIS_INSTRUCTIONS);

        prompt.push_str("Evidence:\n---\n");
        prompt.push_str(evidence.trim());
        prompt.push_str("\n---\n");
        prompt
    }

    /// Self-assessment of the current document
    pub fn assessment(&self, document: &SectionDocument, report: &ValidationReport) -> String {
        let mut prompt = String::new();
        self.push_header(&mut prompt, ASSESSMENT_HEADING, ASSESSMENT_INSTRUCTIONS);

        prompt.push_str("Current profile:\n");
        prompt.push_str(&format!("{:#}\n\n", document.to_value()));

        if !report.failures.is_empty() {
            prompt.push_str("Automated checks found these shortfalls:\n");
            for failure in &report.failures {
                prompt.push_str(&format!("- {}\n", failure));
            }
        }
        prompt
    }

    /// Revision of the current document with evidence gathered for gaps
    pub fn revision(
        &self,
        document: &SectionDocument,
        gaps: &[GapDescriptor],
        evidence: &[Evidence],
    ) -> String {
        let mut prompt = String::new();
        self.push_header(&mut prompt, REVISION_HEADING, REVISION_INSTRUCTIONS);

        prompt.push_str("Current profile:\n");
        prompt.push_str(&format!("{:#}\n\n", document.to_value()));

        prompt.push_str("Gaps to address:\n");
        for gap in gaps {
            let verify = if gap.needs_verification { " (verify)" } else { "" };
            prompt.push_str(&format!("- [{}]{} {}\n", gap.area, verify, gap.description));
        }
        prompt.push('\n');

        if evidence.is_empty() {
            prompt.push_str("No new evidence could be retrieved; improve what the current evidence supports.\n");
        } else {
            prompt.push_str("New evidence:\n");
            for item in evidence {
                prompt.push_str(&format!("### {}\n{}\n\n", item.gap.area, item.text.trim()));
            }
        }
        prompt
    }
}
