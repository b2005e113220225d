//! Gap descriptors - targeted follow-up work derived from a shortfall

use serde::{Deserialize, Serialize};

/// Priority of a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPriority {
    /// Worth fetching evidence for this iteration
    High,

    /// Nice to have
    Medium,
}

impl GapPriority {
    /// Parse a priority label; anything unrecognized is Medium
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" | "p0" | "p1" => GapPriority::High,
            _ => GapPriority::Medium,
        }
    }
}

/// A prioritized follow-up query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapDescriptor {
    /// Section or topic area the gap belongs to
    pub area: String,

    /// What is missing or weak
    pub description: String,

    /// Query to send to the evidence source
    pub follow_up_query: String,

    /// Gap priority
    pub priority: GapPriority,

    /// The gap asks to verify an existing statement rather than add content
    #[serde(default)]
    pub needs_verification: bool,
}

impl GapDescriptor {
    /// Create a gap
    pub fn new(
        area: impl Into<String>,
        description: impl Into<String>,
        follow_up_query: impl Into<String>,
        priority: GapPriority,
    ) -> Self {
        Self {
            area: area.into(),
            description: description.into(),
            follow_up_query: follow_up_query.into(),
            priority,
            needs_verification: false,
        }
    }

    /// Mark as a verification item
    pub fn for_verification(mut self) -> Self {
        self.needs_verification = true;
        self
    }

    /// Whether this gap justifies another gap-filling pass
    pub fn is_actionable(&self) -> bool {
        self.priority == GapPriority::High || self.needs_verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(GapPriority::High < GapPriority::Medium);
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(GapPriority::parse_lenient(" HIGH "), GapPriority::High);
        assert_eq!(GapPriority::parse_lenient("low"), GapPriority::Medium);
    }

    #[test]
    fn test_actionable() {
        let medium = GapDescriptor::new("a", "d", "q", GapPriority::Medium);
        assert!(!medium.is_actionable());
        assert!(medium.clone().for_verification().is_actionable());
        assert!(GapDescriptor::new("a", "d", "q", GapPriority::High).is_actionable());
    }
}
