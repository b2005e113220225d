//! Refinement run identity and progress state

use std::fmt;

/// Unique identifier for a refinement run based on UUIDv7
///
/// Time-ordered, so log lines and diagnostics from many runs sort naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u128);

impl RunId {
    /// Generate a new UUIDv7-based RunId
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::RunId;
    ///
    /// let id = RunId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Parse a RunId from its string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid run id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which the run started
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Progress of one top-level refinement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefinementState {
    /// Completed refinement iterations (0 = initial synthesis only)
    pub iteration: u32,

    /// Effective confidence from the latest scoring pass (0-100)
    pub confidence_score: u8,

    /// Whether the result cleared the confidence threshold
    pub ready_for_client: bool,

    /// Whether cancellation has been observed
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_string_round_trip() {
        let id = RunId::new();
        let parsed = RunId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_run_ids_are_time_ordered() {
        let first = RunId::new();
        let second = RunId::new();
        assert!(second.timestamp() >= first.timestamp());
    }

    #[test]
    fn test_invalid_run_id() {
        assert!(RunId::from_string("not-a-uuid").is_err());
    }
}
