//! Self-assessment parsing and gap analysis

use quarry_domain::{GapDescriptor, GapPriority};
use quarry_gatekeeper::ValidationReport;
use serde_json::Value;
use std::collections::BTreeMap;

/// Parsed self-assessment from the generation service
#[derive(Debug, Clone, PartialEq)]
pub struct SelfAssessment {
    /// Service-reported confidence (0-100)
    pub confidence_score: u8,

    /// Gaps and verification items, in the order reported
    pub gaps: Vec<GapDescriptor>,
}

fn parse_score(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() {
        return None;
    }
    // Scores reported on a 0-1 scale are rescaled
    let score = if score > 0.0 && score <= 1.0 && value.is_f64() { score * 100.0 } else { score };
    Some(score.round().clamp(0.0, 100.0) as u8)
}

fn string_field<'a>(object: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_gap(value: &Value) -> Option<GapDescriptor> {
    let object = value.as_object()?;
    let area = string_field(object, "area")?;
    let description = string_field(object, "description").unwrap_or(area);
    let follow_up_query = string_field(object, "follow_up_query").unwrap_or(description);
    let priority = string_field(object, "priority")
        .map(GapPriority::parse_lenient)
        .unwrap_or(GapPriority::Medium);
    Some(GapDescriptor::new(area, description, follow_up_query, priority))
}

/// Parse a self-assessment object
///
/// Returns None when there is no usable `confidence_score`. Malformed gap
/// entries are skipped.
///
/// # Examples
///
/// ```
/// use quarry_refiner::gaps::parse_assessment;
/// use serde_json::json;
///
/// let assessment = parse_assessment(&json!({
///     "confidence_score": 62,
///     "gaps": [{"area": "players", "description": "only two", "priority": "high"}],
///     "verification_needed": ["market size figure"]
/// }))
/// .unwrap();
///
/// assert_eq!(assessment.confidence_score, 62);
/// assert_eq!(assessment.gaps.len(), 2);
/// assert!(assessment.gaps[1].needs_verification);
/// ```
pub fn parse_assessment(value: &Value) -> Option<SelfAssessment> {
    let object = value.as_object()?;
    let confidence_score = parse_score(object.get("confidence_score")?)?;

    let mut gaps: Vec<GapDescriptor> = object
        .get("gaps")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_gap).collect())
        .unwrap_or_default();

    if let Some(items) = object.get("verification_needed").and_then(Value::as_array) {
        gaps.extend(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|item| GapDescriptor::new(item, item, item, GapPriority::Medium).for_verification()),
        );
    }

    Some(SelfAssessment { confidence_score, gaps })
}

/// One high-priority gap per section with validator failures
pub fn validator_gaps(report: &ValidationReport, topic: &str) -> Vec<GapDescriptor> {
    let mut by_section: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for failure in &report.failures {
        by_section
            .entry(failure.section.as_str())
            .or_default()
            .push(failure.message.as_str());
    }

    by_section
        .into_iter()
        .map(|(section, messages)| {
            GapDescriptor::new(
                section,
                messages.join("; "),
                format!("{} {}", topic, section.replace('_', " ")),
                GapPriority::High,
            )
        })
        .collect()
}

/// Merge gap lists, de-duplicated by area and ordered high priority first
///
/// On a duplicate area the higher-priority entry is kept; ties keep the
/// earlier one. Order within a priority follows first appearance.
pub fn combine_gaps(lists: impl IntoIterator<Item = Vec<GapDescriptor>>) -> Vec<GapDescriptor> {
    let mut combined: Vec<GapDescriptor> = Vec::new();

    for gap in lists.into_iter().flatten() {
        let key = gap.area.to_lowercase();
        match combined.iter().position(|g| g.area.to_lowercase() == key) {
            Some(i) if gap.priority < combined[i].priority => combined[i] = gap,
            Some(i) => combined[i].needs_verification |= gap.needs_verification,
            None => combined.push(gap),
        }
    }

    // Stable: keeps first-appearance order within each priority
    combined.sort_by_key(|g| g.priority);
    combined
}

/// Whether any gap justifies another gap-filling pass
pub fn has_actionable(gaps: &[GapDescriptor]) -> bool {
    gaps.iter().any(GapDescriptor::is_actionable)
}

/// Up to `limit` actionable gaps, highest priority first
pub fn select_for_fetch(gaps: &[GapDescriptor], limit: usize) -> Vec<GapDescriptor> {
    gaps.iter()
        .filter(|g| g.is_actionable())
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_gatekeeper::{validate_only, ValidationRules};
    use serde_json::json;

    fn gap(area: &str, priority: GapPriority) -> GapDescriptor {
        GapDescriptor::new(area, "d", "q", priority)
    }

    #[test]
    fn test_score_variants() {
        let score = |v: Value| parse_assessment(&json!({"confidence_score": v})).map(|a| a.confidence_score);
        assert_eq!(score(json!(85)), Some(85));
        assert_eq!(score(json!("72%")), Some(72));
        assert_eq!(score(json!(0.8)), Some(80));
        assert_eq!(score(json!(140)), Some(100));
        assert_eq!(score(json!(-3)), Some(0));
        assert_eq!(score(json!(1)), Some(1));
        assert_eq!(score(json!("high")), None);
        assert_eq!(score(json!(null)), None);
    }

    #[test]
    fn test_missing_score_is_none() {
        assert!(parse_assessment(&json!({"gaps": []})).is_none());
        assert!(parse_assessment(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_gap_fields_fall_back() {
        let assessment = parse_assessment(&json!({
            "confidence_score": 50,
            "gaps": [
                {"area": "pricing"},
                {"description": "no area"},
                {"area": "players", "description": "thin", "follow_up_query": "acme rivals", "priority": "HIGH"},
                "junk"
            ]
        }))
        .unwrap();

        assert_eq!(assessment.gaps.len(), 2);
        assert_eq!(assessment.gaps[0].follow_up_query, "pricing");
        assert_eq!(assessment.gaps[0].priority, GapPriority::Medium);
        assert_eq!(assessment.gaps[1].follow_up_query, "acme rivals");
        assert_eq!(assessment.gaps[1].priority, GapPriority::High);
    }

    #[test]
    fn test_validator_gaps_one_per_section() {
        let report = validate_only(&json!({"overview": 3}), &ValidationRules::market_profile());
        let gaps = validator_gaps(&report, "Solar");

        assert_eq!(gaps.len(), 3);
        assert!(gaps.iter().all(|g| g.priority == GapPriority::High));
        let market = gaps.iter().find(|g| g.area == "market_data").unwrap();
        assert_eq!(market.follow_up_query, "Solar market data");
    }

    #[test]
    fn test_combine_dedups_and_orders() {
        let combined = combine_gaps(vec![
            vec![gap("players", GapPriority::High)],
            vec![
                gap("pricing", GapPriority::Medium),
                gap("Players", GapPriority::Medium),
                gap("regulation", GapPriority::High),
            ],
        ]);

        let areas: Vec<&str> = combined.iter().map(|g| g.area.as_str()).collect();
        assert_eq!(areas, vec!["players", "regulation", "pricing"]);
    }

    #[test]
    fn test_combine_upgrades_priority() {
        let combined = combine_gaps(vec![
            vec![gap("x", GapPriority::Medium)],
            vec![gap("x", GapPriority::High)],
        ]);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].priority, GapPriority::High);
    }

    #[test]
    fn test_actionable_and_selection() {
        let medium = gap("m", GapPriority::Medium);
        assert!(!has_actionable(std::slice::from_ref(&medium)));

        let verify = medium.clone().for_verification();
        assert!(has_actionable(&[medium.clone(), verify]));

        let gaps = combine_gaps(vec![vec![
            gap("a", GapPriority::High),
            gap("b", GapPriority::Medium),
            gap("c", GapPriority::High),
            gap("d", GapPriority::High),
        ]]);
        let selected = select_for_fetch(&gaps, 2);
        let areas: Vec<&str> = selected.iter().map(|g| g.area.as_str()).collect();
        assert_eq!(areas, vec!["a", "c"]);
    }
}
