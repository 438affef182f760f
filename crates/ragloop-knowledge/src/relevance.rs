use serde::{Deserialize, Serialize};

/// Discretized relevance of a search score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceLevel {
    /// Score below 0.4.
    VeryLow,
    /// Score in [0.4, 0.6).
    Low,
    /// Score in [0.6, 0.8).
    Medium,
    /// Score of 0.8 or more.
    High,
}

impl RelevanceLevel {
    /// Buckets a score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RelevanceLevel::High
        } else if score >= 0.6 {
            RelevanceLevel::Medium
        } else if score >= 0.4 {
            RelevanceLevel::Low
        } else {
            RelevanceLevel::VeryLow
        }
    }

    /// Label shown in tool reports.
    pub fn label(&self) -> &'static str {
        match self {
            RelevanceLevel::High => "high relevance",
            RelevanceLevel::Medium => "medium relevance",
            RelevanceLevel::Low => "low relevance",
            RelevanceLevel::VeryLow => "very low relevance",
        }
    }
}

/// Shorthand for `RelevanceLevel::from_score(score).label()`.
pub fn relevance_label(score: f64) -> &'static str {
    RelevanceLevel::from_score(score).label()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(RelevanceLevel::from_score(0.8), RelevanceLevel::High);
        assert_eq!(RelevanceLevel::from_score(0.79), RelevanceLevel::Medium);
        assert_eq!(RelevanceLevel::from_score(0.6), RelevanceLevel::Medium);
        assert_eq!(RelevanceLevel::from_score(0.4), RelevanceLevel::Low);
        assert_eq!(RelevanceLevel::from_score(0.39), RelevanceLevel::VeryLow);
        assert_eq!(RelevanceLevel::from_score(f64::NAN), RelevanceLevel::VeryLow);
        assert_eq!(relevance_label(0.95), "high relevance");
    }
}
