use serde::{Deserialize, Serialize};

/// Status of a single plan step.
///
/// Statuses outside the known set are kept verbatim as [`StepStatus::Other`]
/// so one odd value never discards the rest of a plan snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently being worked on. Should be unique within a plan.
    InProgress,
    /// Finished.
    Completed,
    /// Deliberately not executed.
    Skipped,
    /// Any other status string. Rendered as pending but never counted.
    Other(String),
}

impl StepStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Skipped => "skipped",
            StepStatus::Other(raw) => raw,
        }
    }

    /// Glyph shown next to the step in plan summaries.
    pub fn glyph(&self) -> &'static str {
        match self {
            StepStatus::Pending | StepStatus::Other(_) => "⏳",
            StepStatus::InProgress => "🔄",
            StepStatus::Completed => "✅",
            StepStatus::Skipped => "⏭️",
        }
    }
}

impl From<String> for StepStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => StepStatus::Pending,
            "in_progress" | "in-progress" | "inprogress" => StepStatus::InProgress,
            "completed" => StepStatus::Completed,
            "skipped" => StepStatus::Skipped,
            _ => StepStatus::Other(raw),
        }
    }
}

impl From<StepStatus> for String {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One step of a retrieval plan. Missing fields default to empty text and
/// a pending status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Identifier unique within the plan (e.g. `step1`).
    #[serde(default)]
    pub id: String,
    /// What to investigate or retrieve in this step.
    #[serde(default)]
    pub description: String,
    /// Current status.
    #[serde(default)]
    pub status: StepStatus,
}

/// Per-status totals of a plan snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
    /// Number of steps in the plan.
    pub total: usize,
    /// Steps still pending.
    pub pending: usize,
    /// Steps in progress.
    pub in_progress: usize,
    /// Steps completed.
    pub completed: usize,
    /// Steps skipped.
    pub skipped: usize,
}

impl PlanCounts {
    /// Tallies the given steps.
    pub fn tally(steps: &[PlanStep]) -> Self {
        let mut counts = PlanCounts {
            total: steps.len(),
            ..Default::default()
        };
        for step in steps {
            match step.status {
                StepStatus::Pending => counts.pending += 1,
                StepStatus::InProgress => counts.in_progress += 1,
                StepStatus::Completed => counts.completed += 1,
                StepStatus::Skipped => counts.skipped += 1,
                StepStatus::Other(_) => {}
            }
        }
        counts
    }

    /// Steps that still block synthesis.
    pub fn remaining(&self) -> usize {
        self.pending + self.in_progress
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn step(id: &str, status: StepStatus) -> PlanStep {
        PlanStep {
            id: id.into(),
            description: format!("do {id}"),
            status,
        }
    }

    #[test]
    fn test_tally_and_remaining() {
        let steps = vec![
            step("a", StepStatus::Completed),
            step("b", StepStatus::InProgress),
            step("c", StepStatus::Pending),
            step("d", StepStatus::Skipped),
        ];
        let counts = PlanCounts::tally(&steps);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.remaining(), 2);
        assert_eq!(counts.skipped, 1);
    }

    #[test]
    fn test_status_aliases() {
        let s: StepStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(s, StepStatus::InProgress);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"in_progress\"");
    }

    #[test]
    fn test_unknown_status_is_kept_and_not_counted() {
        let s: StepStatus = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(s, StepStatus::Other("blocked".into()));
        assert_eq!(s.glyph(), StepStatus::Pending.glyph());
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"blocked\"");

        let steps = vec![step("a", StepStatus::Completed), step("b", s)];
        let counts = PlanCounts::tally(&steps);
        assert_eq!(counts.total, 2);
        assert_eq!(counts.remaining(), 0);
    }

    #[test]
    fn test_step_fields_default() {
        let step: PlanStep = serde_json::from_str(r#"{"id": "s1"}"#).unwrap();
        assert_eq!(step.description, "");
        assert_eq!(step.status, StepStatus::Pending);
    }
}
