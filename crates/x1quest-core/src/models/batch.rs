use serde::Serialize;

/// What happened to one quest in a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Skipped,
    Succeeded { reward: f64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub quest_id: String,
    pub title: String,
    pub reward: f64,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Succeeded { .. })
    }
}

/// Totals over a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_reward: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match result.outcome {
                BatchOutcome::Skipped => summary.skipped += 1,
                BatchOutcome::Succeeded { reward } => {
                    summary.succeeded += 1;
                    summary.total_reward += reward;
                }
                BatchOutcome::Failed { .. } => summary.failed += 1,
            }
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, outcome: BatchOutcome) -> BatchResult {
        BatchResult {
            quest_id: id.to_string(),
            title: format!("Quest {}", id),
            reward: 10.0,
            outcome,
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result("1", BatchOutcome::Succeeded { reward: 10.0 }),
            result("2", BatchOutcome::Failed { error: "closed".to_string() }),
            result("3", BatchOutcome::Succeeded { reward: 25.5 }),
            result("4", BatchOutcome::Skipped),
        ];

        assert_eq!(
            BatchSummary::from_results(&results),
            BatchSummary {
                succeeded: 2,
                failed: 1,
                skipped: 1,
                total_reward: 35.5,
            }
        );
        assert_eq!(BatchSummary::from_results(&[]), BatchSummary::default());
    }

    #[test]
    fn test_result_serializes_flat() {
        let value = serde_json::to_value(result(
            "9",
            BatchOutcome::Failed { error: "nope".to_string() },
        ))
        .expect("serializes");
        assert_eq!(value["quest_id"], "9");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "nope");
    }
}
