//! Sequential batch completion of quests.
//!
//! Completions run one at a time with a fixed pause between calls; the X1
//! API rate-limits per wallet and expects quests in listing order.

use std::time::Duration;

use tracing::{info, warn};

use crate::api::transport::{ApiRoot, RequestSpec};
use crate::api::RequestExecutor;
use crate::models::{BatchOutcome, BatchResult, Quest};

/// Daily quest still open today
pub fn is_daily_pending(quest: &Quest) -> bool {
    quest.is_daily() && quest.is_active && !quest.is_completed_today
}

/// Social quest never completed
pub fn is_social_pending(quest: &Quest) -> bool {
    quest.is_social() && quest.is_active && !quest.is_completed
}

/// Request that completes one quest
pub fn complete_quest_request(quest_id: &str) -> RequestSpec {
    RequestSpec::post(ApiRoot::Primary, "/quests").with_query("quest_id", quest_id)
}

/// Keep the quests matching `predicate`, in listing order.
pub fn list_pending<F>(quests: Vec<Quest>, predicate: F) -> Vec<Quest>
where
    F: Fn(&Quest) -> bool,
{
    quests.into_iter().filter(|q| predicate(q)).collect()
}

/// Complete each quest in order, pausing `pacing` between consecutive
/// completion calls. A failure is recorded and the batch moves on.
pub async fn complete_all(
    executor: &mut RequestExecutor,
    pending: &[Quest],
    pacing: Duration,
) -> Vec<BatchResult> {
    let mut results = Vec::with_capacity(pending.len());
    let mut called = false;

    for quest in pending {
        if !quest.is_active {
            info!(quest_id = %quest.id, title = %quest.title, "Skipping inactive quest");
            results.push(batch_result(quest, BatchOutcome::Skipped));
            continue;
        }

        if called {
            tokio::time::sleep(pacing).await;
        }
        called = true;

        let outcome = match executor.execute(&complete_quest_request(&quest.id)).await {
            Ok(_) => {
                info!(quest_id = %quest.id, reward = quest.reward, "Quest completed");
                BatchOutcome::Succeeded {
                    reward: quest.reward,
                }
            }
            Err(e) => {
                warn!(quest_id = %quest.id, error = %e, "Quest completion failed");
                BatchOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        results.push(batch_result(quest, outcome));
    }

    results
}

fn batch_result(quest: &Quest, outcome: BatchOutcome) -> BatchResult {
    BatchResult {
        quest_id: quest.id.clone(),
        title: quest.title.clone(),
        reward: quest.reward,
        outcome,
    }
}
