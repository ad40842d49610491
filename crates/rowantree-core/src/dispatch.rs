//! Action queue dispatch.
//!
//! Hands a resolved queue to the user-state service as one batch. The queue
//! is neither reordered nor deduplicated: the notification at its tail
//! describes the mutations before it, so it must land after them.

use rowantree_types::ActionQueue;
use tracing::debug;

use crate::service::{ServiceError, UserStateService};

/// Errors that can occur when dispatching a queue.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The service refused or failed the batch.
    #[error("action queue submission failed ({actions} actions): {source}")]
    Submit {
        /// Number of actions in the failed batch.
        actions: usize,
        /// The underlying service error.
        source: ServiceError,
    },
}

/// Submit `queue` to `service` in a single batch call.
///
/// An empty queue is a no-op.
///
/// # Errors
///
/// Returns [`DispatchError::Submit`] if the service fails the batch.
pub async fn dispatch<S>(service: &S, queue: &ActionQueue) -> Result<(), DispatchError>
where
    S: UserStateService,
{
    if queue.is_empty() {
        return Ok(());
    }

    let mutations = queue.iter().filter(|action| action.is_mutation()).count();
    match serde_json::to_string(queue) {
        Ok(json) => debug!(
            actions = queue.len(),
            mutations,
            queue = %json,
            "dispatching action queue"
        ),
        Err(e) => debug!(
            actions = queue.len(),
            mutations,
            error = %e,
            "dispatching action queue"
        ),
    }

    service
        .submit_action_queue(queue)
        .await
        .map_err(|source| DispatchError::Submit {
            actions: queue.len(),
            source,
        })
}
