//! Event resolution: turning an encounter into clamped state changes.
//!
//! An event arrives with upper bounds for each reward and curse. For every
//! entry the resolver rolls an amount in `[1, bound]`, clamps it against
//! what the user actually holds, queues the matching delta, and writes the
//! applied amount back into the event. The corrected event is then
//! serialized as the notification payload, so the notification never
//! disagrees with the ledger.
//!
//! Clamping rules:
//!
//! | outcome | reward | curse |
//! |---|---|---|
//! | population | uncapped | capped at current population |
//! | store in snapshot | capped at balance | capped at balance |
//! | store not in snapshot | unclamped | unclamped |
//!
//! Queue order is every reward, then every curse, then one notification.

use std::collections::BTreeMap;

use rand::Rng;
use rowantree_types::{Action, ActionQueue, OutcomeKind, StoreSnapshot, UserEvent, UserId};
use tracing::{debug, warn};

use crate::service::{ServiceError, UserStateService};

/// Errors that can occur while resolving an event.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Reading the user's holdings failed.
    #[error("failed to read holdings: {source}")]
    Service {
        /// The underlying service error.
        #[from]
        source: ServiceError,
    },

    /// The resolved event could not be serialized for the notification.
    #[error("failed to serialize notification payload: {source}")]
    Payload {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// What a user holds at the moment of resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holdings {
    /// Store balances.
    pub stores: StoreSnapshot,
    /// Current population, if it was read. Population curses clamp to zero
    /// when it is absent.
    pub population: Option<i64>,
}

/// A resolved encounter: the corrected event and the queue that applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The event with every bound replaced by the amount applied.
    pub event: UserEvent,
    /// Mutations followed by the notification.
    pub queue: ActionQueue,
}

/// Resolve `event` for `user`, reading holdings from `service`.
///
/// Returns `Ok(None)` without touching the service when `event` is `None`.
/// Otherwise reads the user's stores once, and their population once more
/// only if the event curses population.
///
/// # Errors
///
/// Returns [`ResolveError::Service`] if a read fails, or
/// [`ResolveError::Payload`] if the notification cannot be serialized.
pub async fn resolve<S, R>(
    service: &S,
    event: Option<UserEvent>,
    user: UserId,
    rng: &mut R,
) -> Result<Option<Resolution>, ResolveError>
where
    S: UserStateService,
    R: Rng + Send,
{
    let Some(mut event) = event else {
        return Ok(None);
    };
    drop_malformed(&mut event.reward, user, "reward");
    drop_malformed(&mut event.curse, user, "curse");

    let stores = service.user_stores(user).await?;
    let population = if event.curse.contains_key(&OutcomeKind::Population) {
        Some(service.user_population(user).await?)
    } else {
        None
    };

    let holdings = Holdings { stores, population };
    let queue = resolve_event(&mut event, user, &holdings, rng)?;
    Ok(Some(Resolution { event, queue }))
}

/// Resolve `event` against known `holdings`.
///
/// A category (reward or curse) holding any non-positive bound is
/// malformed and is emptied, so it produces no actions and an empty map in
/// the payload. Every remaining entry is overwritten with the amount
/// actually applied.
///
/// # Errors
///
/// Returns [`ResolveError::Payload`] if the corrected event cannot be
/// serialized.
pub fn resolve_event(
    event: &mut UserEvent,
    user: UserId,
    holdings: &Holdings,
    rng: &mut impl Rng,
) -> Result<ActionQueue, ResolveError> {
    drop_malformed(&mut event.reward, user, "reward");
    drop_malformed(&mut event.curse, user, "curse");

    let mut queue = ActionQueue::new();

    for (kind, bound) in &mut event.reward {
        let rolled = rng.random_range(1..=*bound);
        let applied = match *kind {
            // No upper limit applies to population gains.
            OutcomeKind::Population => rolled,
            OutcomeKind::Store(store) => clamp_to_store(rolled, holdings.stores.get(&store)),
        };
        queue.push(delta_action(user, *kind, applied));
        debug!(user = %user, kind = %kind, rolled, applied, "reward resolved");
        *bound = applied;
    }

    for (kind, bound) in &mut event.curse {
        let rolled = rng.random_range(1..=*bound);
        let applied = match *kind {
            OutcomeKind::Population => rolled.min(holdings.population.unwrap_or(0).max(0)),
            OutcomeKind::Store(store) => clamp_to_store(rolled, holdings.stores.get(&store)),
        };
        queue.push(delta_action(user, *kind, 0_i64.saturating_sub(applied)));
        debug!(user = %user, kind = %kind, rolled, applied, "curse resolved");
        *bound = applied;
    }

    let payload = serde_json::to_string(event)?;
    queue.push(Action::Notify { user, payload });

    Ok(queue)
}

/// Cap `amount` at a known store balance; unknown stores pass through.
fn clamp_to_store(amount: i64, balance: Option<&i64>) -> i64 {
    match balance {
        Some(&balance) => amount.min(balance.max(0)),
        None => amount,
    }
}

fn delta_action(user: UserId, kind: OutcomeKind, delta: i64) -> Action {
    match kind {
        OutcomeKind::Population => Action::DeltaPopulation { user, delta },
        OutcomeKind::Store(store) => Action::DeltaStore { user, store, delta },
    }
}

/// Empty a whole category if any of its bounds is non-positive.
fn drop_malformed(outcomes: &mut BTreeMap<OutcomeKind, i64>, user: UserId, category: &str) {
    let Some((kind, bound)) = outcomes.iter().find(|(_, bound)| **bound <= 0) else {
        return;
    };
    warn!(
        user = %user,
        category,
        kind = %kind,
        bound = *bound,
        entries = outcomes.len(),
        "non-positive event bound, ignoring the whole category"
    );
    outcomes.clear();
}
