//! Collaborator traits: the user-state service and the event generator.
//!
//! The personality owns neither the game state nor the encounter content.
//! It reads and mutates users through a [`UserStateService`] and asks an
//! [`EventGenerator`] (the loremaster) for encounters. Both are injected at
//! construction; there is no process-wide connection.
//!
//! Methods return `impl Future + Send` so implementations can be plain
//! `async fn`s while the orchestrator stays generic and `Send`.

use std::future::Future;

use rowantree_types::{Action, ActionQueue, StoreSnapshot, StoreType, UserEvent, UserId};

/// Errors raised by a user-state service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service could not be reached or the call failed in transit.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service rejected a command.
    #[error("{action} rejected: {message}")]
    Rejected {
        /// Wire name of the rejected command.
        action: &'static str,
        /// Reason given by the service.
        message: String,
    },

    /// The requested user does not exist.
    #[error("unknown user {0}")]
    UnknownUser(UserId),
}

/// Errors raised by an event generator.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The generator could not be reached.
    #[error("loremaster transport error: {0}")]
    Transport(String),

    /// The generator answered with something that is not an event.
    #[error("loremaster returned a malformed event: {0}")]
    Malformed(String),
}

/// Backend state for users: reads, mutations, and notification delivery.
///
/// Every operation is assumed atomic and idempotent; retry and transport
/// policy belong to the implementation.
pub trait UserStateService: Send + Sync {
    /// Identifiers of all currently active users.
    fn active_users(&self) -> impl Future<Output = Result<Vec<UserId>, ServiceError>> + Send;

    /// A user's current population.
    fn user_population(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<i64, ServiceError>> + Send;

    /// A user's current store balances.
    fn user_stores(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<StoreSnapshot, ServiceError>> + Send;

    /// Apply a signed delta to a user's population.
    fn delta_population(
        &self,
        user: UserId,
        delta: i64,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Apply a signed delta to one of a user's stores.
    fn delta_store(
        &self,
        user: UserId,
        store: StoreType,
        delta: i64,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Deliver a notification payload to a user.
    fn notify(
        &self,
        user: UserId,
        payload: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Submit an action queue as one batch, preserving its order.
    ///
    /// The default applies each action through the primitives above and
    /// stops at the first failure. Backends with real transactions should
    /// override this to make the batch atomic.
    fn submit_action_queue(
        &self,
        queue: &ActionQueue,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send {
        async move {
            for action in queue {
                apply_action(self, action).await?;
            }
            Ok(())
        }
    }
}

/// Apply a single action through the primitive operations of `service`.
///
/// # Errors
///
/// Propagates the primitive's [`ServiceError`].
pub async fn apply_action<S>(service: &S, action: &Action) -> Result<(), ServiceError>
where
    S: UserStateService + ?Sized,
{
    match action {
        Action::DeltaPopulation { user, delta } => service.delta_population(*user, *delta).await,
        Action::DeltaStore { user, store, delta } => {
            service.delta_store(*user, *store, *delta).await
        }
        Action::Notify { user, payload } => service.notify(*user, payload).await,
    }
}

/// Source of encounters (the loremaster).
pub trait EventGenerator: Send + Sync {
    /// Produce an encounter scaled to `population`, or `None` to decline.
    fn generate_event(
        &self,
        population: i64,
    ) -> impl Future<Output = Result<Option<UserEvent>, GeneratorError>> + Send;
}
