//! In-memory collaborators for tests and local runs.
//!
//! [`InMemoryUserState`] holds every user's population and stores behind a
//! mutex, applies submitted queues atomically, and records what it was asked
//! to do so callers can inspect the effect of a tick. Submissions can be made
//! to fail for chosen users to exercise per-user failure handling.
//!
//! [`ScriptedLoremaster`] answers every request with the same event (or
//! none, or an error) and remembers the populations it was asked about.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rowantree_types::{Action, ActionQueue, StoreSnapshot, StoreType, UserEvent, UserId};

use crate::service::{EventGenerator, GeneratorError, ServiceError, UserStateService};

/// One user's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    /// Whether the user appears in the active list.
    pub active: bool,
    /// Current population.
    pub population: i64,
    /// Current store balances.
    pub stores: StoreSnapshot,
    /// Notification payloads delivered, oldest first.
    pub notifications: Vec<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, UserRecord>,
    failing: BTreeSet<UserId>,
    submitted: Vec<ActionQueue>,
    reads: u64,
}

/// Mutex-backed user-state service.
#[derive(Debug, Default)]
pub struct InMemoryUserState {
    state: Mutex<MemoryState>,
}

impl InMemoryUserState {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) an active user.
    pub fn insert_user(&self, user: UserId, population: i64, stores: StoreSnapshot) {
        self.lock().users.insert(
            user,
            UserRecord {
                active: true,
                population,
                stores,
                notifications: Vec::new(),
            },
        );
    }

    /// Mark a user active or inactive.
    pub fn set_active(&self, user: UserId, active: bool) {
        if let Some(record) = self.lock().users.get_mut(&user) {
            record.active = active;
        }
    }

    /// Make every future queue submission touching `user` fail.
    pub fn fail_submissions_for(&self, user: UserId) {
        self.lock().failing.insert(user);
    }

    /// Snapshot of one user's state.
    pub fn user(&self, user: UserId) -> Option<UserRecord> {
        self.lock().users.get(&user).cloned()
    }

    /// Every queue accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<ActionQueue> {
        self.lock().submitted.clone()
    }

    /// Number of population and store reads served.
    pub fn read_count(&self) -> u64 {
        self.lock().reads
    }

    fn read<T>(
        &self,
        user: UserId,
        f: impl FnOnce(&UserRecord) -> T,
    ) -> Result<T, ServiceError> {
        let mut state = self.lock();
        state.reads = state.reads.saturating_add(1);
        state
            .users
            .get(&user)
            .map(f)
            .ok_or(ServiceError::UnknownUser(user))
    }

    fn mutate(
        &self,
        user: UserId,
        f: impl FnOnce(&mut UserRecord),
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        let record = state
            .users
            .get_mut(&user)
            .ok_or(ServiceError::UnknownUser(user))?;
        f(record);
        Ok(())
    }
}

fn apply_to_record(record: &mut UserRecord, action: &Action) {
    match action {
        Action::DeltaPopulation { delta, .. } => {
            record.population = record.population.saturating_add(*delta);
        }
        Action::DeltaStore { store, delta, .. } => {
            let balance = record.stores.entry(*store).or_insert(0);
            *balance = balance.saturating_add(*delta);
        }
        Action::Notify { payload, .. } => record.notifications.push(payload.clone()),
    }
}

impl UserStateService for InMemoryUserState {
    async fn active_users(&self) -> Result<Vec<UserId>, ServiceError> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|(_, record)| record.active)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn user_population(&self, user: UserId) -> Result<i64, ServiceError> {
        self.read(user, |record| record.population)
    }

    async fn user_stores(&self, user: UserId) -> Result<StoreSnapshot, ServiceError> {
        self.read(user, |record| record.stores.clone())
    }

    async fn delta_population(&self, user: UserId, delta: i64) -> Result<(), ServiceError> {
        self.mutate(user, |record| {
            record.population = record.population.saturating_add(delta);
        })
    }

    async fn delta_store(
        &self,
        user: UserId,
        store: StoreType,
        delta: i64,
    ) -> Result<(), ServiceError> {
        self.mutate(user, |record| {
            let balance = record.stores.entry(store).or_insert(0);
            *balance = balance.saturating_add(delta);
        })
    }

    async fn notify(&self, user: UserId, payload: &str) -> Result<(), ServiceError> {
        self.mutate(user, |record| record.notifications.push(payload.to_owned()))
    }

    async fn submit_action_queue(&self, queue: &ActionQueue) -> Result<(), ServiceError> {
        let mut state = self.lock();

        // Validate the whole batch before touching anything.
        for action in queue {
            let user = action.user();
            if state.failing.contains(&user) {
                return Err(ServiceError::Transport(format!(
                    "simulated outage for user {user}"
                )));
            }
            if !state.users.contains_key(&user) {
                return Err(ServiceError::UnknownUser(user));
            }
        }

        for action in queue {
            if let Some(record) = state.users.get_mut(&action.user()) {
                apply_to_record(record, action);
            }
        }
        state.submitted.push(queue.clone());
        Ok(())
    }
}

/// Event generator with a fixed answer.
#[derive(Debug, Default)]
pub struct ScriptedLoremaster {
    event: Option<UserEvent>,
    fail: bool,
    requests: Mutex<Vec<i64>>,
}

impl ScriptedLoremaster {
    /// Answer every request with a copy of `event`.
    pub fn always(event: UserEvent) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    /// Decline every request.
    pub fn never() -> Self {
        Self::default()
    }

    /// Fail every request.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Populations passed to [`EventGenerator::generate_event`], in order.
    pub fn requests(&self) -> Vec<i64> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventGenerator for ScriptedLoremaster {
    async fn generate_event(&self, population: i64) -> Result<Option<UserEvent>, GeneratorError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(population);
        if self.fail {
            return Err(GeneratorError::Transport("scripted failure".to_owned()));
        }
        Ok(self.event.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stores(pairs: &[(StoreType, i64)]) -> StoreSnapshot {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn lists_only_active_users() {
        let service = InMemoryUserState::new();
        let a = UserId::new();
        let b = UserId::new();
        service.insert_user(a, 5, StoreSnapshot::new());
        service.insert_user(b, 5, StoreSnapshot::new());
        service.set_active(b, false);

        let active = service.active_users().await.unwrap();
        assert_eq!(active, vec![a]);
    }

    #[tokio::test]
    async fn reads_are_counted() {
        let service = InMemoryUserState::new();
        let user = UserId::new();
        service.insert_user(user, 7, stores(&[(StoreType::Gold, 3)]));

        assert_eq!(service.user_population(user).await.unwrap(), 7);
        assert_eq!(
            service.user_stores(user).await.unwrap().get(&StoreType::Gold),
            Some(&3)
        );
        assert_eq!(service.read_count(), 2);
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let service = InMemoryUserState::new();
        let err = service.user_population(UserId::new()).await;
        assert!(matches!(err, Err(ServiceError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn primitives_apply_deltas() {
        let service = InMemoryUserState::new();
        let user = UserId::new();
        service.insert_user(user, 10, stores(&[(StoreType::Wood, 4)]));

        service.delta_population(user, -3).await.unwrap();
        service.delta_store(user, StoreType::Wood, 2).await.unwrap();
        service.delta_store(user, StoreType::Stone, 1).await.unwrap();
        service.notify(user, "hello").await.unwrap();

        let record = service.user(user).unwrap();
        assert_eq!(record.population, 7);
        assert_eq!(record.stores.get(&StoreType::Wood), Some(&6));
        assert_eq!(record.stores.get(&StoreType::Stone), Some(&1));
        assert_eq!(record.notifications, vec!["hello".to_owned()]);
    }

    #[tokio::test]
    async fn queue_is_applied_in_order() {
        let service = InMemoryUserState::new();
        let user = UserId::new();
        service.insert_user(user, 1, StoreSnapshot::new());

        let mut queue = ActionQueue::new();
        queue.push(Action::DeltaPopulation { user, delta: 4 });
        queue.push(Action::Notify {
            user,
            payload: "{}".to_owned(),
        });
        service.submit_action_queue(&queue).await.unwrap();

        assert_eq!(service.user(user).unwrap().population, 5);
        assert_eq!(service.submitted(), vec![queue]);
    }

    #[tokio::test]
    async fn failing_user_rejects_whole_batch() {
        let service = InMemoryUserState::new();
        let user = UserId::new();
        service.insert_user(user, 1, StoreSnapshot::new());
        service.fail_submissions_for(user);

        let mut queue = ActionQueue::new();
        queue.push(Action::DeltaPopulation { user, delta: 4 });
        let result = service.submit_action_queue(&queue).await;

        assert!(matches!(result, Err(ServiceError::Transport(_))));
        assert_eq!(service.user(user).unwrap().population, 1);
        assert!(service.submitted().is_empty());
    }

    #[tokio::test]
    async fn scripted_loremaster_records_requests() {
        let lore = ScriptedLoremaster::always(UserEvent::titled("Fog"));
        let event = lore.generate_event(12).await.unwrap();
        assert_eq!(event.map(|e| e.title), Some("Fog".to_owned()));

        let _ = ScriptedLoremaster::never().generate_event(1).await.unwrap();
        assert!(ScriptedLoremaster::failing().generate_event(1).await.is_err());
        assert_eq!(lore.requests(), vec![12]);
    }
}
