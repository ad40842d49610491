//! Remote mutation commands submitted to the user-state service.
//!
//! An [`Action`] is one atomic state change (or one notification) with a
//! wire name and a positional argument list. An [`ActionQueue`] is the
//! ordered batch representing the full effect of a single encounter.
//!
//! On the wire an action is `{"name": ..., "arguments": [...]}` and a queue
//! is `{"queue": [...]}`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::enums::StoreType;
use crate::ids::UserId;

/// Wire name of the population delta command.
pub const DELTA_POPULATION: &str = "deltaUserPopulationByGUID";

/// Wire name of the store delta command.
pub const DELTA_STORE: &str = "deltaUserStoreByStoreNameByGUID";

/// Wire name of the notification command.
pub const SEND_NOTIFICATION: &str = "sendUserNotificationByGUID";

/// A single command for the user-state service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Apply a signed delta to a user's population.
    DeltaPopulation {
        /// Target user.
        user: UserId,
        /// Signed change.
        delta: i64,
    },
    /// Apply a signed delta to one of a user's stores.
    DeltaStore {
        /// Target user.
        user: UserId,
        /// Store to change.
        store: StoreType,
        /// Signed change.
        delta: i64,
    },
    /// Deliver a notification payload to a user.
    Notify {
        /// Recipient.
        user: UserId,
        /// Serialized payload (the resolved event as JSON).
        payload: String,
    },
}

impl Action {
    /// The command's wire name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeltaPopulation { .. } => DELTA_POPULATION,
            Self::DeltaStore { .. } => DELTA_STORE,
            Self::Notify { .. } => SEND_NOTIFICATION,
        }
    }

    /// The user this command targets.
    pub const fn user(&self) -> UserId {
        match self {
            Self::DeltaPopulation { user, .. }
            | Self::DeltaStore { user, .. }
            | Self::Notify { user, .. } => *user,
        }
    }

    /// Positional arguments, in the order the backend expects them.
    pub fn arguments(&self) -> Vec<Value> {
        match self {
            Self::DeltaPopulation { user, delta } => {
                vec![Value::from(user.to_string()), Value::from(*delta)]
            }
            Self::DeltaStore { user, store, delta } => vec![
                Value::from(user.to_string()),
                Value::from(store.as_str()),
                Value::from(*delta),
            ],
            Self::Notify { user, payload } => {
                vec![Value::from(user.to_string()), Value::from(payload.as_str())]
            }
        }
    }

    /// Whether this command mutates state (as opposed to notifying).
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Notify { .. })
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Action", 2)?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("arguments", &self.arguments())?;
        state.end()
    }
}

/// The ordered commands for one encounter.
///
/// Order is significant: mutations come first and the notification last,
/// so the payload always describes amounts already applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionQueue {
    /// Commands in submission order.
    pub queue: Vec<Action>,
}

impl ActionQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Append a command.
    pub fn push(&mut self, action: Action) {
        self.queue.push(action);
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue holds no commands.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterate over commands in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Action> {
        self.queue.iter()
    }

    /// The trailing notification, if the queue ends with one.
    pub fn notification(&self) -> Option<&str> {
        match self.queue.last() {
            Some(Action::Notify { payload, .. }) => Some(payload),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a ActionQueue {
    type Item = &'a Action;
    type IntoIter = core::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.queue.iter()
    }
}
