//! Encounter events and the per-user store snapshot they are resolved
//! against.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;
use ts_rs::TS;

use crate::enums::{OutcomeKind, StoreType};

/// Current store balances for one user, keyed by store.
///
/// Read fresh at the start of every resolution and never cached.
pub type StoreSnapshot = BTreeMap<StoreType, i64>;

/// An encounter produced by the loremaster.
///
/// `reward` and `curse` map each outcome to an upper bound when the event
/// arrives, and to the amount actually applied once it has been resolved.
/// The resolved event is what the user receives as their notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UserEvent {
    /// Short headline for the encounter.
    #[serde(default)]
    pub title: String,

    /// Narrative lines shown to the user.
    #[serde(default)]
    pub text: Vec<String>,

    /// Positive outcomes.
    #[serde(default, deserialize_with = "lenient_outcomes")]
    #[ts(type = "Record<string, number>")]
    pub reward: BTreeMap<OutcomeKind, i64>,

    /// Negative outcomes, stored as positive magnitudes.
    #[serde(default, deserialize_with = "lenient_outcomes")]
    #[ts(type = "Record<string, number>")]
    pub curse: BTreeMap<OutcomeKind, i64>,
}

impl UserEvent {
    /// Create an event with a title and no outcomes.
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            ..Self::default()
        }
    }

    /// Add a reward bound.
    #[must_use]
    pub fn with_reward(mut self, kind: impl Into<OutcomeKind>, bound: i64) -> Self {
        self.reward.insert(kind.into(), bound);
        self
    }

    /// Add a curse bound.
    #[must_use]
    pub fn with_curse(mut self, kind: impl Into<OutcomeKind>, bound: i64) -> Self {
        self.curse.insert(kind.into(), bound);
        self
    }

    /// Whether the event has neither rewards nor curses.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty() && self.curse.is_empty()
    }
}

/// Deserialize an outcome map, treating anything unusable as empty.
///
/// `null` or a non-object value, an unknown outcome kind, or a bound that
/// is not an integer empties the whole map. The event itself still loads.
fn lenient_outcomes<'de, D>(deserializer: D) -> Result<BTreeMap<OutcomeKind, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or_else(BTreeMap::new, outcomes_from_value))
}

fn outcomes_from_value(value: &Value) -> BTreeMap<OutcomeKind, i64> {
    let Value::Object(entries) = value else {
        if !value.is_null() {
            warn!(found = %value, "outcome map is not an object, ignoring it");
        }
        return BTreeMap::new();
    };

    let mut outcomes = BTreeMap::new();
    for (name, bound) in entries {
        let Ok(kind) = name.parse::<OutcomeKind>() else {
            warn!(kind = %name, "unknown outcome kind, ignoring the whole map");
            return BTreeMap::new();
        };
        let Some(bound) = bound.as_i64() else {
            warn!(kind = %name, bound = %bound, "outcome bound is not an integer, ignoring the whole map");
            return BTreeMap::new();
        };
        outcomes.insert(kind, bound);
    }
    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_maps_default_to_empty() {
        let event: Result<UserEvent, _> = serde_json::from_str(r#"{"title":"Quiet night"}"#);
        let event = event.ok().unwrap_or_default();
        assert_eq!(event.title, "Quiet night");
        assert!(event.is_empty());
    }

    #[test]
    fn empty_object_is_a_valid_event() {
        let event: Result<UserEvent, _> = serde_json::from_str("{}");
        assert!(event.is_ok_and(|e| e.is_empty()));
    }

    #[test]
    fn parses_loremaster_payload() {
        let json = r#"{
            "title": "A wandering merchant",
            "text": ["A merchant shares a fire.", "They leave before dawn."],
            "reward": {"gold": 10, "population": 2},
            "curse": {"food": 3}
        }"#;
        let event: Result<UserEvent, _> = serde_json::from_str(json);
        let event = event.ok().unwrap_or_default();

        assert_eq!(event.text.len(), 2);
        assert_eq!(event.reward.get(&OutcomeKind::Store(StoreType::Gold)), Some(&10));
        assert_eq!(event.reward.get(&OutcomeKind::Population), Some(&2));
        assert_eq!(event.curse.get(&OutcomeKind::Store(StoreType::Food)), Some(&3));
    }

    #[test]
    fn null_outcome_map_is_empty() {
        let event: UserEvent =
            serde_json::from_str(r#"{"title":"x","reward":null,"curse":{"gold":3}}"#).unwrap();
        assert!(event.reward.is_empty());
        assert_eq!(event.curse.get(&OutcomeKind::Store(StoreType::Gold)), Some(&3));
    }

    #[test]
    fn unknown_kind_empties_only_its_map() {
        let event: UserEvent =
            serde_json::from_str(r#"{"reward":{"moonstone":2,"wood":4},"curse":{"gold":3}}"#)
                .unwrap();
        assert!(event.reward.is_empty());
        assert_eq!(event.curse.get(&OutcomeKind::Store(StoreType::Gold)), Some(&3));
    }

    #[test]
    fn non_map_and_non_integer_outcomes_are_empty() {
        let event: UserEvent =
            serde_json::from_str(r#"{"reward":[1,2],"curse":{"food":"lots"}}"#).unwrap();
        assert!(event.is_empty());
    }

    #[test]
    fn builder_inserts_bounds() {
        let event = UserEvent::titled("Storm")
            .with_reward(OutcomeKind::Population, 3)
            .with_curse(StoreType::Wood, 5);
        assert_eq!(event.reward.len(), 1);
        assert_eq!(event.curse.get(&OutcomeKind::Store(StoreType::Wood)), Some(&5));
    }
}
