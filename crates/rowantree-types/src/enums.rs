//! Enumeration types for the Rowan Tree world.
//!
//! [`StoreType`] is the fixed set of resource stores a user can hold.
//! [`OutcomeKind`] is what an encounter can grant or take away: either
//! population or one of the stores.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Wire name of the population outcome.
pub const POPULATION: &str = "population";

/// Error returned when a string is not a known store or outcome name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown outcome kind: {0}")]
pub struct UnknownKind(pub String);

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// A named resource store held by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StoreType {
    /// Timber for building and burning.
    Wood,
    /// Quarried stone.
    Stone,
    /// Coal for smelting.
    Coal,
    /// Raw iron.
    Iron,
    /// Worked steel.
    Steel,
    /// Gold coin.
    Gold,
    /// Stored food.
    Food,
    /// Fresh water.
    Water,
    /// Animal furs.
    Fur,
    /// Tanned leather.
    Leather,
    /// Woven cloth.
    Cloth,
    /// Crystallized essence, the rare currency of the wilds.
    Essence,
}

impl StoreType {
    /// Every store, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Wood,
        Self::Stone,
        Self::Coal,
        Self::Iron,
        Self::Steel,
        Self::Gold,
        Self::Food,
        Self::Water,
        Self::Fur,
        Self::Leather,
        Self::Cloth,
        Self::Essence,
    ];

    /// The store's wire name, as used by the backend and in payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Coal => "coal",
            Self::Iron => "iron",
            Self::Steel => "steel",
            Self::Gold => "gold",
            Self::Food => "food",
            Self::Water => "water",
            Self::Fur => "fur",
            Self::Leather => "leather",
            Self::Cloth => "cloth",
            Self::Essence => "essence",
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreType {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|store| store.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The target of a reward or curse.
///
/// Serialized as a flat string (`"population"` or a store name) so that it
/// can key the reward and curse maps of an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutcomeKind {
    /// The user's population.
    Population,
    /// One of the user's resource stores.
    Store(StoreType),
}

impl OutcomeKind {
    /// The outcome's wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Population => POPULATION,
            Self::Store(store) => store.as_str(),
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == POPULATION {
            return Ok(Self::Population);
        }
        s.parse().map(Self::Store)
    }
}

impl TryFrom<String> for OutcomeKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutcomeKind> for String {
    fn from(kind: OutcomeKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl From<StoreType> for OutcomeKind {
    fn from(store: StoreType) -> Self {
        Self::Store(store)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn store_names_parse_back() {
        for store in StoreType::ALL {
            assert_eq!(store.as_str().parse::<StoreType>(), Ok(store));
        }
    }

    #[test]
    fn store_serde_matches_wire_name() {
        let json = serde_json::to_string(&StoreType::Gold).ok();
        assert_eq!(json.as_deref(), Some("\"gold\""));
    }

    #[test]
    fn population_is_not_a_store() {
        assert!("population".parse::<StoreType>().is_err());
        assert_eq!("population".parse::<OutcomeKind>(), Ok(OutcomeKind::Population));
    }

    #[test]
    fn unknown_outcome_is_rejected() {
        let err = "mana".parse::<OutcomeKind>();
        assert_eq!(err, Err(UnknownKind("mana".to_owned())));
    }

    #[test]
    fn outcome_kinds_key_json_maps() {
        let mut map = BTreeMap::new();
        map.insert(OutcomeKind::Population, 4_i64);
        map.insert(OutcomeKind::Store(StoreType::Wood), 2_i64);

        let json = serde_json::to_string(&map).ok();
        assert_eq!(json.as_deref(), Some(r#"{"population":4,"wood":2}"#));

        let restored: Result<BTreeMap<OutcomeKind, i64>, _> =
            serde_json::from_str(r#"{"population":4,"wood":2}"#);
        assert_eq!(restored.ok(), Some(map));
    }
}
