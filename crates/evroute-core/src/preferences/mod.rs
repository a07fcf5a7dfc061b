//! Charging Preferences
//!
//! Two user preferences shape how routes are displayed:
//! - chargers the user chose to ignore, persisted as a JSON array of ids
//! - per-network preferences, persisted as a JSON object `{networkId: value}`
//!
//! A persisted value that fails to parse is treated as absent in full.

mod error;
mod store;

pub use error::PreferenceError;
pub use store::{MemorySettings, PropertiesSettings, SettingsStore};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Settings key holding the ignored-charger JSON array
pub const IGNORED_CHARGERS_KEY: &str = "ignored_chargers";

/// Settings key holding the network-preference JSON object
pub const NETWORK_PREFERENCES_KEY: &str = "network_preferences";

/// Largest id a double-precision JSON number represents exactly
const MAX_EXACT_ID: f64 = 9_007_199_254_740_992.0;

/// Bias for or against a charging network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NetworkPreference {
    /// Avoid the network
    Avoid,
    /// No preference
    #[default]
    DontCare,
    /// Prefer the network
    Prefer,
    /// Only use the network
    Exclusive,
    /// Prefer, and use only this network where possible
    PreferExclusive,
}

impl NetworkPreference {
    /// Persisted integer value
    pub fn value(self) -> i64 {
        match self {
            NetworkPreference::Avoid => -2,
            NetworkPreference::DontCare => 0,
            NetworkPreference::Prefer => 1,
            NetworkPreference::Exclusive => 2,
            NetworkPreference::PreferExclusive => 3,
        }
    }
}

impl TryFrom<i64> for NetworkPreference {
    type Error = PreferenceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -2 => Ok(NetworkPreference::Avoid),
            0 => Ok(NetworkPreference::DontCare),
            1 => Ok(NetworkPreference::Prefer),
            2 => Ok(NetworkPreference::Exclusive),
            3 => Ok(NetworkPreference::PreferExclusive),
            other => Err(PreferenceError::UnknownPreference(other)),
        }
    }
}

impl From<NetworkPreference> for i64 {
    fn from(p: NetworkPreference) -> Self {
        p.value()
    }
}

/// Network id → preference; `DontCare` is never stored
pub type NetworkPreferences = BTreeMap<u64, NetworkPreference>;

/// Charger id as carried by a JSON number
fn charger_id(value: &serde_json::Value) -> Result<u64, PreferenceError> {
    if let Some(id) = value.as_u64() {
        return Ok(id);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_ID => Ok(f as u64),
        _ => Err(PreferenceError::InvalidChargerId(value.to_string())),
    }
}

/// Strictly parse an ignored-charger JSON array
pub fn parse_ignored_chargers(json: &str) -> Result<BTreeSet<u64>, PreferenceError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    values.iter().map(charger_id).collect()
}

/// Parse an ignored-charger JSON array; malformed input yields an empty set
pub fn json_to_ignored_chargers(json: &str) -> BTreeSet<u64> {
    parse_ignored_chargers(json).unwrap_or_else(|e| {
        tracing::warn!("Discarding ignored chargers: {e}");
        BTreeSet::new()
    })
}

/// Serialize ignored charger ids as a JSON array
pub fn ignored_chargers_to_json(ids: &BTreeSet<u64>) -> String {
    serde_json::Value::from(ids.iter().copied().collect::<Vec<u64>>()).to_string()
}

/// Add `id` to a persisted ignored-charger array
pub fn add_ignored_charger_json(json: &str, id: u64) -> String {
    let mut ids = json_to_ignored_chargers(json);
    ids.insert(id);
    ignored_chargers_to_json(&ids)
}

/// Remove `id` from a persisted ignored-charger array
pub fn remove_ignored_charger_json(json: &str, id: u64) -> String {
    let mut ids = json_to_ignored_chargers(json);
    ids.remove(&id);
    ignored_chargers_to_json(&ids)
}

/// Quote bare numeric object keys (`{10:1}` → `{"10":1}`) written by older
/// lenient serializers
fn quote_bare_keys(json: &str) -> std::borrow::Cow<'_, str> {
    static BARE_KEY: OnceLock<Regex> = OnceLock::new();
    let re = BARE_KEY.get_or_init(|| Regex::new(r"([{,]\s*)(-?\d+)(\s*:)").expect("bare key pattern is valid"));
    re.replace_all(json, r#"$1"$2"$3"#)
}

/// Strictly parse a network-preference JSON object.
///
/// An id that is not a non-negative integer or a value outside the known
/// scale fails the whole object.
pub fn parse_network_preferences(json: &str) -> Result<NetworkPreferences, PreferenceError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&quote_bare_keys(json))?;

    let mut prefs = NetworkPreferences::new();
    for (key, value) in raw {
        let network_id: u64 = key
            .trim()
            .parse()
            .map_err(|_| PreferenceError::InvalidNetworkId(key.clone()))?;
        let value = value
            .as_i64()
            .ok_or_else(|| PreferenceError::InvalidPreferenceValue(value.to_string()))?;
        let pref = NetworkPreference::try_from(value)?;
        if pref != NetworkPreference::DontCare {
            prefs.insert(network_id, pref);
        }
    }
    Ok(prefs)
}

/// Parse a network-preference JSON object; malformed input yields an empty map
pub fn json_to_network_preferences(json: &str) -> NetworkPreferences {
    parse_network_preferences(json).unwrap_or_else(|e| {
        tracing::warn!("Discarding network preferences: {e}");
        NetworkPreferences::new()
    })
}

/// Serialize network preferences, leaving out `DontCare`
pub fn network_preferences_to_json(prefs: &NetworkPreferences) -> String {
    let object: serde_json::Map<String, serde_json::Value> = prefs
        .iter()
        .filter(|(_, p)| **p != NetworkPreference::DontCare)
        .map(|(id, p)| (id.to_string(), serde_json::Value::from(p.value())))
        .collect();
    serde_json::Value::Object(object).to_string()
}

/// Set one network's preference in a persisted object; `DontCare` removes
/// the key
pub fn set_network_preference_json(json: &str, network_id: u64, preference: NetworkPreference) -> String {
    let mut prefs = json_to_network_preferences(json);
    if preference == NetworkPreference::DontCare {
        prefs.remove(&network_id);
    } else {
        prefs.insert(network_id, preference);
    }
    network_preferences_to_json(&prefs)
}

/// Preferences backed by a [`SettingsStore`].
///
/// Every mutation re-reads the persisted JSON, rewrites it and persists it
/// before updating the cached values.
pub struct Preferences {
    store: Box<dyn SettingsStore>,
    ignored_chargers: BTreeSet<u64>,
    network_preferences: NetworkPreferences,
}

impl Preferences {
    /// Load preferences from `store`
    pub fn load(store: Box<dyn SettingsStore>) -> Self {
        let ignored_chargers = store
            .get(IGNORED_CHARGERS_KEY)
            .map(|json| json_to_ignored_chargers(&json))
            .unwrap_or_default();
        let network_preferences = store
            .get(NETWORK_PREFERENCES_KEY)
            .map(|json| json_to_network_preferences(&json))
            .unwrap_or_default();

        tracing::debug!(
            ignored = ignored_chargers.len(),
            networks = network_preferences.len(),
            "Preferences loaded"
        );

        Self {
            store,
            ignored_chargers,
            network_preferences,
        }
    }

    /// In-memory preferences
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemorySettings::new()))
    }

    /// Ignored charger ids
    pub fn ignored_chargers(&self) -> &BTreeSet<u64> {
        &self.ignored_chargers
    }

    /// All non-default network preferences
    pub fn network_preferences(&self) -> &NetworkPreferences {
        &self.network_preferences
    }

    /// Preference for one network
    pub fn network_preference(&self, network_id: u64) -> NetworkPreference {
        self.network_preferences
            .get(&network_id)
            .copied()
            .unwrap_or_default()
    }

    /// Ignore a charger
    pub fn add_ignored_charger(&mut self, id: u64) -> Result<(), PreferenceError> {
        self.rewrite_ignored(|json| add_ignored_charger_json(json, id))
    }

    /// Stop ignoring a charger
    pub fn remove_ignored_charger(&mut self, id: u64) -> Result<(), PreferenceError> {
        self.rewrite_ignored(|json| remove_ignored_charger_json(json, id))
    }

    /// Set a network preference
    pub fn set_network_preference(&mut self, network_id: u64, preference: NetworkPreference) -> Result<(), PreferenceError> {
        let current = self.store.get(NETWORK_PREFERENCES_KEY).unwrap_or_default();
        let updated = set_network_preference_json(&current, network_id, preference);
        self.store.set(NETWORK_PREFERENCES_KEY, &updated)?;
        self.network_preferences = json_to_network_preferences(&updated);
        Ok(())
    }

    fn rewrite_ignored(&mut self, rewrite: impl FnOnce(&str) -> String) -> Result<(), PreferenceError> {
        let current = self.store.get(IGNORED_CHARGERS_KEY).unwrap_or_default();
        let updated = rewrite(&current);
        self.store.set(IGNORED_CHARGERS_KEY, &updated)?;
        self.ignored_chargers = json_to_ignored_chargers(&updated);
        Ok(())
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences")
            .field("ignored_chargers", &self.ignored_chargers)
            .field("network_preferences", &self.network_preferences)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_ordering() {
        assert!(NetworkPreference::Avoid < NetworkPreference::DontCare);
        assert!(NetworkPreference::DontCare < NetworkPreference::Prefer);
        assert!(NetworkPreference::Prefer < NetworkPreference::Exclusive);
        assert!(NetworkPreference::Exclusive < NetworkPreference::PreferExclusive);
    }

    #[test]
    fn test_preference_values_round_trip() {
        for p in [
            NetworkPreference::Avoid,
            NetworkPreference::DontCare,
            NetworkPreference::Prefer,
            NetworkPreference::Exclusive,
            NetworkPreference::PreferExclusive,
        ] {
            assert_eq!(NetworkPreference::try_from(p.value()).unwrap(), p);
        }
        assert!(NetworkPreference::try_from(-1).is_err());
        assert!(NetworkPreference::try_from(4).is_err());
    }

    #[test]
    fn test_charger_id_accepts_integral_doubles() {
        assert_eq!(parse_ignored_chargers("[1.0, 2e3]").unwrap(), BTreeSet::from([1, 2000]));
        assert!(parse_ignored_chargers("[1.5]").is_err());
        assert!(parse_ignored_chargers("[-4]").is_err());
        assert!(parse_ignored_chargers("[\"7\"]").is_err());
    }

    #[test]
    fn test_quote_bare_keys_leaves_quoted_alone() {
        assert_eq!(quote_bare_keys(r#"{"10":1}"#), r#"{"10":1}"#);
        assert_eq!(quote_bare_keys("{10:1, 20 :-2}"), r#"{"10":1, "20" :-2}"#);
    }

    #[test]
    fn test_preferences_in_memory_mutations() {
        let mut prefs = Preferences::in_memory();
        prefs.add_ignored_charger(9).unwrap();
        prefs.set_network_preference(4, NetworkPreference::Avoid).unwrap();
        assert!(prefs.ignored_chargers().contains(&9));
        assert_eq!(prefs.network_preference(4), NetworkPreference::Avoid);
        assert_eq!(prefs.network_preference(5), NetworkPreference::DontCare);

        prefs.remove_ignored_charger(9).unwrap();
        prefs.set_network_preference(4, NetworkPreference::DontCare).unwrap();
        assert!(prefs.ignored_chargers().is_empty());
        assert!(prefs.network_preferences().is_empty());
    }
}
