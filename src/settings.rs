//! Host-owned settings consumed by the trackers.
//!
//! Values are read at the moment they are needed, so a toggle in the host
//! takes effect on the next tick without restarting anything.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;

/// Setting keys understood by this crate.
pub mod keys {
    pub const LEAGUE_CLIENT_ENABLED: &str = "leagueClientEnabled";
    pub const AUTO_ACCEPT_ENABLED: &str = "autoAcceptEnabled";
    pub const AUTO_PICK_ENABLED: &str = "autoPickEnabled";
    pub const AUTO_PICK_FORCE: &str = "autoPickForce";
    pub const AUTO_PICK_CHAMPIONS: &str = "autoPickChampions";
    pub const AUTO_BAN_ENABLED: &str = "autoBanEnabled";
    pub const AUTO_BAN_FORCE: &str = "autoBanForce";
    pub const AUTO_BAN_CHAMPIONS: &str = "autoBanChampions";
    /// Seconds before the end of the draft phase at which smart apply may fire.
    pub const AUTO_APPLY_TRIGGER_TIME: &str = "autoApplyTriggerTime";
}

/// Bounds and default of [`keys::AUTO_APPLY_TRIGGER_TIME`], in seconds.
pub const MIN_TRIGGER_SECS: u64 = 5;
pub const MAX_TRIGGER_SECS: u64 = 30;
pub const DEFAULT_TRIGGER_SECS: u64 = 15;

/// A key-value settings store owned by the host.
pub trait SettingsStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);
}

/// In-memory [`SettingsStore`].
///
/// ```
/// use lcu_link::settings::{flag, keys, MemorySettings};
///
/// let settings = MemorySettings::new().with(keys::AUTO_ACCEPT_ENABLED, true);
/// assert!(flag(&settings, keys::AUTO_ACCEPT_ENABLED, false));
/// ```
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

// ── Typed readers ───────────────────────────────────────────────────

/// Boolean setting; anything that is not a JSON bool reads as `default`.
pub fn flag(store: &(impl SettingsStore + ?Sized), key: &str, default: bool) -> bool {
    store
        .get(key)
        .and_then(|value| value.as_bool())
        .unwrap_or(default)
}

/// Champion id list, preserving order. Numeric strings are accepted; zero,
/// negative and unparseable entries are dropped.
pub fn champion_list(store: &(impl SettingsStore + ?Sized), key: &str) -> Vec<i64> {
    let Some(Value::Array(entries)) = store.get(key) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|id| *id > 0)
        .collect()
}

/// Smart-apply trigger time, clamped to 5..=30 seconds (default 15).
pub fn trigger_time(store: &(impl SettingsStore + ?Sized)) -> Duration {
    let secs = store
        .get(keys::AUTO_APPLY_TRIGGER_TIME)
        .and_then(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|secs| secs.is_finite())
        .map(|secs| secs.clamp(MIN_TRIGGER_SECS as f64, MAX_TRIGGER_SECS as f64))
        .unwrap_or(DEFAULT_TRIGGER_SECS as f64);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flags_default_when_missing_or_mistyped() {
        let settings = MemorySettings::new().with(keys::AUTO_PICK_FORCE, "yes");
        assert!(flag(&settings, keys::LEAGUE_CLIENT_ENABLED, true));
        assert!(!flag(&settings, keys::AUTO_PICK_FORCE, false));
        settings.set(keys::AUTO_PICK_FORCE, json!(true));
        assert!(flag(&settings, keys::AUTO_PICK_FORCE, false));
    }

    #[test]
    fn champion_lists_accept_numeric_strings() {
        let settings =
            MemorySettings::new().with(keys::AUTO_PICK_CHAMPIONS, json!([157, "103", 0, "x", -1, 64]));
        assert_eq!(
            champion_list(&settings, keys::AUTO_PICK_CHAMPIONS),
            vec![157, 103, 64]
        );
        assert!(champion_list(&settings, keys::AUTO_BAN_CHAMPIONS).is_empty());
    }

    #[test]
    fn trigger_time_is_clamped() {
        let settings = MemorySettings::new();
        assert_eq!(trigger_time(&settings), Duration::from_secs(15));
        settings.set(keys::AUTO_APPLY_TRIGGER_TIME, json!(2));
        assert_eq!(trigger_time(&settings), Duration::from_secs(5));
        settings.set(keys::AUTO_APPLY_TRIGGER_TIME, json!(90));
        assert_eq!(trigger_time(&settings), Duration::from_secs(30));
        settings.set(keys::AUTO_APPLY_TRIGGER_TIME, json!("20"));
        assert_eq!(trigger_time(&settings), Duration::from_secs(20));
    }

    #[test]
    fn dyn_store_is_usable() {
        let settings: std::sync::Arc<dyn SettingsStore> =
            std::sync::Arc::new(MemorySettings::new().with(keys::AUTO_BAN_ENABLED, true));
        assert!(flag(settings.as_ref(), keys::AUTO_BAN_ENABLED, false));
    }
}
