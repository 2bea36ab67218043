//! Save blobs and the stores that hold them.
//!
//! The blob is a flat JSON object:
//!
//! ```json
//! {"money": 120, "upgrades": {"speed": 2, "capacity": 1, "automation": 1}, "inventory": ["banana"]}
//! ```
//!
//! Loading is a field-by-field merge over defaults. A field that is missing,
//! has the wrong type, or is out of range falls back to its default without
//! touching its neighbours, and a blob that is not an object at all yields a
//! fresh save. Loading never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::economy::{UpgradeKind, Upgrades};
use crate::id::ItemKind;

/// Key under which hosts store the blob.
pub const SAVE_KEY: &str = "market_save";

/// Upper bound on a legacy item count; the world trims to the carry limit.
const MAX_LEGACY_COUNT: u64 = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    pub money: u64,
    pub upgrades: Upgrades,
    /// Carried items, bottom of the stack first.
    pub inventory: Vec<ItemKind>,
}

/// Which fields fell back to defaults during a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub defaulted: Vec<&'static str>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.defaulted.is_empty()
    }

    fn fallback(&mut self, field: &'static str, reason: &str) {
        warn!(field, reason, "save field fell back to default");
        self.defaulted.push(field);
    }
}

impl SaveData {
    pub fn to_blob(&self) -> String {
        // Plain integers, strings, and a Vec: encoding cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Merge a blob over defaults. See the module docs for the rules.
    pub fn from_blob(blob: &str) -> (SaveData, LoadReport) {
        let mut report = LoadReport::default();
        let mut save = SaveData::default();

        let object = match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                report.fallback("*", "blob is not a JSON object");
                return (save, report);
            }
            Err(e) => {
                report.fallback("*", &e.to_string());
                return (save, report);
            }
        };

        match object.get("money") {
            None => report.fallback("money", "missing"),
            Some(v) => match read_money(v) {
                Some(money) => save.money = money,
                None => report.fallback("money", "not a non-negative number"),
            },
        }

        match object.get("upgrades") {
            None => report.fallback("upgrades", "missing"),
            Some(Value::Object(levels)) => {
                for kind in UpgradeKind::ALL {
                    read_level(levels, kind, &mut save.upgrades, &mut report);
                }
            }
            Some(_) => report.fallback("upgrades", "not an object"),
        }

        // Older saves called the carried stack "carrying".
        match object.get("inventory").or_else(|| object.get("carrying")) {
            None => report.fallback("inventory", "missing"),
            Some(Value::Array(items)) => {
                let before = items.len();
                save.inventory = items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<ItemKind>(v.clone()).ok())
                    .collect();
                if save.inventory.len() != before {
                    report.fallback("inventory", "unknown items skipped");
                }
            }
            // A bare count from older saves: that many bananas.
            Some(Value::Number(n)) => match n.as_u64() {
                Some(count) => {
                    save.inventory = vec![ItemKind::Banana; count.min(MAX_LEGACY_COUNT) as usize];
                }
                None => report.fallback("inventory", "not a count"),
            },
            Some(_) => report.fallback("inventory", "not an array"),
        }

        (save, report)
    }
}

fn read_money(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    if f.is_finite() && f >= 0.0 {
        // `as` saturates at u64::MAX.
        Some(f.floor() as u64)
    } else {
        None
    }
}

fn read_level(levels: &Map<String, Value>, kind: UpgradeKind, upgrades: &mut Upgrades, report: &mut LoadReport) {
    let (key, slot): (&'static str, &mut u32) = match kind {
        UpgradeKind::Speed => ("upgrades.speed", &mut upgrades.speed),
        UpgradeKind::Capacity => ("upgrades.capacity", &mut upgrades.capacity),
        UpgradeKind::Automation => ("upgrades.automation", &mut upgrades.automation),
    };
    let Some(v) = levels.get(&kind.to_string()) else {
        report.fallback(key, "missing");
        return;
    };
    match v.as_u64() {
        Some(level) if level >= 1 && level <= u32::MAX as u64 => *slot = level as u32,
        _ => report.fallback(key, "not a level >= 1"),
    }
}

/// Errors from a [`SaveStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("save store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where save blobs live between sessions.
pub trait SaveStore: Send + std::fmt::Debug {
    /// The stored blob, or `None` if nothing has been saved yet.
    fn load(&mut self) -> Result<Option<String>, StoreError>;

    fn store(&mut self, blob: &str) -> Result<(), StoreError>;
}

/// An in-memory store, for tests and hosts without storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blob: Option<String>,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            writes: 0,
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    /// Number of successful `store` calls.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl SaveStore for MemoryStore {
    fn load(&mut self) -> Result<Option<String>, StoreError> {
        Ok(self.blob.clone())
    }

    fn store(&mut self, blob: &str) -> Result<(), StoreError> {
        self.blob = Some(blob.to_owned());
        self.writes += 1;
        Ok(())
    }
}
