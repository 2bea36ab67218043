use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a fixture (tree, shelf, register) in the world.
    ///
    /// Generational: a key whose fixture was removed never resolves again,
    /// even if the slot is reused.
    pub struct FixtureId;
}

/// Identifies a customer. Assigned from a monotonically increasing spawn
/// counter, so ordering by id is spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub u64);

/// A kind of item the player can carry and shelves can stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Banana,
    Coconut,
    Pineapple,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Banana => "banana",
            ItemKind::Coconut => "coconut",
            ItemKind::Pineapple => "pineapple",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
