//! Static world objects: production sources, shelves, registers.
//!
//! A fixture's position and kind never change after construction. Only its
//! `stock` moves, and always within `0..=max_stock`.

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::id::ItemKind;
use crate::math::Vec2;

/// What a fixture does. Matched exhaustively wherever behavior differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixtureKind {
    /// Grows items over time; the player harvests them.
    Production {
        yields: ItemKind,
        progress: Ticks,
        growth_ticks: Ticks,
    },
    /// Accepts deposits of one item kind; customers buy from it.
    Storage { holds: ItemKind },
    /// Checkout counter. Present in the world but inert.
    Register,
}

/// Field-less mirror of [`FixtureKind`] for matching without borrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureTag {
    Production,
    Storage,
    Register,
}

impl FixtureKind {
    pub fn tag(&self) -> FixtureTag {
        match self {
            FixtureKind::Production { .. } => FixtureTag::Production,
            FixtureKind::Storage { .. } => FixtureTag::Storage,
            FixtureKind::Register => FixtureTag::Register,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FixtureRecord")]
pub struct Fixture {
    pub position: Vec2,
    pub kind: FixtureKind,
    stock: u32,
    max_stock: u32,
}

/// Wire form of a [`Fixture`]. Decoding goes through the same clamps as the
/// constructors, so a decoded fixture always has `stock <= max_stock` and
/// `max_stock >= 1`.
#[derive(Deserialize)]
struct FixtureRecord {
    position: Vec2,
    kind: FixtureKind,
    stock: u32,
    max_stock: u32,
}

impl TryFrom<FixtureRecord> for Fixture {
    type Error = &'static str;

    fn try_from(raw: FixtureRecord) -> Result<Self, Self::Error> {
        if !raw.position.is_finite() {
            return Err("fixture position must be finite");
        }
        let kind = match raw.kind {
            FixtureKind::Production {
                yields,
                progress,
                growth_ticks,
            } => {
                let growth_ticks = growth_ticks.max(1);
                FixtureKind::Production {
                    yields,
                    progress: progress.min(growth_ticks - 1),
                    growth_ticks,
                }
            }
            other => other,
        };
        Ok(Fixture::new(raw.position, kind, raw.max_stock).with_stock(raw.stock))
    }
}

impl Fixture {
    /// Build a fixture. `max_stock` is raised to at least 1.
    pub fn new(position: Vec2, kind: FixtureKind, max_stock: u32) -> Self {
        Self {
            position,
            kind,
            stock: 0,
            max_stock: max_stock.max(1),
        }
    }

    /// A production source, initially empty. `growth_ticks` of 0 is raised
    /// to 1.
    pub fn production(position: Vec2, yields: ItemKind, growth_ticks: Ticks, max_stock: u32) -> Self {
        Self::new(
            position,
            FixtureKind::Production {
                yields,
                progress: 0,
                growth_ticks: growth_ticks.max(1),
            },
            max_stock,
        )
    }

    pub fn storage(position: Vec2, holds: ItemKind, max_stock: u32) -> Self {
        Self::new(position, FixtureKind::Storage { holds }, max_stock)
    }

    pub fn register(position: Vec2) -> Self {
        Self::new(position, FixtureKind::Register, 1)
    }

    /// Set the initial stock, clamped to `max_stock`.
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock.min(self.max_stock);
        self
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn max_stock(&self) -> u32 {
        self.max_stock
    }

    pub fn is_full(&self) -> bool {
        self.stock >= self.max_stock
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.kind, FixtureKind::Storage { .. })
    }

    /// Advance growth by `delta` ticks. Production only.
    ///
    /// A full source holds its progress instead of accumulating it. At most
    /// one item is produced per call; overshoot is discarded.
    pub fn advance_production(&mut self, delta: Ticks) -> bool {
        let full = self.is_full();
        let FixtureKind::Production {
            progress,
            growth_ticks,
            ..
        } = &mut self.kind
        else {
            return false;
        };
        if full || delta == 0 {
            return false;
        }
        *progress = progress.saturating_add(delta);
        if *progress >= *growth_ticks {
            *progress = 0;
            self.stock += 1;
            true
        } else {
            false
        }
    }

    /// Move the top item of `stack` onto this shelf. Storage only.
    ///
    /// No-op unless there is room, the stack is non-empty, and the top item
    /// is the kind this shelf holds.
    pub fn deposit_from(&mut self, stack: &mut Vec<ItemKind>) -> Option<ItemKind> {
        let FixtureKind::Storage { holds } = self.kind else {
            return None;
        };
        if self.is_full() || stack.last() != Some(&holds) {
            return None;
        }
        let item = stack.pop()?;
        self.stock += 1;
        Some(item)
    }

    /// Remove one item. Returns false when already empty.
    pub fn take_one(&mut self) -> bool {
        if self.stock == 0 {
            return false;
        }
        self.stock -= 1;
        true
    }
}
