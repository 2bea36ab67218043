//! Collectible money left behind by completed sales.

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;
use crate::math::Vec2;

/// Lifetime policy for uncollected drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropDecay {
    /// Drops stay until collected.
    #[default]
    Never,
    /// Drops vanish after this many ticks.
    After(Ticks),
}

impl DropDecay {
    pub fn initial_life(self) -> Option<Ticks> {
        match self {
            DropDecay::Never => None,
            DropDecay::After(ticks) => Some(ticks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyDrop {
    pub position: Vec2,
    pub value: u64,
    /// `None` means the drop never expires.
    pub remaining_life: Option<Ticks>,
}

impl MoneyDrop {
    pub fn new(position: Vec2, value: u64, decay: DropDecay) -> Self {
        Self {
            position,
            value,
            remaining_life: decay.initial_life(),
        }
    }

    /// Count one tick down. Returns true once the drop has expired.
    pub fn tick_decay(&mut self) -> bool {
        match &mut self.remaining_life {
            None => false,
            Some(life) => {
                *life = life.saturating_sub(1);
                *life == 0
            }
        }
    }
}
