//! Money, upgrade levels, and purchases.

use serde::{Deserialize, Serialize};

use crate::config::EconomyTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    /// Movement speed multiplier.
    Speed,
    /// Carry limit multiplier.
    Capacity,
    /// Production ticks per world tick.
    Automation,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [UpgradeKind::Speed, UpgradeKind::Capacity, UpgradeKind::Automation];
}

impl std::fmt::Display for UpgradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UpgradeKind::Speed => "speed",
            UpgradeKind::Capacity => "capacity",
            UpgradeKind::Automation => "automation",
        })
    }
}

/// Upgrade levels. Every level is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub speed: u32,
    pub capacity: u32,
    pub automation: u32,
}

impl Default for Upgrades {
    fn default() -> Self {
        Self {
            speed: 1,
            capacity: 1,
            automation: 1,
        }
    }
}

impl Upgrades {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Speed => self.speed,
            UpgradeKind::Capacity => self.capacity,
            UpgradeKind::Automation => self.automation,
        }
    }

    fn level_mut(&mut self, kind: UpgradeKind) -> &mut u32 {
        match kind {
            UpgradeKind::Speed => &mut self.speed,
            UpgradeKind::Capacity => &mut self.capacity,
            UpgradeKind::Automation => &mut self.automation,
        }
    }

    /// Raise any level below 1 to 1.
    pub fn normalized(mut self) -> Self {
        for kind in UpgradeKind::ALL {
            let level = self.level_mut(kind);
            *level = (*level).max(1);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("{kind} upgrade costs {cost}, only {money} available")]
    InsufficientFunds { kind: UpgradeKind, cost: u64, money: u64 },

    #[error("{kind} is already at max level {max}")]
    MaxLevel { kind: UpgradeKind, max: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Economy {
    pub money: u64,
    pub upgrades: Upgrades,
}

impl Economy {
    pub fn carry_limit(&self, base: u32) -> u32 {
        base.saturating_mul(self.upgrades.capacity.max(1))
    }

    pub fn speed_multiplier(&self, step: f32) -> f32 {
        1.0 + (self.upgrades.speed.max(1) - 1) as f32 * step
    }

    /// Production ticks credited to every source per world tick.
    pub fn production_delta(&self) -> u64 {
        self.upgrades.automation.max(1) as u64
    }

    /// Price of the next level of `kind`: base cost times current level.
    pub fn upgrade_cost(&self, kind: UpgradeKind, tuning: &EconomyTuning) -> u64 {
        tuning
            .base_cost(kind)
            .saturating_mul(self.upgrades.level(kind) as u64)
    }

    /// Spend money on one level of `kind`. Returns the new level.
    pub fn purchase(&mut self, kind: UpgradeKind, tuning: &EconomyTuning) -> Result<u32, PurchaseError> {
        let level = self.upgrades.level(kind);
        if level >= tuning.max_level {
            return Err(PurchaseError::MaxLevel {
                kind,
                max: tuning.max_level,
            });
        }
        let cost = self.upgrade_cost(kind, tuning);
        if self.money < cost {
            return Err(PurchaseError::InsufficientFunds {
                kind,
                cost,
                money: self.money,
            });
        }
        self.money -= cost;
        let slot = self.upgrades.level_mut(kind);
        *slot += 1;
        Ok(*slot)
    }

    pub fn credit(&mut self, amount: u64) {
        self.money = self.money.saturating_add(amount);
    }
}
