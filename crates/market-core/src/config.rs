//! World tuning.
//!
//! Every tunable constant of the simulation lives in [`Tuning`]. All fields
//! default to the values of the shipped game, so a partial config file only
//! needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::economy::UpgradeKind;
use crate::fixed::Ticks;
use crate::math::Vec2;
use crate::money::DropDecay;

/// Errors returned by [`Tuning::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("world bounds are empty: min {min:?}, max {max:?}")]
    EmptyBounds { min: Vec2, max: Vec2 },
}

/// Axis-aligned rectangle the player is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min: Vec2::new(0.0, 0.0),
            max: Vec2::new(800.0, 600.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// World units per tick at speed level 1.
    pub base_speed: f32,
    /// Half the body size. The player's centre stays this far inside bounds.
    pub radius: f32,
    /// Inputs at or below this magnitude leave `facing` unchanged.
    pub deadzone: f32,
    /// Items carried at capacity level 1.
    pub base_carry_limit: u32,
    /// Fixture interaction range (strict less-than).
    pub interaction_radius: f32,
    /// Money drop pickup range (strict less-than).
    pub pickup_radius: f32,
    pub start: Vec2,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            base_speed: 4.0,
            radius: 20.0,
            deadzone: 0.1,
            base_carry_limit: 5,
            interaction_radius: 60.0,
            pickup_radius: 40.0,
            start: Vec2::new(400.0, 300.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerTuning {
    /// Spawn x is `bounds.max.x + spawn_offset`.
    pub spawn_offset: f32,
    pub lane_y: f32,
    /// Entering customers switch to seeking once `x <= entry_waypoint_x`.
    pub entry_waypoint_x: f32,
    pub entry_speed: f32,
    /// Fraction of the remaining distance covered per seeking tick.
    pub approach_fraction: f32,
    pub capture_radius: f32,
    pub exit_speed: f32,
    /// Leaving customers are pruned once `x > bounds.max.x + despawn_margin`.
    pub despawn_margin: f32,
    /// Ticks a transacting customer waits on an empty shelf.
    pub patience: Ticks,
}

impl Default for CustomerTuning {
    fn default() -> Self {
        Self {
            spawn_offset: 50.0,
            lane_y: 400.0,
            entry_waypoint_x: 200.0,
            entry_speed: 2.0,
            approach_fraction: 0.05,
            capture_radius: 4.0,
            exit_speed: 2.0,
            despawn_margin: 100.0,
            patience: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Bernoulli probability per tick.
    pub chance: f64,
    pub max_customers: u32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            chance: 0.005,
            max_customers: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    /// Value of the money drop left by one sale.
    pub unit_price: u64,
    /// Speed multiplier gained per speed level above 1.
    pub speed_step: f32,
    pub speed_cost: u64,
    pub capacity_cost: u64,
    pub automation_cost: u64,
    pub max_level: u32,
}

impl EconomyTuning {
    /// Cost of the first purchase of `kind`; later levels scale linearly.
    pub fn base_cost(&self, kind: UpgradeKind) -> u64 {
        match kind {
            UpgradeKind::Speed => self.speed_cost,
            UpgradeKind::Capacity => self.capacity_cost,
            UpgradeKind::Automation => self.automation_cost,
        }
    }
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            unit_price: 10,
            speed_step: 0.2,
            speed_cost: 50,
            capacity_cost: 75,
            automation_cost: 120,
            max_level: 10,
        }
    }
}

/// Complete world configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub bounds: WorldBounds,
    pub player: PlayerTuning,
    pub customer: CustomerTuning,
    pub spawn: SpawnTuning,
    pub economy: EconomyTuning,
    pub drop_decay: DropDecay,
    pub rng_seed: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            bounds: WorldBounds::default(),
            player: PlayerTuning::default(),
            customer: CustomerTuning::default(),
            spawn: SpawnTuning::default(),
            economy: EconomyTuning::default(),
            drop_decay: DropDecay::Never,
            rng_seed: 0x4D4B_5431,
        }
    }
}

impl Tuning {
    /// Check every field for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.bounds;
        for (field, v) in [
            ("bounds.min.x", b.min.x),
            ("bounds.min.y", b.min.y),
            ("bounds.max.x", b.max.x),
            ("bounds.max.y", b.max.y),
        ] {
            finite(field, v)?;
        }
        if b.max.x <= b.min.x || b.max.y <= b.min.y {
            return Err(ConfigError::EmptyBounds {
                min: b.min,
                max: b.max,
            });
        }

        let p = &self.player;
        finite("player.start.x", p.start.x)?;
        finite("player.start.y", p.start.y)?;
        positive("player.base_speed", p.base_speed)?;
        non_negative("player.radius", p.radius)?;
        non_negative("player.deadzone", p.deadzone)?;
        positive("player.interaction_radius", p.interaction_radius)?;
        positive("player.pickup_radius", p.pickup_radius)?;
        if p.base_carry_limit == 0 {
            return Err(out_of_range("player.base_carry_limit", 0.0, ">= 1"));
        }

        let c = &self.customer;
        finite("customer.spawn_offset", c.spawn_offset)?;
        finite("customer.lane_y", c.lane_y)?;
        finite("customer.entry_waypoint_x", c.entry_waypoint_x)?;
        positive("customer.entry_speed", c.entry_speed)?;
        positive("customer.exit_speed", c.exit_speed)?;
        positive("customer.capture_radius", c.capture_radius)?;
        non_negative("customer.despawn_margin", c.despawn_margin)?;
        finite("customer.approach_fraction", c.approach_fraction)?;
        if !(c.approach_fraction > 0.0 && c.approach_fraction <= 1.0) {
            return Err(out_of_range(
                "customer.approach_fraction",
                c.approach_fraction as f64,
                "(0, 1]",
            ));
        }

        if !self.spawn.chance.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "spawn.chance",
            });
        }
        if !(0.0..=1.0).contains(&self.spawn.chance) {
            return Err(out_of_range("spawn.chance", self.spawn.chance, "[0, 1]"));
        }

        let e = &self.economy;
        non_negative("economy.speed_step", e.speed_step)?;
        if e.max_level == 0 {
            return Err(out_of_range("economy.max_level", 0.0, ">= 1"));
        }

        if let DropDecay::After(0) = self.drop_decay {
            return Err(out_of_range("drop_decay.after", 0.0, ">= 1"));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value,
        expected,
    }
}

fn finite(field: &'static str, v: f32) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn positive(field: &'static str, v: f32) -> Result<(), ConfigError> {
    finite(field, v)?;
    if v > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, v as f64, "> 0"))
    }
}

fn non_negative(field: &'static str, v: f32) -> Result<(), ConfigError> {
    finite(field, v)?;
    if v >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, v as f64, ">= 0"))
    }
}
