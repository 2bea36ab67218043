//! Read-only views for the render sink.
//!
//! Every snapshot type is an owned copy, so a renderer can hold one across
//! ticks without borrowing the world.

use crate::customer::CustomerState;
use crate::fixed::Ticks;
use crate::fixture::{FixtureKind, FixtureTag};
use crate::id::{CustomerId, FixtureId, ItemKind};
use crate::math::Vec2;
use crate::world::World;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec2,
    pub facing: f32,
    /// Bottom of the stack first.
    pub inventory: Vec<ItemKind>,
    pub carry_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureSnapshot {
    pub id: FixtureId,
    pub position: Vec2,
    pub tag: FixtureTag,
    /// The kind produced or held. `None` for registers.
    pub item: Option<ItemKind>,
    pub stock: u32,
    pub max_stock: u32,
    /// Growth toward the next item as a 0..1 fraction. Zero for
    /// non-production fixtures.
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub position: Vec2,
    pub state: CustomerState,
    pub target: FixtureId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropSnapshot {
    pub position: Vec2,
    pub value: u64,
}

/// Everything a frame needs to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: Ticks,
    pub paused: bool,
    pub money: u64,
    pub player: PlayerSnapshot,
    /// Stable fixture order.
    pub fixtures: Vec<FixtureSnapshot>,
    /// Spawn order.
    pub customers: Vec<CustomerSnapshot>,
    pub drops: Vec<DropSnapshot>,
}

impl World {
    /// Copy out the state a renderer needs. Never mutates the world.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick(),
            paused: self.is_paused(),
            money: self.money(),
            player: PlayerSnapshot {
                position: self.player.position,
                facing: self.player.facing,
                inventory: self.player.inventory.clone(),
                carry_limit: self.carry_limit(),
            },
            fixtures: self
                .fixtures()
                .map(|(id, f)| {
                    let (item, progress) = match f.kind {
                        FixtureKind::Production {
                            yields,
                            progress,
                            growth_ticks,
                        } => (Some(yields), progress as f32 / growth_ticks.max(1) as f32),
                        FixtureKind::Storage { holds } => (Some(holds), 0.0),
                        FixtureKind::Register => (None, 0.0),
                    };
                    FixtureSnapshot {
                        id,
                        position: f.position,
                        tag: f.kind.tag(),
                        item,
                        stock: f.stock(),
                        max_stock: f.max_stock(),
                        progress,
                    }
                })
                .collect(),
            customers: self
                .customers
                .iter()
                .map(|c| CustomerSnapshot {
                    id: c.id,
                    position: c.position,
                    state: c.state,
                    target: c.target,
                })
                .collect(),
            drops: self
                .drops
                .iter()
                .map(|d| DropSnapshot {
                    position: d.position,
                    value: d.value,
                })
                .collect(),
        }
    }
}
