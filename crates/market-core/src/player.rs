//! The player-controlled agent.

use serde::{Deserialize, Serialize};

use crate::config::{PlayerTuning, WorldBounds};
use crate::fixture::{Fixture, FixtureKind};
use crate::id::ItemKind;
use crate::input::InputVector;
use crate::math::Vec2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec2,
    /// Carried items. The last element is the top of the stack.
    pub inventory: Vec<ItemKind>,
    /// Heading in radians, updated only by inputs above the deadzone.
    pub facing: f32,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            inventory: Vec::new(),
            facing: 0.0,
        }
    }

    /// Move by one tick of input, then clamp into the playable area.
    ///
    /// The clamp runs unconditionally, so no input sequence can carry the
    /// player outside `[min + radius, max - radius]` on either axis.
    pub fn apply_input(
        &mut self,
        input: InputVector,
        speed_multiplier: f32,
        tuning: &PlayerTuning,
        bounds: &WorldBounds,
    ) {
        let input = input.sanitized();
        let multiplier = if !speed_multiplier.is_finite() {
            1.0
        } else {
            speed_multiplier.max(0.0)
        };
        let speed = tuning.base_speed * multiplier;
        self.position += Vec2::new(input.x, input.y) * speed;

        if input.magnitude() > tuning.deadzone {
            self.facing = input.y.atan2(input.x);
        }

        self.position.x = clamp_axis(
            self.position.x,
            bounds.min.x + tuning.radius,
            bounds.max.x - tuning.radius,
        );
        self.position.y = clamp_axis(
            self.position.y,
            bounds.min.y + tuning.radius,
            bounds.max.y - tuning.radius,
        );
    }

    /// Harvest one item from a production source within `radius`.
    pub fn try_collect(&mut self, fixture: &mut Fixture, radius: f32, carry_limit: u32) -> Option<ItemKind> {
        let FixtureKind::Production { yields, .. } = fixture.kind else {
            return None;
        };
        if self.position.distance(fixture.position) >= radius {
            return None;
        }
        if self.inventory.len() >= carry_limit as usize {
            return None;
        }
        if !fixture.take_one() {
            return None;
        }
        self.inventory.push(yields);
        Some(yields)
    }

    /// Deposit the top item onto a shelf within `radius`.
    pub fn try_deposit(&mut self, fixture: &mut Fixture, radius: f32) -> Option<ItemKind> {
        if self.position.distance(fixture.position) >= radius {
            return None;
        }
        fixture.deposit_from(&mut self.inventory)
    }
}

/// Clamp that tolerates a window narrower than the body (collapses to the
/// centre) and a NaN position (snaps to the lower edge).
fn clamp_axis(v: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        return (lo + hi) * 0.5;
    }
    // f32::max/min discard a NaN operand, unlike clamp.
    v.max(lo).min(hi)
}
