//! Autonomous customers.
//!
//! A customer walks in along a fixed lane, homes in on its target shelf,
//! buys one item (or gives up after its patience runs out), and walks off
//! the right edge. States only move forward:
//!
//! ```text
//! Entering -> Seeking -> Transacting -> Leaving
//! ```
//!
//! A Seeking or Transacting customer whose target disappears may also go
//! straight to Leaving.

use serde::{Deserialize, Serialize};

use crate::config::CustomerTuning;
use crate::fixed::Ticks;
use crate::fixture::Fixture;
use crate::id::{CustomerId, FixtureId};
use crate::math::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerState {
    Entering,
    Seeking,
    Transacting,
    Leaving { purchased: bool },
}

/// What one `advance` call did, for the world to turn into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerStep {
    Moved,
    BeganSeeking,
    BeganTransacting,
    Purchased,
    Waiting,
    Abandoned,
    /// The target fixture is gone. The world decides what happens next.
    TargetLost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub position: Vec2,
    pub state: CustomerState,
    pub target: FixtureId,
    pub patience_remaining: Ticks,
}

impl Customer {
    /// A new customer at the lane entrance just past the right edge.
    pub fn spawn(id: CustomerId, target: FixtureId, world_max_x: f32, tuning: &CustomerTuning) -> Self {
        Self {
            id,
            position: Vec2::new(world_max_x + tuning.spawn_offset, tuning.lane_y),
            state: CustomerState::Entering,
            target,
            patience_remaining: tuning.patience,
        }
    }

    /// Run one tick of the state machine.
    ///
    /// `fixture` is the resolved target, or `None` if the key went stale.
    /// Entering and Leaving customers do not need their target.
    pub fn advance(&mut self, fixture: Option<&mut Fixture>, tuning: &CustomerTuning) -> CustomerStep {
        match self.state {
            CustomerState::Entering => {
                self.position.x -= tuning.entry_speed;
                if self.position.x <= tuning.entry_waypoint_x {
                    self.state = CustomerState::Seeking;
                    CustomerStep::BeganSeeking
                } else {
                    CustomerStep::Moved
                }
            }
            CustomerState::Seeking => {
                let Some(fixture) = fixture else {
                    return CustomerStep::TargetLost;
                };
                self.position = self.position.approach(fixture.position, tuning.approach_fraction);
                if self.position.distance(fixture.position) <= tuning.capture_radius {
                    self.state = CustomerState::Transacting;
                    CustomerStep::BeganTransacting
                } else {
                    CustomerStep::Moved
                }
            }
            CustomerState::Transacting => {
                let Some(fixture) = fixture else {
                    return CustomerStep::TargetLost;
                };
                if fixture.take_one() {
                    self.state = CustomerState::Leaving { purchased: true };
                    return CustomerStep::Purchased;
                }
                self.patience_remaining = self.patience_remaining.saturating_sub(1);
                if self.patience_remaining == 0 {
                    self.state = CustomerState::Leaving { purchased: false };
                    CustomerStep::Abandoned
                } else {
                    CustomerStep::Waiting
                }
            }
            CustomerState::Leaving { .. } => {
                self.position.x += tuning.exit_speed;
                CustomerStep::Moved
            }
        }
    }

    /// Give up on the current target and walk out without buying.
    pub fn leave_empty_handed(&mut self) {
        self.state = CustomerState::Leaving { purchased: false };
    }

    /// Swap to a new target. Transacting customers go back to walking.
    pub fn retarget(&mut self, target: FixtureId) {
        self.target = target;
        if self.state == CustomerState::Transacting {
            self.state = CustomerState::Seeking;
        }
    }

    /// Whether this customer has walked past the despawn line.
    pub fn has_departed(&self, threshold_x: f32) -> bool {
        matches!(self.state, CustomerState::Leaving { .. }) && self.position.x > threshold_x
    }
}
