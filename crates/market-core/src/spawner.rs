//! Customer arrival policy.
//!
//! Each tick runs one Bernoulli trial. A success only becomes a customer if
//! the population is under the cap and some shelf exists to send them to.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::config::SpawnTuning;
use crate::fixed::probability;
use crate::fixture::Fixture;
use crate::id::{CustomerId, FixtureId};
use crate::rng::SimRng;

/// Outcome of one spawn evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision {
    /// The trial failed.
    Skipped,
    /// The trial succeeded but the population is at the cap.
    Capped,
    /// The trial succeeded but there is no storage fixture to target.
    Vetoed,
    Spawn(FixtureId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spawner {
    rng: SimRng,
    next_id: u64,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::new(seed),
            next_id: 0,
        }
    }

    /// Roll for an arrival.
    ///
    /// The trial is drawn every tick, even at the cap, so the random
    /// sequence depends only on the tick count.
    pub fn evaluate(
        &mut self,
        tuning: &SpawnTuning,
        population: usize,
        fixtures: &SlotMap<FixtureId, Fixture>,
        order: &[FixtureId],
    ) -> SpawnDecision {
        if !self.rng.chance(probability(tuning.chance)) {
            return SpawnDecision::Skipped;
        }
        if population >= tuning.max_customers as usize {
            return SpawnDecision::Capped;
        }
        match pick_target(fixtures, order) {
            Some(target) => SpawnDecision::Spawn(target),
            None => SpawnDecision::Vetoed,
        }
    }

    /// Hand out the next customer id.
    pub fn allocate_id(&mut self) -> CustomerId {
        let id = CustomerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.state()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}

/// First stocked storage fixture in `order`, else the first storage fixture.
pub fn pick_target(fixtures: &SlotMap<FixtureId, Fixture>, order: &[FixtureId]) -> Option<FixtureId> {
    storage_ids(fixtures, order)
        .find(|id| fixtures.get(*id).is_some_and(|f| f.stock() > 0))
        .or_else(|| storage_ids(fixtures, order).next())
}

fn storage_ids<'a>(
    fixtures: &'a SlotMap<FixtureId, Fixture>,
    order: &'a [FixtureId],
) -> impl Iterator<Item = FixtureId> + 'a {
    order
        .iter()
        .copied()
        .filter(move |id| fixtures.get(*id).is_some_and(Fixture::is_storage))
}
