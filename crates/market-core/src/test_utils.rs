//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::config::Tuning;
use crate::fixed::Ticks;
use crate::fixture::Fixture;
use crate::id::ItemKind;
use crate::input::InputVector;
use crate::math::Vec2;
use crate::world::World;

/// Growth time for test trees, long enough that nothing regrows mid-test
/// unless a test waits for it.
pub const TREE_GROWTH: Ticks = 120;

// ===========================================================================
// Tuning & worlds
// ===========================================================================

/// Default tuning with spawning switched off.
pub fn quiet_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.spawn.chance = 0.0;
    tuning
}

/// Default tuning that rolls a spawn every tick.
pub fn eager_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.spawn.chance = 1.0;
    tuning
}

/// A world with no fixtures and no spontaneous spawns.
pub fn empty_world() -> World {
    World::new(quiet_tuning()).expect("default tuning is valid")
}

/// The shipped layout: one banana tree, one shelf at (150, 200), one
/// register.
pub fn market_world(tuning: Tuning) -> World {
    let mut world = World::new(tuning).expect("tuning is valid");
    world.add_fixture(tree_at(Vec2::new(600.0, 200.0), 5));
    world.add_fixture(shelf_at(Vec2::new(150.0, 200.0), 0));
    world.add_fixture(Fixture::register(Vec2::new(150.0, 450.0)));
    world
}

// ===========================================================================
// Fixtures
// ===========================================================================

pub fn tree_at(position: Vec2, stock: u32) -> Fixture {
    Fixture::production(position, ItemKind::Banana, TREE_GROWTH, 5).with_stock(stock)
}

pub fn shelf_at(position: Vec2, stock: u32) -> Fixture {
    Fixture::storage(position, ItemKind::Banana, 10).with_stock(stock)
}

// ===========================================================================
// Driving
// ===========================================================================

pub fn idle() -> InputVector {
    InputVector::ZERO
}

/// Step until `done` holds or `max_ticks` have run. Returns the number of
/// ticks run.
pub fn run_until(world: &mut World, max_ticks: u64, mut done: impl FnMut(&World) -> bool) -> u64 {
    for tick in 0..max_ticks {
        if done(world) {
            return tick;
        }
        world.step(idle());
    }
    max_ticks
}

/// Step `n` times with the same input.
pub fn run_ticks(world: &mut World, n: u64, input: InputVector) {
    for _ in 0..n {
        world.step(input);
    }
}
