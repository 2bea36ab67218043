//! Property-based tests for the market core.
//!
//! Uses proptest to generate layouts, input streams, and command sequences,
//! then checks the invariants that must hold on every tick.

use std::sync::{Arc, Mutex};

use market_core::config::Tuning;
use market_core::customer::CustomerState;
use market_core::economy::UpgradeKind;
use market_core::event::{Event, EventKind};
use market_core::fixture::Fixture;
use market_core::id::ItemKind;
use market_core::input::InputVector;
use market_core::math::Vec2;
use market_core::money::DropDecay;
use market_core::persistence::SaveData;
use market_core::test_utils::*;
use market_core::world::World;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_input() -> impl Strategy<Value = InputVector> {
    prop_oneof![
        4 => (-1.0f32..=1.0, -1.0f32..=1.0).prop_map(|(x, y)| InputVector::new(x, y)),
        1 => Just(InputVector::new(f32::NAN, f32::INFINITY)),
        1 => (-1e20f32..1e20, -1e20f32..1e20).prop_map(|(x, y)| InputVector::new(x, y)),
    ]
}

fn arb_position() -> impl Strategy<Value = Vec2> {
    (0.0f32..800.0, 0.0f32..600.0).prop_map(|(x, y)| Vec2::new(x, y))
}

#[derive(Debug, Clone)]
enum FixtureSpec {
    Tree { at: Vec2, stock: u32, growth: u64 },
    Shelf { at: Vec2, stock: u32, max: u32 },
    Register { at: Vec2 },
}

fn arb_fixture() -> impl Strategy<Value = FixtureSpec> {
    prop_oneof![
        (arb_position(), 0..6u32, 1..200u64)
            .prop_map(|(at, stock, growth)| FixtureSpec::Tree { at, stock, growth }),
        (arb_position(), 0..10u32, 1..12u32)
            .prop_map(|(at, stock, max)| FixtureSpec::Shelf { at, stock, max }),
        arb_position().prop_map(|at| FixtureSpec::Register { at }),
    ]
}

fn build(tuning: Tuning, specs: &[FixtureSpec]) -> World {
    let mut world = World::new(tuning).unwrap();
    for spec in specs {
        let fixture = match *spec {
            FixtureSpec::Tree { at, stock, growth } => {
                Fixture::production(at, ItemKind::Banana, growth, 5).with_stock(stock)
            }
            FixtureSpec::Shelf { at, stock, max } => {
                Fixture::storage(at, ItemKind::Banana, max).with_stock(stock)
            }
            FixtureSpec::Register { at } => Fixture::register(at),
        };
        world.add_fixture(fixture);
    }
    world
}

fn arb_tuning() -> impl Strategy<Value = Tuning> {
    (any::<u64>(), 0.0f64..=0.2, prop::bool::ANY).prop_map(|(seed, chance, decays)| {
        let mut tuning = Tuning::default();
        tuning.rng_seed = seed;
        tuning.spawn.chance = chance;
        tuning.customer.patience = 120;
        tuning.drop_decay = if decays {
            DropDecay::After(90)
        } else {
            DropDecay::Never
        };
        tuning
    })
}

#[derive(Debug, Clone)]
enum Op {
    Step(InputVector),
    Purchase(UpgradeKind),
    Spawn,
    Teleport(Vec2),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            12 => arb_input().prop_map(Op::Step),
            1 => prop::sample::select(UpgradeKind::ALL.to_vec()).prop_map(Op::Purchase),
            1 => Just(Op::Spawn),
            1 => arb_position().prop_map(Op::Teleport),
        ],
        1..=max_ops,
    )
}

fn apply(world: &mut World, op: &Op) {
    match op {
        Op::Step(input) => {
            world.step(*input);
        }
        Op::Purchase(kind) => {
            let _ = world.purchase_upgrade(*kind);
        }
        Op::Spawn => {
            world.spawn_customer(None);
        }
        Op::Teleport(at) => world.teleport_player(*at),
    }
}

fn assert_invariants(world: &World) -> Result<(), TestCaseError> {
    let t = world.tuning();
    let p = world.player().position;
    prop_assert!(p.is_finite());
    prop_assert!(p.x >= t.bounds.min.x + t.player.radius && p.x <= t.bounds.max.x - t.player.radius);
    prop_assert!(p.y >= t.bounds.min.y + t.player.radius && p.y <= t.bounds.max.y - t.player.radius);
    prop_assert!(world.player().inventory.len() <= world.carry_limit() as usize);
    for (_, f) in world.fixtures() {
        prop_assert!(f.stock() <= f.max_stock());
    }
    for c in world.customers() {
        if matches!(c.state, CustomerState::Seeking | CustomerState::Transacting) {
            prop_assert!(world.fixture(c.target).is_some_and(Fixture::is_storage));
        }
    }
    Ok(())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Bounds, capacity, and target validity hold after every operation.
    #[test]
    fn invariants_hold_every_tick(
        tuning in arb_tuning(),
        specs in proptest::collection::vec(arb_fixture(), 0..6),
        ops in arb_ops(400),
    ) {
        let mut world = build(tuning, &specs);
        for op in &ops {
            apply(&mut world, op);
            assert_invariants(&world)?;
        }
    }

    /// Same seed, same layout, same inputs: same hash.
    #[test]
    fn deterministic_simulation(
        tuning in arb_tuning(),
        specs in proptest::collection::vec(arb_fixture(), 1..6),
        ops in arb_ops(300),
    ) {
        let mut a = build(tuning.clone(), &specs);
        let mut b = build(tuning, &specs);
        for op in &ops {
            apply(&mut a, op);
            apply(&mut b, op);
        }
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.snapshot(), b.snapshot());
    }

    /// A restored snapshot continues exactly like the original.
    #[test]
    fn snapshot_resumes_identically(
        tuning in arb_tuning(),
        specs in proptest::collection::vec(arb_fixture(), 1..6),
        before in arb_ops(150),
        after in arb_ops(150),
    ) {
        let mut world = build(tuning, &specs);
        for op in &before {
            apply(&mut world, op);
        }
        let data = world.serialize().expect("serialize should succeed");
        let mut restored = World::deserialize(&data).expect("deserialize should succeed");
        prop_assert_eq!(restored.state_hash(), world.state_hash());

        for op in &after {
            apply(&mut world, op);
            apply(&mut restored, op);
        }
        prop_assert_eq!(restored.state_hash(), world.state_hash());
    }

    /// With S bananas and N > S customers, exactly S sales happen and the
    /// rest give up.
    #[test]
    fn contention_sells_exactly_the_stock(stock in 0..4u32, extra in 1..4u32, patience in 1..200u64) {
        let mut tuning = quiet_tuning();
        tuning.customer.patience = patience;
        let mut world = World::new(tuning).unwrap();
        world.add_fixture(shelf_at(Vec2::new(150.0, 200.0), stock));
        let n = stock + extra;
        for _ in 0..n {
            prop_assert!(world.spawn_customer(None).is_some());
        }
        run_until(&mut world, 5_000, |w| w.customers().is_empty());
        prop_assert!(world.customers().is_empty());

        let bus = world.event_bus();
        prop_assert_eq!(bus.total_emitted(EventKind::SaleCompleted), stock as u64);
        prop_assert_eq!(bus.total_emitted(EventKind::SaleAbandoned), extra as u64);
        prop_assert_eq!(bus.total_emitted(EventKind::CustomerDespawned), n as u64);
        prop_assert_eq!(world.drops().len(), stock as usize);
    }

    /// Every coin a customer pays is on the floor, in the bank, or expired.
    #[test]
    fn money_is_conserved(
        tuning in arb_tuning(),
        ops in arb_ops(600),
    ) {
        let mut world = build(tuning, &[
            FixtureSpec::Tree { at: Vec2::new(600.0, 200.0), stock: 5, growth: 30 },
            FixtureSpec::Shelf { at: Vec2::new(150.0, 200.0), stock: 5, max: 10 },
        ]);
        let start = world.money();
        let totals = Arc::new(Mutex::new((0u64, 0u64, 0u64)));
        for kind in [EventKind::SaleCompleted, EventKind::DropExpired, EventKind::UpgradePurchased] {
            let sink = Arc::clone(&totals);
            world.on_passive(kind, Box::new(move |e: &Event| {
                let mut t = sink.lock().unwrap();
                match e {
                    Event::SaleCompleted { value, .. } => t.0 += value,
                    Event::DropExpired { value, .. } => t.1 += value,
                    Event::UpgradePurchased { cost, .. } => t.2 += cost,
                    _ => {}
                }
            }));
        }
        for op in &ops {
            apply(&mut world, op);
        }
        let (sold, expired, spent) = *totals.lock().unwrap();
        let on_floor: u64 = world.drops().iter().map(|d| d.value).sum();
        prop_assert_eq!(start + sold, world.money() + spent + on_floor + expired);
    }

    /// Any save blob leaves the world within its limits.
    #[test]
    fn arbitrary_blob_is_absorbed(blob in ".{0,200}") {
        let (save, _) = SaveData::from_blob(&blob);
        let mut world = empty_world();
        world.apply_save(&save);
        prop_assert!(world.player().inventory.len() <= world.carry_limit() as usize);
        world.step(idle());
        assert_invariants(&world)?;
    }
}
