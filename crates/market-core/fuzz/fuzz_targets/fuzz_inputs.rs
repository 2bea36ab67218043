#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use market_core::economy::UpgradeKind;
use market_core::input::InputVector;
use market_core::math::Vec2;
use market_core::test_utils::*;

/// A structured world operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Step { x: f32, y: f32 },
    Burst { ticks: u8, x: f32, y: f32 },
    Purchase { kind: u8 },
    Spawn,
    Teleport { x: f32, y: f32 },
    RemoveFixture { index: u8 },
    Pause,
    Resume,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: u64,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let mut tuning = eager_tuning();
    tuning.rng_seed = input.seed;
    let mut world = market_world(tuning);

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Step { x, y } => {
                world.step(InputVector::new(x, y));
            }
            FuzzOp::Burst { ticks, x, y } => {
                run_ticks(&mut world, u64::from(ticks % 32), InputVector::new(x, y));
            }
            FuzzOp::Purchase { kind } => {
                let kind = UpgradeKind::ALL[kind as usize % UpgradeKind::ALL.len()];
                let _ = world.purchase_upgrade(kind);
            }
            FuzzOp::Spawn => {
                world.spawn_customer(None);
            }
            FuzzOp::Teleport { x, y } => world.teleport_player(Vec2::new(x, y)),
            FuzzOp::RemoveFixture { index } => {
                let ids: Vec<_> = world.fixtures().map(|(id, _)| id).collect();
                if !ids.is_empty() {
                    world.remove_fixture(ids[index as usize % ids.len()]);
                }
            }
            FuzzOp::Pause => world.pause(),
            FuzzOp::Resume => world.resume(),
        }

        let p = world.player().position;
        assert!(p.is_finite());
        assert!(world.player().inventory.len() <= world.carry_limit() as usize);
        for (_, f) in world.fixtures() {
            assert!(f.stock() <= f.max_stock());
        }
    }
});
