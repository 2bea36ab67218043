#![no_main]
use libfuzzer_sys::fuzz_target;
use market_core::input::InputVector;
use market_core::world::World;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error or to a world that can step.
    if let Ok(mut world) = World::deserialize(data) {
        for _ in 0..8 {
            world.step(InputVector::new(1.0, -1.0));
        }
        let _ = world.snapshot();
    }
});
