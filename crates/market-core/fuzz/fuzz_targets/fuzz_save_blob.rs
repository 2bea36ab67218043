#![no_main]
use libfuzzer_sys::fuzz_target;
use market_core::persistence::SaveData;
use market_core::test_utils::*;

fuzz_target!(|data: &[u8]| {
    let Ok(blob) = std::str::from_utf8(data) else {
        return;
    };
    let (save, _) = SaveData::from_blob(blob);
    let mut world = empty_world();
    world.apply_save(&save);
    assert!(world.player().inventory.len() <= world.carry_limit() as usize);
    world.step(idle());

    // Whatever loaded must save and load back unchanged.
    let (again, report) = SaveData::from_blob(&world.save_data().to_blob());
    assert!(report.is_clean());
    assert_eq!(again, world.save_data());
});
