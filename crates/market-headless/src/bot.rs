//! A scripted player: harvest, restock, sweep up money, buy upgrades.
//!
//! The bot only reads [`WorldSnapshot`]s, the same view a renderer gets, and
//! answers with one input vector per tick.

use market_core::economy::UpgradeKind;
use market_core::fixture::FixtureTag;
use market_core::input::InputVector;
use market_core::math::Vec2;
use market_core::query::{FixtureSnapshot, WorldSnapshot};

/// Stop steering once this close to a target; interaction picks it up.
const ARRIVE_DISTANCE: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    Harvest,
    Restock,
}

#[derive(Debug)]
pub struct Bot {
    goal: Goal,
    /// Purchase order, cycled.
    shopping: [UpgradeKind; 3],
    next_purchase: usize,
}

impl Default for Bot {
    fn default() -> Self {
        Self {
            goal: Goal::Harvest,
            shopping: [UpgradeKind::Capacity, UpgradeKind::Speed, UpgradeKind::Automation],
            next_purchase: 0,
        }
    }
}

impl Bot {
    /// Pick this tick's input.
    pub fn steer(&mut self, snap: &WorldSnapshot) -> InputVector {
        let player = &snap.player;
        let carrying = player.inventory.len() as u32;

        self.goal = match self.goal {
            Goal::Harvest if carrying >= player.carry_limit => Goal::Restock,
            Goal::Harvest if carrying > 0 && nearest_tree(snap).is_none() => Goal::Restock,
            Goal::Restock if carrying == 0 => Goal::Harvest,
            goal => goal,
        };

        // Money on the floor beats everything once the hands are empty.
        let target = if let Some(drop) = snap
            .drops
            .iter()
            .min_by(|a, b| distance_cmp(player.position, a.position, b.position))
            && carrying == 0
        {
            Some(drop.position)
        } else {
            match self.goal {
                Goal::Harvest => nearest_tree(snap).map(|f| f.position),
                Goal::Restock => nearest_shelf(snap).map(|f| f.position),
            }
        };

        match target {
            Some(target) => toward(player.position, target),
            None => InputVector::ZERO,
        }
    }

    /// The upgrade the bot is saving up for.
    pub fn shopping_item(&self) -> UpgradeKind {
        self.shopping[self.next_purchase % self.shopping.len()]
    }

    pub fn bought(&mut self) {
        self.next_purchase += 1;
    }
}

fn nearest_tree(snap: &WorldSnapshot) -> Option<&FixtureSnapshot> {
    let at = snap.player.position;
    snap.fixtures
        .iter()
        .filter(|f| f.tag == FixtureTag::Production && f.stock > 0)
        .min_by(|a, b| distance_cmp(at, a.position, b.position))
}

fn nearest_shelf(snap: &WorldSnapshot) -> Option<&FixtureSnapshot> {
    let at = snap.player.position;
    let top = snap.player.inventory.last().copied();
    snap.fixtures
        .iter()
        .filter(|f| f.tag == FixtureTag::Storage && f.item == top && f.stock < f.max_stock)
        .min_by(|a, b| distance_cmp(at, a.position, b.position))
}

fn distance_cmp(from: Vec2, a: Vec2, b: Vec2) -> std::cmp::Ordering {
    from.distance(a).total_cmp(&from.distance(b))
}

fn toward(from: Vec2, to: Vec2) -> InputVector {
    let delta = to - from;
    let len = delta.length();
    if len < ARRIVE_DISTANCE {
        return InputVector::ZERO;
    }
    InputVector::new(delta.x / len, delta.y / len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::fixture::Fixture;
    use market_core::id::ItemKind;
    use market_core::test_utils::*;

    #[test]
    fn heads_for_the_tree_first() {
        let mut world = empty_world();
        world.add_fixture(tree_at(Vec2::new(600.0, 300.0), 5));
        world.add_fixture(shelf_at(Vec2::new(150.0, 300.0), 0));
        let input = Bot::default().steer(&world.snapshot());
        assert!(input.x > 0.99);
    }

    #[test]
    fn full_hands_head_for_the_shelf() {
        let mut world = empty_world();
        world.add_fixture(tree_at(Vec2::new(600.0, 300.0), 5));
        world.add_fixture(Fixture::storage(Vec2::new(150.0, 300.0), ItemKind::Banana, 10));
        world.set_inventory(vec![ItemKind::Banana; 5]);
        let input = Bot::default().steer(&world.snapshot());
        assert!(input.x < -0.99);
    }

    #[test]
    fn bot_earns_money() {
        let mut world = market_world(eager_tuning());
        let mut bot = Bot::default();
        for _ in 0..6_000 {
            let input = bot.steer(&world.snapshot());
            world.step(input);
        }
        assert!(world.money() > 0);
    }
}
