//! Market Core -- the simulation engine for a small market-stall game.
//!
//! A player walks between fruit trees and shelves, harvesting and restocking.
//! Customers wander in, buy from the shelves, and leave money behind for the
//! player to pick up. This crate owns all of that: entities, the interaction
//! rules, the customer state machine, spawning, and the economy. It draws
//! nothing, plays no sound, and reads no files; hosts feed it one input
//! vector per tick and read back snapshots and events.
//!
//! # Tick Pipeline
//!
//! Each call to [`world::World::step`] runs these phases in order:
//!
//! 1. **Movement** -- Sanitize input, move the player, clamp to bounds.
//! 2. **Interaction** -- Harvest from trees or stock shelves within reach.
//! 3. **Production** -- Trees grow toward their next item.
//! 4. **Customers** -- Each customer advances its state machine.
//! 5. **Prune** -- Customers that walked off the edge are removed.
//! 6. **Spawn** -- One Bernoulli trial for a new arrival.
//! 7. **Collect** -- Money drops near the player are credited.
//! 8. **Decay** -- Uncollected drops age and may expire.
//! 9. **Post-tick** -- Buffered events reach their listeners.
//! 10. **Bookkeeping** -- Tick counter and state hash are updated.
//!
//! ```rust,ignore
//! let mut world = World::new(Tuning::default())?;
//! let shelf = world.add_fixture(Fixture::storage(Vec2::new(150.0, 200.0), ItemKind::Banana, 10));
//! world.step(InputVector::new(1.0, 0.0));
//! let frame = world.snapshot();
//! ```
//!
//! # Key Types
//!
//! - [`world::World`] -- Owns every entity and runs the pipeline.
//! - [`fixture::Fixture`] -- Production, Storage, or Register.
//! - [`customer::Customer`] -- Entering, Seeking, Transacting, Leaving.
//! - [`economy::Economy`] -- Money and upgrade levels.
//! - [`session::Session`] -- Start/pause/resume/purchase with autosave.
//! - [`event::EventBus`] -- Buffered feedback events for audio and effects.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod config;
pub mod customer;
pub mod economy;
pub mod event;
pub mod fixed;
pub mod fixture;
pub mod id;
pub mod input;
pub mod math;
pub mod money;
pub mod persistence;
pub mod player;
pub mod query;
pub mod replay;
pub mod rng;
pub mod serialize;
pub mod session;
pub mod sim;
pub mod spawner;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
