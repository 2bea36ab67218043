//! Replay recording and playback.
//!
//! A [`ReplayLog`] is a starting snapshot plus every command applied after
//! it. Playing it back reproduces the run bit for bit; hash checkpoints catch
//! the first command where a replay diverges.

use serde::{Deserialize, Serialize};

use crate::economy::UpgradeKind;
use crate::id::FixtureId;
use crate::input::InputVector;
use crate::math::Vec2;
use crate::serialize::{DeserializeError, SerializeError};
use crate::world::World;

/// A recordable world command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayCommand {
    Step { input: InputVector },
    Purchase { kind: UpgradeKind },
    SpawnCustomer { target: Option<FixtureId> },
    Teleport { position: Vec2 },
    Pause,
    Resume,
}

impl ReplayCommand {
    /// Apply to `world`. Rejected purchases are part of the recording and
    /// are rejected again on playback.
    pub fn apply(&self, world: &mut World) {
        match self {
            ReplayCommand::Step { input } => {
                world.step(*input);
            }
            ReplayCommand::Purchase { kind } => {
                let _ = world.purchase_upgrade(*kind);
            }
            ReplayCommand::SpawnCustomer { target } => {
                world.spawn_customer(*target);
            }
            ReplayCommand::Teleport { position } => world.teleport_player(*position),
            ReplayCommand::Pause => world.pause(),
            ReplayCommand::Resume => world.resume(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub command_index: usize,
    pub expected_hash: u64,
    pub actual_hash: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// World state before the first command.
    pub initial_snapshot: Vec<u8>,
    pub commands: Vec<ReplayCommand>,
    /// `(command_index, state_hash)` pairs checked during playback.
    pub hash_checkpoints: Vec<(usize, u64)>,
}

impl ReplayLog {
    /// Start recording from the world's current state.
    pub fn new(world: &World) -> Result<Self, SerializeError> {
        Ok(Self {
            initial_snapshot: world.serialize()?,
            commands: Vec::new(),
            hash_checkpoints: Vec::new(),
        })
    }

    pub fn record(&mut self, cmd: ReplayCommand) {
        self.commands.push(cmd);
    }

    /// Record a command along with the hash the world had after it ran.
    pub fn record_with_hash(&mut self, cmd: ReplayCommand, hash: u64) {
        self.hash_checkpoints.push((self.commands.len(), hash));
        self.commands.push(cmd);
    }

    /// Apply `cmd` to `world` and record it with the resulting hash.
    pub fn apply_and_record(&mut self, world: &mut World, cmd: ReplayCommand) {
        cmd.apply(world);
        self.record_with_hash(cmd, world.state_hash());
    }

    /// Replay this log from its initial snapshot, checking every checkpoint.
    pub fn play(&self) -> Result<ReplayResult, DeserializeError> {
        replay_and_verify(self)
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}

#[derive(Debug)]
pub struct ReplayResult {
    pub commands_executed: usize,
    pub is_verified: bool,
    pub first_mismatch: Option<ReplayMismatch>,
    /// The world after the last command.
    pub world: World,
}

/// Replay `log`, checking every hash checkpoint.
pub fn replay_and_verify(log: &ReplayLog) -> Result<ReplayResult, DeserializeError> {
    let mut world = World::deserialize(&log.initial_snapshot)?;
    let mut first_mismatch = None;
    let mut checkpoints = log.hash_checkpoints.iter().peekable();

    for (i, cmd) in log.commands.iter().enumerate() {
        cmd.apply(&mut world);
        while let Some(&&(index, expected_hash)) = checkpoints.peek() {
            if index != i {
                break;
            }
            checkpoints.next();
            let actual_hash = world.state_hash();
            if actual_hash != expected_hash && first_mismatch.is_none() {
                first_mismatch = Some(ReplayMismatch {
                    command_index: i,
                    expected_hash,
                    actual_hash,
                });
            }
        }
    }

    Ok(ReplayResult {
        commands_executed: log.commands.len(),
        is_verified: first_mismatch.is_none(),
        first_mismatch,
        world,
    })
}

/// Replay without verification.
pub fn replay(log: &ReplayLog) -> Result<World, DeserializeError> {
    let mut world = World::deserialize(&log.initial_snapshot)?;
    for cmd in &log.commands {
        cmd.apply(&mut world);
    }
    Ok(world)
}
