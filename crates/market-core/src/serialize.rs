//! Binary snapshots of a world via `bitcode`, with a versioned header and a
//! ring buffer for rewind.

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::config::{ConfigError, Tuning};
use crate::customer::Customer;
use crate::economy::Economy;
use crate::event::EventBus;
use crate::fixture::Fixture;
use crate::id::FixtureId;
use crate::money::MoneyDrop;
use crate::player::Player;
use crate::sim::SimState;
use crate::spawner::Spawner;
use crate::world::World;

/// Magic number identifying a market world snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x4D4B_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot carries invalid tuning: {0}")]
    InvalidTuning(#[from] ConfigError),
    #[error("snapshot state is inconsistent: {0}")]
    Inconsistent(&'static str),
}

/// Prepended to every snapshot so the format can be checked before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick at which the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Everything in a world except the event bus, which holds closures.
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshotData {
    header: SnapshotHeader,
    tuning: Tuning,
    fixtures: SlotMap<FixtureId, Fixture>,
    fixture_order: Vec<FixtureId>,
    player: Player,
    customers: Vec<Customer>,
    drops: Vec<MoneyDrop>,
    economy: Economy,
    spawner: Spawner,
    sim_state: SimState,
    paused: bool,
    last_state_hash: u64,
}

impl WorldSnapshotData {
    /// Reject states no sequence of ticks and commands can produce. Fixture
    /// stock is already clamped by `Fixture`'s own decoding.
    fn check(&self) -> Result<(), DeserializeError> {
        let mut listed = SecondaryMap::with_capacity(self.fixture_order.len());
        for &id in &self.fixture_order {
            if !self.fixtures.contains_key(id) {
                return Err(DeserializeError::Inconsistent("fixture order names a missing fixture"));
            }
            if listed.insert(id, ()).is_some() {
                return Err(DeserializeError::Inconsistent("fixture order lists a fixture twice"));
            }
        }
        if listed.len() != self.fixtures.len() {
            return Err(DeserializeError::Inconsistent("fixture order leaves out a fixture"));
        }

        let max_level = self.tuning.economy.max_level;
        let upgrades = &self.economy.upgrades;
        if [upgrades.speed, upgrades.capacity, upgrades.automation]
            .iter()
            .any(|&level| level == 0 || level > max_level)
        {
            return Err(DeserializeError::Inconsistent("upgrade level out of range"));
        }

        if !self.player.position.is_finite() {
            return Err(DeserializeError::Inconsistent("player position is not finite"));
        }
        let carry_limit = self.economy.carry_limit(self.tuning.player.base_carry_limit);
        if self.player.inventory.len() > carry_limit as usize {
            return Err(DeserializeError::Inconsistent("inventory exceeds the carry limit"));
        }
        Ok(())
    }
}

impl World {
    /// Encode the world. Listeners and suppression settings are not part of
    /// the snapshot.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let data = WorldSnapshotData {
            header: SnapshotHeader::new(self.sim_state.tick),
            tuning: self.tuning.clone(),
            fixtures: self.fixtures.clone(),
            fixture_order: self.fixture_order.clone(),
            player: self.player.clone(),
            customers: self.customers.clone(),
            drops: self.drops.clone(),
            economy: self.economy.clone(),
            spawner: self.spawner.clone(),
            sim_state: self.sim_state.clone(),
            paused: self.paused,
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&data).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a world. The event bus comes back empty; listeners must be
    /// registered again.
    ///
    /// Snapshots whose fixture order, upgrade levels, or inventory could not
    /// come from a running world are rejected as [`DeserializeError::Inconsistent`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let data: WorldSnapshotData =
            bitcode::deserialize(bytes).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        data.header.validate()?;
        data.tuning.validate()?;
        data.check()?;

        Ok(World {
            tuning: data.tuning,
            fixtures: data.fixtures,
            fixture_order: data.fixture_order,
            player: data.player,
            customers: data.customers,
            drops: data.drops,
            economy: data.economy,
            spawner: data.spawner,
            sim_state: data.sim_state,
            paused: data.paused,
            last_state_hash: data.last_state_hash,
            event_bus: EventBus::default(),
        })
    }

    /// Serialize into `buffer`, evicting the oldest entry if full.
    pub fn take_snapshot(&self, buffer: &mut SnapshotRingBuffer) -> Result<(), SerializeError> {
        let data = self.serialize()?;
        buffer.push(SnapshotEntry {
            tick: self.sim_state.tick,
            data,
        });
        Ok(())
    }

    /// Rebuild the world stored at `index` (0 = oldest). `Ok(None)` if the
    /// index is out of range.
    pub fn restore_snapshot(buffer: &SnapshotRingBuffer, index: usize) -> Result<Option<World>, DeserializeError> {
        let Some(entry) = buffer.get(index) else {
            return Ok(None);
        };
        World::deserialize(&entry.data).map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub tick: u64,
    pub data: Vec<u8>,
}

/// Fixed-capacity ring of serialized worlds. Full buffers evict the oldest.
#[derive(Debug)]
pub struct SnapshotRingBuffer {
    entries: Vec<Option<SnapshotEntry>>,
    head: usize,
    len: usize,
    total_taken: u64,
}

impl SnapshotRingBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_taken: 0,
        }
    }

    pub fn push(&mut self, entry: SnapshotEntry) {
        let capacity = self.capacity();
        self.entries[self.head] = Some(entry);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
        self.total_taken += 1;
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_taken(&self) -> u64 {
        self.total_taken
    }

    /// 0 = oldest, `len - 1` = newest.
    pub fn get(&self, index: usize) -> Option<&SnapshotEntry> {
        if index >= self.len {
            return None;
        }
        let start = if self.len < self.capacity() { 0 } else { self.head };
        self.entries[(start + index) % self.capacity()].as_ref()
    }

    pub fn latest(&self) -> Option<&SnapshotEntry> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
