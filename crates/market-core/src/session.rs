//! The command surface a host drives: start, pause, resume, frame, purchase.
//!
//! A [`Session`] wraps a [`World`] and a [`SaveStore`]. It loads the save on
//! start, autosaves on a tick interval, and saves right after every
//! purchase.

use tracing::{debug, info, warn};

use crate::economy::{PurchaseError, UpgradeKind};
use crate::fixed::Ticks;
use crate::input::InputVector;
use crate::persistence::{LoadReport, SaveData, SaveStore, StoreError};
use crate::sim::AdvanceResult;
use crate::world::World;

/// Ticks between autosaves (ten seconds at 60 ticks per second).
pub const DEFAULT_AUTOSAVE_INTERVAL: Ticks = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Built but not started. The world does not tick.
    Idle,
    Running,
    Paused,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has not been started")]
    NotStarted,

    #[error(transparent)]
    Purchase(#[from] PurchaseError),
}

#[derive(Debug)]
pub struct Session<S: SaveStore> {
    world: World,
    store: S,
    state: SessionState,
    autosave_interval: Ticks,
    last_save_tick: Ticks,
    save_failures: u64,
}

impl<S: SaveStore> Session<S> {
    /// Wrap a world. The world is paused until [`Session::start`].
    pub fn new(mut world: World, store: S) -> Self {
        world.pause();
        let last_save_tick = world.tick();
        Self {
            world,
            store,
            state: SessionState::Idle,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            last_save_tick,
            save_failures: 0,
        }
    }

    /// Zero disables autosave.
    pub fn with_autosave_interval(mut self, ticks: Ticks) -> Self {
        self.autosave_interval = ticks;
        self
    }

    /// Load the save, apply it, and start ticking. Never fails: an
    /// unreadable store or blob means a fresh game.
    ///
    /// Calling this on a started session does nothing.
    pub fn start(&mut self) -> LoadReport {
        if self.state != SessionState::Idle {
            debug!(state = ?self.state, "start ignored: session already started");
            return LoadReport::default();
        }

        let (save, report) = match self.store.load() {
            Ok(Some(blob)) => SaveData::from_blob(&blob),
            Ok(None) => (SaveData::default(), LoadReport::default()),
            Err(e) => {
                warn!(error = %e, "save store unreadable, starting fresh");
                (SaveData::default(), LoadReport::default())
            }
        };
        self.world.apply_save(&save);
        self.world.resume();
        self.state = SessionState::Running;
        self.last_save_tick = self.world.tick();
        info!(
            money = self.world.money(),
            defaulted = report.defaulted.len(),
            "session started"
        );
        report
    }

    pub fn pause(&mut self) {
        if self.state == SessionState::Running {
            self.world.pause();
            self.state = SessionState::Paused;
            info!(tick = self.world.tick(), "session paused");
        }
    }

    pub fn resume(&mut self) {
        if self.state == SessionState::Paused {
            self.world.resume();
            self.state = SessionState::Running;
            info!(tick = self.world.tick(), "session resumed");
        }
    }

    /// Deliver one host frame. Runs the world only while running, then
    /// autosaves if the interval has elapsed.
    pub fn frame(&mut self, input: InputVector) -> AdvanceResult {
        if self.state != SessionState::Running {
            return AdvanceResult::default();
        }
        let result = self.world.step(input);
        if self.autosave_interval > 0
            && self.world.tick().saturating_sub(self.last_save_tick) >= self.autosave_interval
            && let Err(e) = self.save()
        {
            warn!(tick = self.world.tick(), error = %e, "autosave failed, retrying next interval");
        }
        result
    }

    /// Buy one level of `kind` and save straight away.
    ///
    /// The purchase stands even if the save fails; the failure is logged
    /// and counted in [`Session::save_failures`], and the next autosave
    /// writes the new level.
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u32, SessionError> {
        if self.state == SessionState::Idle {
            return Err(SessionError::NotStarted);
        }
        let level = self.world.purchase_upgrade(kind)?;
        if let Err(e) = self.save() {
            warn!(%kind, level, error = %e, "upgrade bought but not saved");
        }
        Ok(level)
    }

    /// Write the current save blob to the store.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let blob = self.world.save_data().to_blob();
        self.last_save_tick = self.world.tick();
        if let Err(e) = self.store.store(&blob) {
            self.save_failures += 1;
            return Err(e);
        }
        debug!(tick = self.world.tick(), bytes = blob.len(), "saved");
        Ok(())
    }

    /// Saves that did not reach the store.
    pub fn save_failures(&self) -> u64 {
        self.save_failures
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for scene setup and debugging tools.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
