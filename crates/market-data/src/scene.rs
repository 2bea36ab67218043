//! Scene loading: tuning plus fixture layout from a directory.
//!
//! A scene directory holds:
//!
//! - `layout.{ron,toml,json}` (required): the fixture list.
//! - `tuning.{ron,toml,json}` (optional): world tuning. Missing fields and a
//!   missing file both mean defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use market_core::config::Tuning;
use market_core::fixture::Fixture;
use market_core::id::FixtureId;
use market_core::world::World;
use tracing::{debug, info};

use crate::loader::{DataLoadError, check_duplicate, deserialize_file, deserialize_list, find_data_file, require_data_file};
use crate::schema::FixtureData;

/// A scene read from disk, validated and ready to build.
#[derive(Debug, Clone)]
pub struct Scene {
    pub tuning: Tuning,
    /// Fixtures in file order, each with its label.
    pub fixtures: Vec<(String, Fixture)>,
    /// Where the layout came from.
    pub layout_file: PathBuf,
}

/// A built world and the ids its labelled fixtures received.
#[derive(Debug)]
pub struct LoadedWorld {
    pub world: World,
    pub labels: HashMap<String, FixtureId>,
}

/// Read and validate the scene in `dir`.
pub fn load_scene(dir: &Path) -> Result<Scene, DataLoadError> {
    let tuning = match find_data_file(dir, "tuning")? {
        Some(path) => {
            let tuning: Tuning = deserialize_file(&path)?;
            tuning
                .validate()
                .map_err(|source| DataLoadError::InvalidTuning {
                    file: path.clone(),
                    source,
                })?;
            debug!(file = %path.display(), "loaded tuning");
            tuning
        }
        None => {
            debug!(dir = %dir.display(), "no tuning file, using defaults");
            Tuning::default()
        }
    };

    let layout_file = require_data_file(dir, "layout")?;
    let entries: Vec<FixtureData> = deserialize_list(&layout_file, "fixtures")?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut fixtures = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        check_duplicate(&seen, &entry.label, &layout_file)?;
        seen.insert(entry.label.clone(), index);
        fixtures.push((entry.label.clone(), entry.to_fixture(&layout_file)?));
    }

    info!(
        dir = %dir.display(),
        fixtures = fixtures.len(),
        seed = tuning.rng_seed,
        "scene loaded"
    );
    Ok(Scene {
        tuning,
        fixtures,
        layout_file,
    })
}

impl Scene {
    /// Build a fresh world with every fixture placed in file order.
    pub fn build_world(&self) -> Result<LoadedWorld, DataLoadError> {
        let mut world = World::new(self.tuning.clone()).map_err(|source| DataLoadError::InvalidTuning {
            file: self.layout_file.clone(),
            source,
        })?;
        let mut labels = HashMap::with_capacity(self.fixtures.len());
        for (label, fixture) in &self.fixtures {
            let id = world.add_fixture(fixture.clone());
            labels.insert(label.clone(), id);
        }
        Ok(LoadedWorld { world, labels })
    }
}
