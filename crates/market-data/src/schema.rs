//! Serde data file structs for scene layouts.
//!
//! A layout lists the fixtures placed in a scene. Entries are deserialized
//! from RON, JSON, or TOML and then resolved into core [`Fixture`]s by the
//! scene loader.

use std::path::Path;

use market_core::fixture::Fixture;
use market_core::id::ItemKind;
use market_core::math::Vec2;
use serde::Deserialize;

use crate::loader::DataLoadError;

fn default_max_stock() -> u32 {
    10
}

fn default_growth_ticks() -> u64 {
    120
}

/// The kind of a fixture in a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureType {
    Production,
    Storage,
    Register,
}

/// One fixture entry in a layout file.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureData {
    /// Unique within the layout. Hosts use it to find fixtures by name.
    pub label: String,
    pub kind: FixtureType,
    /// What a production source yields or a shelf holds. Required for both;
    /// ignored for registers.
    #[serde(default)]
    pub item: Option<ItemKind>,
    pub position: (f32, f32),
    #[serde(default = "default_max_stock")]
    pub max_stock: u32,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_growth_ticks")]
    pub growth_ticks: u64,
}

/// TOML wrapper: `[[fixtures]]` tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlLayout {
    pub fixtures: Vec<FixtureData>,
}

impl FixtureData {
    /// Resolve into a core fixture. `file` is only used for error context.
    pub fn to_fixture(&self, file: &Path) -> Result<Fixture, DataLoadError> {
        let (x, y) = self.position;
        if !x.is_finite() || !y.is_finite() {
            return Err(self.invalid(file, "position must be finite"));
        }
        let position = Vec2::new(x, y);

        let fixture = match self.kind {
            FixtureType::Production => {
                let item = self
                    .item
                    .ok_or_else(|| self.invalid(file, "production needs an item"))?;
                if self.growth_ticks == 0 {
                    return Err(self.invalid(file, "growth_ticks must be at least 1"));
                }
                Fixture::production(position, item, self.growth_ticks, self.max_stock)
            }
            FixtureType::Storage => {
                let item = self
                    .item
                    .ok_or_else(|| self.invalid(file, "storage needs an item"))?;
                Fixture::storage(position, item, self.max_stock)
            }
            FixtureType::Register => Fixture::register(position),
        };
        Ok(fixture.with_stock(self.stock))
    }

    fn invalid(&self, file: &Path, detail: &str) -> DataLoadError {
        DataLoadError::InvalidFixture {
            file: file.to_path_buf(),
            label: self.label.clone(),
            detail: detail.to_string(),
        }
    }
}
