//! Data loading for the market simulation: scene tuning and fixture layouts
//! from RON, TOML, or JSON files, and a file-backed save store.

pub mod loader;
pub mod scene;
pub mod schema;
pub mod store;

pub use loader::DataLoadError;
pub use scene::{LoadedWorld, Scene, load_scene};
pub use store::FileStore;
