// src/config/mod.rs

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, QualityConfig, RawConfigFile, StreamConfig};
pub use settings::{DEFAULT_GRACE_PERIOD, RecorderSettings, parse_duration};
