//! Configuration loaded from `pm.toml` in the base directory.

pub mod settings;

pub use settings::Settings;
