/// Administrator bootstrap from environment variables
pub mod bootstrap;

/// Database configuration and connection management
pub mod database;

/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, load_config, load_default_config};
