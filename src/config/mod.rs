/// Database configuration and connection management
pub mod database;

/// Agent seed loading from config.toml
pub mod seed;
