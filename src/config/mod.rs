/// Database configuration and connection management
pub mod database;

/// Seed data loading from config.toml
pub mod seed;

/// Server and storage settings from environment variables
pub mod settings;
