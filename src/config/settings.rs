//! Runtime settings loaded from environment variables.
//!
//! `.env` is loaded by `main` before [`Settings::from_env`] runs, so values can
//! come from either the process environment or the `.env` file. Every setting
//! has a default suitable for local development.

use crate::errors::{Error, Result};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE_URL: &str = "sqlite://vigolend.sqlite?mode=rwc";
const DEFAULT_UPLOAD_ROOT: &str = "uploads";
const DEFAULT_SEED_CONFIG: &str = "config.toml";

/// Server, database and storage settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Interface the HTTP server binds to (`HOST`)
    pub host: String,
    /// Port the HTTP server binds to (`PORT`)
    pub port: u16,
    /// `SeaORM` connection URL (`DATABASE_URL`)
    pub database_url: String,
    /// Directory uploaded documents are stored under (`UPLOAD_ROOT`)
    pub upload_root: PathBuf,
    /// Path of the seed data file (`SEED_CONFIG`)
    pub seed_config: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// Returns a configuration error if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults.
    ///
    /// # Errors
    /// Returns a configuration error if `PORT` is not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| Error::Config {
                message: format!("Invalid PORT '{raw}': {e}"),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_root: lookup("UPLOAD_ROOT")
                .map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_ROOT), PathBuf::from),
            seed_config: lookup("SEED_CONFIG")
                .map_or_else(|| PathBuf::from(DEFAULT_SEED_CONFIG), PathBuf::from),
        })
    }

    /// `host:port` string for binding the HTTP server.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
