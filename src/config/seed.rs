//! Seed data loading from config.toml
//!
//! The seed file lists the countries (with nested states and cities) and the
//! team members to insert on first run. Seeding is idempotent: existing
//! countries are matched by ISO2 code and team members are only inserted into
//! an empty table.

use crate::{
    core::{location::NewCountry, team::NewTeamMember},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire seed file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Countries to seed
    #[serde(default)]
    pub countries: Vec<CountrySeed>,
    /// Team members to seed
    #[serde(default)]
    pub team_members: Vec<NewTeamMember>,
}

/// A seed country with its states
#[derive(Debug, Clone, Deserialize)]
pub struct CountrySeed {
    /// Country fields
    #[serde(flatten)]
    pub country: NewCountry,
    /// States of the country
    #[serde(default)]
    pub states: Vec<StateSeed>,
}

/// A seed state with its city names
#[derive(Debug, Clone, Deserialize)]
pub struct StateSeed {
    /// Name of the state
    pub name: String,
    /// State code
    pub iso2: Option<String>,
    /// Names of the cities in the state
    #[serde(default)]
    pub cities: Vec<String>,
}

/// Loads seed data from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses seed data from TOML text.
///
/// # Errors
/// Returns a configuration error if the TOML is invalid or incomplete.
pub fn parse_config(contents: &str) -> Result<SeedConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed file: {e}"),
    })
}
