//! Country entity - Geographic reference data.
//!
//! Countries are referenced by states, cities, user addresses, user residence
//! and every country field on a KYC application. The `accept_signup` and
//! `banned` flags decide whether new users may register from a country.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Country database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "countries")]
pub struct Model {
    /// Unique identifier for the country
    #[sea_orm(primary_key)]
    pub id: i64,
    /// English name of the country
    pub name: String,
    /// International dialing code (e.g. `"+49"`)
    pub phone_code: Option<String>,
    /// Official currency
    pub currency: Option<String>,
    /// Two-letter ISO 3166-1 code
    pub iso2: Option<String>,
    /// Name of the country in its own language
    pub native: Option<String>,
    /// When the record was created
    pub created_date: DateTimeUtc,
    /// When the record was last modified
    pub modified_date: DateTimeUtc,
    /// Whether users residing here may sign up
    pub accept_signup: bool,
    /// Whether the country is sanctioned/banned from the platform
    pub banned: bool,
}

/// Defines relationships between Country and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One country has many states/regions
    #[sea_orm(has_many = "super::state::Entity")]
    States,
    /// One country has many cities
    #[sea_orm(has_many = "super::city::Entity")]
    Cities,
}

impl Related<super::state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::States.def()
    }
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A country is open for registration when it accepts signups and is not banned.
    #[must_use]
    pub const fn is_open_for_signup(&self) -> bool {
        self.accept_signup && !self.banned
    }
}
