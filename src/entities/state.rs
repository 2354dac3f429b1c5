//! State entity - States and regions of a country.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// State/region database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "state_regions")]
pub struct Model {
    /// Unique identifier for the state
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the state or region
    pub name: String,
    /// ISO2 code of the owning country, denormalised for listings
    pub country_code: String,
    /// State code within the country
    pub iso2: Option<String>,
    /// When the record was created
    pub created_date: DateTimeUtc,
    /// When the record was last modified
    pub modified_date: DateTimeUtc,
    /// Owning country
    pub country_id: i64,
}

/// Defines relationships between State and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each state belongs to one country; the country cannot be deleted while states exist
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id",
        on_delete = "Restrict"
    )]
    Country,
    /// One state has many cities
    #[sea_orm(has_many = "super::city::Entity")]
    Cities,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
