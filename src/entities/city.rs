//! City entity - Cities and locations, tied to both a country and a state.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// City database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "city_locations")]
pub struct Model {
    /// Unique identifier for the city
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the city
    pub name: String,
    /// ISO2 code of the country
    pub country_code: String,
    /// Code of the state, when the state has one
    pub state_code: Option<String>,
    /// When the record was created
    pub created_date: DateTimeUtc,
    /// When the record was last modified
    pub modified_date: DateTimeUtc,
    /// Country the city is in
    pub country_id: i64,
    /// State the city is in
    pub state_id: i64,
}

/// Defines relationships between City and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each city belongs to one country
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id",
        on_delete = "Restrict"
    )]
    Country,
    /// Each city belongs to one state
    #[sea_orm(
        belongs_to = "super::state::Entity",
        from = "Column::StateId",
        to = "super::state::Column::Id",
        on_delete = "Restrict"
    )]
    State,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl Related<super::state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::State.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
