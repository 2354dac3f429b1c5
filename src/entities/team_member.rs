//! Team member entity - People shown on the about/team pages.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Team member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_members")]
pub struct Model {
    /// Unique identifier for the team member
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// When the record was created; listings follow this order
    pub created_date: DateTimeUtc,
    /// When the record was last modified
    pub modified_date: DateTimeUtc,
    /// Display name
    pub name: String,
    /// Role or job title
    pub designation: String,
    /// Facebook profile URL
    pub facebook: Option<String>,
    /// Twitter handle
    pub twitter: String,
    /// Path of the uploaded photo
    pub photo: String,
}

/// Team members have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
