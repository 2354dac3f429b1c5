//! User address entity - Postal addresses owned by exactly one user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What an address is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(9))")]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    /// Where the user lives now
    #[sea_orm(string_value = "current")]
    Current,
    /// Permanent/registered address
    #[sea_orm(string_value = "permanent")]
    Permanent,
}

/// User address database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_addresses")]
pub struct Model {
    /// Unique identifier for the address
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owner of the address
    pub user_id: Uuid,
    /// First address line
    pub address_line_1: String,
    /// Second address line
    pub address_line_2: Option<String>,
    /// State or region, free text
    pub state: String,
    /// City, free text
    pub city: String,
    /// Zip or postal code
    pub zip_post_code: String,
    /// Current or permanent, when known
    pub address_type: Option<AddressType>,
    /// Country of the address
    pub country_id: i64,
}

/// Defines relationships between `UserAddress` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each address belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    User,
    /// Each address is in one country; the country cannot be deleted while referenced
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id",
        on_delete = "Restrict"
    )]
    Country,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
