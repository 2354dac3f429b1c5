//! Staff permission entity - Grants a staff user one KYC workflow permission.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Permissions that gate the KYC review workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Verify KYC Application
    #[sea_orm(string_value = "verify_kyc")]
    VerifyKyc,
    /// Reject KYC Application
    #[sea_orm(string_value = "reject_kyc")]
    RejectKyc,
    /// Merge KYC data with user information
    #[sea_orm(string_value = "merge_kyc")]
    MergeKyc,
}

/// Staff permission database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_permissions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User holding the permission
    pub user_id: Uuid,
    /// The granted permission
    pub permission: Permission,
}

/// Defines relationships between `StaffPermission` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Permissions are removed together with their user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
