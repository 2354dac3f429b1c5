//! User entity - Platform accounts for borrowers, investors and staff.
//!
//! The email address is the login key and is unique across the table. Address
//! references point at rows in `user_addresses` owned by the same user. The
//! KYC flags on the user mirror the outcome of the latest reviewed
//! [`super::kyc_application`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// KYC standing of a user account
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(15))")]
#[serde(rename_all = "snake_case")]
pub enum UserKycStatus {
    /// No KYC submitted yet
    #[default]
    #[sea_orm(string_value = "unverified")]
    Unverified,
    /// KYC submitted and waiting for review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// KYC approved
    #[sea_orm(string_value = "verified")]
    Verified,
    /// Reviewer asked the user for more information
    #[sea_orm(string_value = "action_required")]
    ActionRequired,
    /// KYC withdrawn or cancelled
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// KYC refused
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Whether the account borrows or invests
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Takes out loans
    #[default]
    #[sea_orm(string_value = "borrower")]
    Borrower,
    /// Funds loans
    #[sea_orm(string_value = "investor")]
    Investor,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Login email, unique across all users
    #[sea_orm(unique)]
    pub email: String,
    /// Username, defaults to the email address
    pub username: String,
    /// Full display name
    pub name: String,
    /// Legal first and middle names
    pub first_name: Option<String>,
    /// Legal last names
    pub last_name: Option<String>,
    /// Address the user currently lives at
    pub current_address_id: Option<Uuid>,
    /// Permanent address of the user
    pub permanent_address_id: Option<Uuid>,
    /// Contact phone number
    pub contact_number: Option<String>,
    /// Date of birth
    pub date_of_birth: Option<Date>,
    /// Whether KYC has been completed
    pub kyc_complete: bool,
    /// When KYC was completed
    pub kyc_complete_date: Option<DateTimeUtc>,
    /// Current KYC standing
    pub kyc_status: UserKycStatus,
    /// Whether onboarding has been completed
    pub on_boarding_complete: bool,
    /// When onboarding was completed
    pub on_boarding_complete_date: Option<DateTimeUtc>,
    /// Whether the user has submitted a KYC application
    pub kyc_submitted: bool,
    /// Social security / national insurance number
    pub social_security_number: Option<String>,
    /// Place of birth
    pub place_of_birth: Option<String>,
    /// When the user was verified
    pub verification_date: Option<DateTimeUtc>,
    /// IP address the user registered from
    pub registered_ip_address: Option<String>,
    /// Country of residence; KYC rules of this country apply
    pub country_of_residence_id: Option<i64>,
    /// ISO 4217 code of the user's default currency
    pub default_currency: String,
    /// Job title
    pub job_title: Option<String>,
    /// Borrower or investor
    pub account_type: AccountType,
    /// Whether the user is platform staff
    pub is_staff: bool,
    /// Whether the account is active
    pub is_active: bool,
    /// When the account was created
    pub date_joined: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Country of residence; cleared when the country is deleted
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryOfResidenceId",
        to = "super::country::Column::Id",
        fk_name = "fk-users-country_of_residence_id",
        on_delete = "SetNull"
    )]
    CountryOfResidence,
    /// Current address reference
    #[sea_orm(
        belongs_to = "super::user_address::Entity",
        from = "Column::CurrentAddressId",
        to = "super::user_address::Column::Id",
        fk_name = "fk-users-current_address_id",
        on_delete = "Restrict"
    )]
    CurrentAddress,
    /// Permanent address reference
    #[sea_orm(
        belongs_to = "super::user_address::Entity",
        from = "Column::PermanentAddressId",
        to = "super::user_address::Column::Id",
        fk_name = "fk-users-permanent_address_id",
        on_delete = "Restrict"
    )]
    PermanentAddress,
    /// All addresses owned by the user
    #[sea_orm(has_many = "super::user_address::Entity")]
    Addresses,
    /// Staff permissions granted to the user
    #[sea_orm(has_many = "super::staff_permission::Entity")]
    Permissions,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CountryOfResidence.def()
    }
}

impl Related<super::user_address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl Related<super::staff_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
