//! KYC application entity - Know-Your-Customer compliance records.
//!
//! An application captures a user's legal identity, address, identification
//! document and uploaded evidence, together with the review metadata written
//! by the staff member who processed it. Uploaded files are stored through
//! [`crate::storage::DocumentStore`]; the model only keeps their relative paths.

use chrono::{NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// Average number of days per year used for age derivation
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Review status of a KYC application
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(28))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KycStatus {
    /// Approved by a reviewer
    #[sea_orm(string_value = "verified")]
    Verified,
    /// Not yet submitted for review
    #[sea_orm(string_value = "unverified")]
    Unverified,
    /// Waiting for review
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Refused by a reviewer
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Withdrawn or cancelled
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Reviewer asked the applicant for more information
    #[sea_orm(string_value = "action_required")]
    ActionRequired,
}

impl KycStatus {
    /// Terminal statuses cannot be reviewed again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected | Self::Cancelled)
    }

    /// Whether a reviewer may move an application from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        !self.is_terminal()
            && matches!(
                next,
                Self::Verified | Self::Rejected | Self::Cancelled | Self::ActionRequired
            )
    }

    /// Wire/database name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Kind of photo identification document
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(21))")]
#[serde(rename_all = "snake_case")]
pub enum IdentificationType {
    /// National ID card
    #[default]
    #[sea_orm(string_value = "national_id")]
    NationalId,
    /// Passport
    #[sea_orm(string_value = "passport")]
    Passport,
    /// Driver's license
    #[sea_orm(string_value = "drivers_license")]
    DriversLicense,
}

/// Kind of proof-of-address document
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(21))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressProofType {
    /// Bank statement
    #[default]
    #[sea_orm(string_value = "BANK_STATEMENT")]
    BankStatement,
    /// Credit card statement
    #[sea_orm(string_value = "CREDIT_CARD_STATEMENT")]
    CreditCardStatement,
    /// Utility bill
    #[sea_orm(string_value = "UTILITY")]
    Utility,
}

/// Politically exposed person declaration
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PepStatus {
    /// "Yes, I'm politically exposed"
    #[sea_orm(string_value = "pep")]
    Pep,
    /// "No, I'm not politically exposed"
    #[default]
    #[sea_orm(string_value = "non_pep")]
    NonPep,
}

/// Reason code recorded when an application is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(34))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalCode {
    /// Document expired
    #[sea_orm(string_value = "EXPIRED_DOCUMENT")]
    ExpiredDocument,
    /// Document does not match user data
    #[sea_orm(string_value = "DOCUMENT_DOES_NOT_MATCH_USER_DATA")]
    DocumentDoesNotMatchUserData,
}

/// KYC application database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "kyc_applications")]
pub struct Model {
    /// Unique identifier for the application
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// When the record was created
    pub created_date: DateTimeUtc,
    /// When the record was last modified
    pub modified_date: DateTimeUtc,
    /// Legal first and middle names as on the ID document
    pub legal_first_names: Option<String>,
    /// Legal last names as on the ID document
    pub legal_last_names: Option<String>,
    /// Date of birth
    pub birth_date: Option<Date>,
    /// Contact email given on the application
    pub email: String,
    /// Address line 1
    pub address_line_1: String,
    /// Address line 2
    pub address_line_2: Option<String>,
    /// State or region
    pub state: String,
    /// Zip or postal code
    pub zip_code: String,
    /// City
    pub city: String,
    /// Kind of photo ID provided
    pub identification_type: IdentificationType,
    /// Kind of proof of address provided
    pub address_proof_type: AddressProofType,
    /// Stored path of the proof-of-address document
    pub proof_of_address_document: String,
    /// Stored path of the photo ID (front)
    pub photo_id: String,
    /// Stored path of the photo ID (back)
    pub photo_id_back: Option<String>,
    /// Stored path of the selfie holding the ID
    pub selfie_with_id: Option<String>,
    /// Review status
    pub kyc_status: KycStatus,
    /// Free-text note written with the last status change
    pub kyc_status_note: Option<String>,
    /// When the status last changed
    pub status_update_date: DateTimeUtc,
    /// PEP declaration
    pub politically_exposed_person: PepStatus,
    /// Place of birth
    pub place_of_birth: Option<String>,
    /// Passport or national ID number
    pub identification_number: Option<String>,
    /// Issue date of the ID document
    pub identification_issue_date: Option<Date>,
    /// Expiry date of the ID document
    pub identification_expiry: Option<Date>,
    /// IP address the application was submitted from
    pub kyc_submitted_ip_address: Option<String>,
    /// IP address the user registered from
    pub registered_ip_address: Option<String>,
    /// Whether the applicant is a US citizen or tax resident
    pub us_citizen_tax_resident: bool,
    /// Whether the applicant accepted the terms
    pub accept_terms: bool,
    /// Whether the applicant agreed to data usage
    pub agreed_to_data_usage: bool,
    /// Country of citizenship
    pub citizenship_id: i64,
    /// Second citizenship, if any
    pub second_citizenship_id: Option<i64>,
    /// Country of residence
    pub country_residence_id: Option<i64>,
    /// Country whose KYC rules apply
    pub kyc_country_id: Option<i64>,
    /// Applicant
    pub user_id: Uuid,
    /// Staff member who reviewed the application
    pub reviewer_id: Option<Uuid>,
    /// When the review happened
    pub kyc_review_date: Option<DateTimeUtc>,
    /// IP address of the reviewer
    pub reviewer_ip_address: Option<String>,
    /// Why the application was refused
    pub kyc_refused_code: Option<RefusalCode>,
}

/// Defines relationships between `KycApplication` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Citizenship country
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CitizenshipId",
        to = "super::country::Column::Id",
        fk_name = "fk-kyc_applications-citizenship_id",
        on_delete = "Cascade"
    )]
    Citizenship,
    /// Second citizenship country
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::SecondCitizenshipId",
        to = "super::country::Column::Id",
        fk_name = "fk-kyc_applications-second_citizenship_id",
        on_delete = "Cascade"
    )]
    SecondCitizenship,
    /// Residence country
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryResidenceId",
        to = "super::country::Column::Id",
        fk_name = "fk-kyc_applications-country_residence_id",
        on_delete = "Cascade"
    )]
    CountryResidence,
    /// KYC jurisdiction; protects the country from deletion
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::KycCountryId",
        to = "super::country::Column::Id",
        fk_name = "fk-kyc_applications-kyc_country_id",
        on_delete = "Restrict"
    )]
    KycCountry,
    /// Applicant; applications are removed with their user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        fk_name = "fk-kyc_applications-user_id",
        on_delete = "Cascade"
    )]
    User,
    /// Reviewer; cleared when the staff account is removed
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReviewerId",
        to = "super::user::Column::Id",
        fk_name = "fk-kyc_applications-reviewer_id",
        on_delete = "SetNull"
    )]
    Reviewer,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Citizenship.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Whole years between `birth_date` and `today`, using 365.25-day years.
///
/// The day count is divided by [`DAYS_PER_YEAR`] and truncated, so there is no
/// calendar-exact birthday handling beyond that approximation.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i64 {
    let days = (today - birth_date).num_days();
    (days as f64 / DAYS_PER_YEAR).trunc() as i64
}

impl Model {
    /// Age of the applicant today, derived from `birth_date`. Never stored.
    #[must_use]
    pub fn age(&self) -> Option<i64> {
        self.age_at(Utc::now().date_naive())
    }

    /// Age of the applicant on a given day.
    #[must_use]
    pub fn age_at(&self, today: NaiveDate) -> Option<i64> {
        self.birth_date.map(|birth_date| age_on(birth_date, today))
    }
}
