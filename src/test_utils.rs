//! Shared test utilities for `VigoLend`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        kyc::{self, KycDocuments, KycSubmission},
        location::{self, NewCountry},
        team::{self, NewTeamMember},
        user::{self, NewAddress, SignupForm},
    },
    entities,
    entities::staff_permission::Permission,
    errors::Result,
    storage::{DocumentStore, UploadedFile},
};
use chrono::{Days, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A document store rooted in a fresh directory under the system temp dir.
/// The directory is not created until the first save.
pub fn test_store() -> DocumentStore {
    DocumentStore::new(std::env::temp_dir().join(format!("vigolend-test-{}", Uuid::new_v4())))
}

/// Number of files in the store's KYC directory.
pub fn stored_document_count(store: &DocumentStore) -> usize {
    std::fs::read_dir(store.root().join("kyc")).map_or(0, Iterator::count)
}

/// Creates a signup-enabled test country.
pub async fn create_test_country(
    db: &DatabaseConnection,
    name: &str,
    iso2: &str,
) -> Result<entities::country::Model> {
    location::create_country(db, NewCountry::named(name, iso2)).await
}

/// Signup form for "Anna Schmidt" with the given email.
///
/// # Defaults
/// * `account_type`: borrower
/// * `country_of_residence_id`: None
pub fn signup_form(email: &str) -> SignupForm {
    SignupForm {
        first_name: "Anna".to_string(),
        last_name: "Schmidt".to_string(),
        email: email.to_string(),
        account_type: entities::user::AccountType::Borrower,
        country_of_residence_id: None,
        registered_ip_address: Some("192.0.2.10".to_string()),
    }
}

/// Registers a test user without a residence country.
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::user::Model> {
    create_test_user_in(db, email, None).await
}

/// Registers a test user residing in the given country.
pub async fn create_test_user_in(
    db: &DatabaseConnection,
    email: &str,
    country_of_residence_id: Option<i64>,
) -> Result<entities::user::Model> {
    let mut form = signup_form(email);
    form.country_of_residence_id = country_of_residence_id;
    user::register_user(db, form).await
}

/// Registers a staff user and grants the given permissions.
pub async fn create_staff_user(
    db: &DatabaseConnection,
    email: &str,
    permissions: &[Permission],
) -> Result<entities::user::Model> {
    let created = create_test_user(db, email).await?;
    let staff = user::set_staff_status(db, created.id, true).await?;
    for permission in permissions {
        user::grant_permission(db, staff.id, *permission).await?;
    }
    Ok(staff)
}

/// An untyped address in the given country.
pub fn test_address(country_id: i64) -> NewAddress {
    NewAddress {
        address_line_1: "Leopoldstrasse 12".to_string(),
        address_line_2: None,
        state: "Bavaria".to_string(),
        city: "Munich".to_string(),
        zip_post_code: "80802".to_string(),
        address_type: None,
        country_id,
    }
}

/// A complete KYC submission for `user_id`, citizen and resident of `country_id`.
///
/// # Defaults
/// * legal names: "Anna Maria" / "Schmidt", born 1990-06-15 in Munich
/// * identification issued a year ago, expiring in ten years
/// * status, ID type, proof type and PEP left at their defaults
pub fn test_submission(user_id: Uuid, country_id: i64) -> KycSubmission {
    let today = Utc::now().date_naive();
    KycSubmission {
        user_id,
        legal_first_names: Some("Anna Maria".to_string()),
        legal_last_names: Some("Schmidt".to_string()),
        birth_date: NaiveDate::from_ymd_opt(1990, 6, 15),
        email: "anna@example.com".to_string(),
        address_line_1: "Leopoldstrasse 12".to_string(),
        address_line_2: None,
        state: "Bavaria".to_string(),
        zip_code: "80802".to_string(),
        city: "Munich".to_string(),
        identification_type: entities::kyc_application::IdentificationType::default(),
        address_proof_type: entities::kyc_application::AddressProofType::default(),
        kyc_status: None,
        politically_exposed_person: entities::kyc_application::PepStatus::default(),
        place_of_birth: Some("Munich".to_string()),
        identification_number: Some("L01X00T47".to_string()),
        identification_issue_date: today.checked_sub_days(Days::new(365)),
        identification_expiry: today.checked_add_days(Days::new(3650)),
        kyc_submitted_ip_address: Some("192.0.2.10".to_string()),
        us_citizen_tax_resident: false,
        accept_terms: true,
        agreed_to_data_usage: true,
        citizenship_id: country_id,
        second_citizenship_id: None,
        country_residence_id: Some(country_id),
        kyc_country_id: None,
    }
}

/// Proof of address and photo ID front; no back or selfie.
pub fn test_documents() -> KycDocuments {
    KycDocuments {
        proof_of_address: UploadedFile::new("statement.pdf", b"%PDF-1.4 bank statement".to_vec()),
        photo_id: UploadedFile::new("id-front.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        photo_id_back: None,
        selfie_with_id: None,
    }
}

/// Submits [`test_submission`] with [`test_documents`].
pub async fn create_test_application(
    db: &DatabaseConnection,
    store: &DocumentStore,
    user_id: Uuid,
    country_id: i64,
) -> Result<entities::kyc_application::Model> {
    kyc::submit_application(db, store, test_submission(user_id, country_id), test_documents())
        .await
}

/// Team member input with the given name.
pub fn new_team_member(name: &str) -> NewTeamMember {
    NewTeamMember {
        name: name.to_string(),
        designation: "Risk Analyst".to_string(),
        facebook: Some("https://facebook.com/vigolend".to_string()),
        twitter: "@vigolend".to_string(),
        photo: format!("team/{}.jpg", name.to_lowercase()),
    }
}

/// Creates a team member with the given name.
pub async fn create_test_team_member(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::team_member::Model> {
    team::create_team_member(db, new_team_member(name)).await
}
