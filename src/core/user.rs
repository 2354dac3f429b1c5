//! User business logic - Registration, addresses and staff permissions.
//!
//! Email is the login key: it is normalised on the way in and must be unique.
//! Staff members act on KYC applications through the permissions granted
//! here; see [`crate::core::kyc`].

use crate::{
    core::location::get_country_by_id,
    entities::{
        StaffPermission, User, UserAddress, staff_permission, staff_permission::Permission, user,
        user::AccountType, user_address, user_address::AddressType,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, SqlErr, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Currency assigned to new accounts
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Signup form submitted by a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupForm {
    /// First name
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    /// Last name
    #[validate(length(min = 1, max = 30))]
    pub last_name: String,
    /// Login email
    #[validate(email)]
    pub email: String,
    /// Borrower or investor; borrower when omitted
    #[serde(default)]
    pub account_type: AccountType,
    /// Country the user lives in
    pub country_of_residence_id: Option<i64>,
    /// IP address the signup came from
    pub registered_ip_address: Option<String>,
}

/// Input for a new user address
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAddress {
    /// First address line
    #[validate(length(min = 1, max = 50))]
    pub address_line_1: String,
    /// Second address line
    #[validate(length(max = 50))]
    pub address_line_2: Option<String>,
    /// State or region
    #[validate(length(max = 50))]
    pub state: String,
    /// City
    #[validate(length(max = 50))]
    pub city: String,
    /// Zip or postal code
    #[validate(length(max = 20))]
    pub zip_post_code: String,
    /// Whether this is the user's current or permanent address
    pub address_type: Option<AddressType>,
    /// Country of the address
    pub country_id: i64,
}

/// Trims the address and lower-cases the domain part, leaving the local part as typed.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Registers a new borrower or investor account.
///
/// The display name is "first last" and the username defaults to the email.
/// A residence country, when given, must accept signups and not be banned.
#[instrument(skip(db, form), fields(email = %form.email))]
pub async fn register_user(db: &DatabaseConnection, form: SignupForm) -> Result<user::Model> {
    form.validate()?;
    let email = normalize_email(&form.email);

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::DuplicateEmail { email });
    }

    if let Some(country_id) = form.country_of_residence_id {
        let country = get_country_by_id(db, country_id)
            .await?
            .ok_or_else(|| Error::not_found("Country", country_id))?;
        if !country.is_open_for_signup() {
            warn!("Signup refused for residents of {}", country.name);
            return Err(Error::validation(format!(
                "Signups from {} are not accepted",
                country.name
            )));
        }
    }

    let first_name = form.first_name.trim().to_string();
    let last_name = form.last_name.trim().to_string();
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        username: Set(email.clone()),
        name: Set(format!("{first_name} {last_name}")),
        first_name: Set(Some(first_name)),
        last_name: Set(Some(last_name)),
        current_address_id: Set(None),
        permanent_address_id: Set(None),
        contact_number: Set(None),
        date_of_birth: Set(None),
        kyc_complete: Set(false),
        kyc_complete_date: Set(None),
        kyc_status: Set(user::UserKycStatus::default()),
        on_boarding_complete: Set(false),
        on_boarding_complete_date: Set(None),
        kyc_submitted: Set(false),
        social_security_number: Set(None),
        place_of_birth: Set(None),
        verification_date: Set(None),
        registered_ip_address: Set(form.registered_ip_address),
        country_of_residence_id: Set(form.country_of_residence_id),
        default_currency: Set(DEFAULT_CURRENCY.to_string()),
        job_title: Set(None),
        account_type: Set(form.account_type),
        is_staff: Set(false),
        is_active: Set(true),
        date_joined: Set(Utc::now()),
    };

    let result = insert_user(db, user, &email).await?;
    info!("Registered user {}", result.id);
    Ok(result)
}

// A concurrent signup can still win the race; the unique index decides
async fn insert_user<C>(db: &C, user: user::ActiveModel, email: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    user.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateEmail {
            email: email.to_string(),
        },
        _ => Error::from(e),
    })
}

/// Finds a user by primary key.
pub async fn get_user_by_id<C>(db: &C, user_id: Uuid) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by login email (normalised before lookup).
pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_user<C>(db: &C, user_id: Uuid) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Grants or revokes staff status.
#[instrument(skip(db))]
pub async fn set_staff_status(
    db: &DatabaseConnection,
    user_id: Uuid,
    is_staff: bool,
) -> Result<user::Model> {
    let mut active: user::ActiveModel = require_user(db, user_id).await?.into();
    active.is_staff = Set(is_staff);
    active.update(db).await.map_err(Into::into)
}

/// Loads an active staff user, refusing anyone else.
pub async fn require_staff<C>(db: &C, user_id: Uuid) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::PermissionDenied {
            reason: format!("Unknown actor {user_id}"),
        })?;

    if !user.is_staff || !user.is_active {
        return Err(Error::PermissionDenied {
            reason: format!("User {user_id} is not active staff"),
        });
    }
    Ok(user)
}

/// Grants a staff permission. Granting one the user already holds is a no-op.
#[instrument(skip(db))]
pub async fn grant_permission(
    db: &DatabaseConnection,
    user_id: Uuid,
    permission: Permission,
) -> Result<()> {
    require_user(db, user_id).await?;
    if has_permission(db, user_id, permission).await? {
        debug!("User {} already holds {:?}", user_id, permission);
        return Ok(());
    }

    staff_permission::ActiveModel {
        user_id: Set(user_id),
        permission: Set(permission),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// All permissions held by a user.
pub async fn permissions_for<C>(db: &C, user_id: Uuid) -> Result<Vec<Permission>>
where
    C: ConnectionTrait,
{
    let rows = StaffPermission::find()
        .filter(staff_permission::Column::UserId.eq(user_id))
        .order_by_asc(staff_permission::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.permission).collect())
}

/// Whether a user holds a given permission.
pub async fn has_permission<C>(db: &C, user_id: Uuid, permission: Permission) -> Result<bool>
where
    C: ConnectionTrait,
{
    let found = StaffPermission::find()
        .filter(staff_permission::Column::UserId.eq(user_id))
        .filter(staff_permission::Column::Permission.eq(permission))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Marks onboarding finished and stamps the completion date.
#[instrument(skip(db))]
pub async fn complete_onboarding(db: &DatabaseConnection, user_id: Uuid) -> Result<user::Model> {
    let mut active: user::ActiveModel = require_user(db, user_id).await?.into();
    active.on_boarding_complete = Set(true);
    active.on_boarding_complete_date = Set(Some(Utc::now()));
    active.update(db).await.map_err(Into::into)
}

/// Adds an address to a user.
///
/// When the address is typed as current or permanent, the matching reference
/// on the user is pointed at it.
#[instrument(skip(db, address))]
pub async fn add_user_address<C>(
    db: &C,
    user_id: Uuid,
    address: NewAddress,
) -> Result<user_address::Model>
where
    C: ConnectionTrait,
{
    address.validate()?;
    let owner = require_user(db, user_id).await?;
    if get_country_by_id(db, address.country_id).await?.is_none() {
        return Err(Error::not_found("Country", address.country_id));
    }

    let created = user_address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.id),
        address_line_1: Set(address.address_line_1.trim().to_string()),
        address_line_2: Set(address.address_line_2),
        state: Set(address.state),
        city: Set(address.city),
        zip_post_code: Set(address.zip_post_code),
        address_type: Set(address.address_type),
        country_id: Set(address.country_id),
    }
    .insert(db)
    .await?;

    if let Some(address_type) = created.address_type {
        let mut active: user::ActiveModel = owner.into();
        match address_type {
            AddressType::Current => active.current_address_id = Set(Some(created.id)),
            AddressType::Permanent => active.permanent_address_id = Set(Some(created.id)),
        }
        active.update(db).await?;
    }

    debug!("Added address {} for user {}", created.id, user_id);
    Ok(created)
}

/// Points the user's current and permanent address references.
///
/// Both addresses must be owned by the user; `None` clears a reference.
#[instrument(skip(db))]
pub async fn set_user_addresses(
    db: &DatabaseConnection,
    user_id: Uuid,
    current: Option<Uuid>,
    permanent: Option<Uuid>,
) -> Result<user::Model> {
    let owner = require_user(db, user_id).await?;

    for address_id in [current, permanent].into_iter().flatten() {
        let address = UserAddress::find_by_id(address_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("UserAddress", address_id))?;
        if address.user_id != user_id {
            return Err(Error::validation(format!(
                "Address {address_id} does not belong to user {user_id}"
            )));
        }
    }

    let mut active: user::ActiveModel = owner.into();
    active.current_address_id = Set(current);
    active.permanent_address_id = Set(permanent);
    active.update(db).await.map_err(Into::into)
}

/// Addresses owned by a user.
pub async fn list_user_addresses(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<user_address::Model>> {
    UserAddress::find()
        .filter(user_address::Column::UserId.eq(user_id))
        .order_by_asc(user_address::Column::AddressLine1)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::location::{NewCountry, create_country};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Anna@Example.COM "), "Anna@example.com");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[tokio::test]
    async fn test_register_user_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut form = signup_form("not-an-email");
        let result = register_user(&db, form.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        form.email = "anna@example.com".to_string();
        form.last_name = "x".repeat(31);
        let result = register_user(&db, form).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_register_user_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let user = register_user(&db, signup_form("anna@Example.com")).await?;

        assert_eq!(user.email, "anna@example.com");
        assert_eq!(user.username, user.email);
        assert_eq!(user.name, "Anna Schmidt");
        assert_eq!(user.default_currency, "EUR");
        assert_eq!(user.account_type, AccountType::Borrower);
        assert_eq!(user.kyc_status, user::UserKycStatus::Unverified);
        assert!(user.is_active);
        assert!(!user.is_staff);

        let found = get_user_by_email(&db, "anna@EXAMPLE.com").await?;
        assert_eq!(found.unwrap().id, user.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        register_user(&db, signup_form("anna@example.com")).await?;

        let result = register_user(&db, signup_form("anna@example.com")).await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateEmail { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_email_enforced_by_database() -> Result<()> {
        let db = setup_test_db().await?;
        let existing = create_test_user(&db, "anna@example.com").await?;

        let mut copy = user::ActiveModel::from(existing).reset_all();
        copy.id = Set(Uuid::new_v4());
        let result = copy.insert(&db).await;

        assert!(matches!(
            Error::from(result.unwrap_err()),
            Error::Constraint { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_insert_reports_only_unique_violations_as_duplicate() -> Result<()> {
        let db = setup_test_db().await?;
        let existing = create_test_user(&db, "anna@example.com").await?;

        let mut duplicate = user::ActiveModel::from(existing.clone()).reset_all();
        duplicate.id = Set(Uuid::new_v4());
        let result = insert_user(&db, duplicate, "anna@example.com").await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateEmail { .. }));

        // Residence country removed after the signup checks ran
        let mut orphan = user::ActiveModel::from(existing).reset_all();
        orphan.id = Set(Uuid::new_v4());
        orphan.email = Set("ben@example.com".to_string());
        orphan.username = Set("ben@example.com".to_string());
        orphan.country_of_residence_id = Set(Some(404));
        let result = insert_user(&db, orphan, "ben@example.com").await;
        assert!(matches!(result.unwrap_err(), Error::Constraint { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_signup_requires_open_country() -> Result<()> {
        let db = setup_test_db().await?;
        let banned = create_country(
            &db,
            NewCountry {
                banned: true,
                ..NewCountry::named("Bannedland", "BL")
            },
        )
        .await?;

        let mut form = signup_form("anna@example.com");
        form.country_of_residence_id = Some(banned.id);
        let result = register_user(&db, form.clone()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        form.country_of_residence_id = Some(404);
        let result = register_user(&db, form).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_typed_address_updates_user_reference() -> Result<()> {
        let db = setup_test_db().await?;
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let address = add_user_address(
            &db,
            user.id,
            NewAddress {
                address_type: Some(AddressType::Current),
                ..test_address(country.id)
            },
        )
        .await?;

        let user = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(user.current_address_id, Some(address.id));
        assert_eq!(user.permanent_address_id, None);
        assert_eq!(list_user_addresses(&db, user.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_address_requires_existing_country() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let result = add_user_address(&db, user.id, test_address(999)).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_user_addresses_checks_ownership() -> Result<()> {
        let db = setup_test_db().await?;
        let country = create_test_country(&db, "Germany", "DE").await?;
        let anna = create_test_user(&db, "anna@example.com").await?;
        let ben = create_test_user(&db, "ben@example.com").await?;

        let annas = add_user_address(&db, anna.id, test_address(country.id)).await?;
        let bens = add_user_address(&db, ben.id, test_address(country.id)).await?;

        let updated = set_user_addresses(&db, anna.id, Some(annas.id), Some(annas.id)).await?;
        assert_eq!(updated.current_address_id, Some(annas.id));
        assert_eq!(updated.permanent_address_id, Some(annas.id));

        let result = set_user_addresses(&db, anna.id, Some(bens.id), None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_permissions_are_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let staff = create_staff_user(&db, "staff@example.com", &[]).await?;

        assert!(!has_permission(&db, staff.id, Permission::VerifyKyc).await?);
        grant_permission(&db, staff.id, Permission::VerifyKyc).await?;
        grant_permission(&db, staff.id, Permission::VerifyKyc).await?;
        grant_permission(&db, staff.id, Permission::MergeKyc).await?;

        assert!(has_permission(&db, staff.id, Permission::VerifyKyc).await?);
        assert_eq!(
            permissions_for(&db, staff.id).await?,
            vec![Permission::VerifyKyc, Permission::MergeKyc]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_require_staff() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let staff = create_staff_user(&db, "staff@example.com", &[]).await?;

        assert!(require_staff(&db, staff.id).await.is_ok());
        assert!(matches!(
            require_staff(&db, user.id).await.unwrap_err(),
            Error::PermissionDenied { .. }
        ));
        assert!(matches!(
            require_staff(&db, Uuid::new_v4()).await.unwrap_err(),
            Error::PermissionDenied { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_onboarding() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let user = complete_onboarding(&db, user.id).await?;
        assert!(user.on_boarding_complete);
        assert!(user.on_boarding_complete_date.is_some());

        Ok(())
    }
}
