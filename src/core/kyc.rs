//! KYC business logic - Submission, review workflow and profile merge.
//!
//! An application enters the workflow as `pending` (or `unverified` when the
//! caller says so). Active staff move it to `verified`, `rejected`,
//! `cancelled` or `action_required`; the first three are final. Each review
//! stamps the reviewer, review date and reviewer IP, and mirrors the outcome
//! onto the applicant's user record in the same transaction.

use crate::{
    core::{
        location::get_country_by_id,
        user::{get_user_by_id, has_permission, require_staff},
    },
    entities::{
        KycApplication, User,
        kyc_application::{
            self, AddressProofType, IdentificationType, KycStatus, PepStatus, RefusalCode,
        },
        staff_permission::Permission,
        user::{self, UserKycStatus},
    },
    errors::{Error, Result},
    storage::{DocumentKind, DocumentStore, UploadedFile},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Applicant-provided fields of a KYC application
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct KycSubmission {
    /// Applicant
    pub user_id: Uuid,
    /// Legal first and middle names
    #[validate(length(max = 255))]
    pub legal_first_names: Option<String>,
    /// Legal last names
    #[validate(length(max = 255))]
    pub legal_last_names: Option<String>,
    /// Date of birth
    pub birth_date: Option<NaiveDate>,
    /// Contact email
    #[validate(email)]
    pub email: String,
    /// Address line 1
    #[validate(length(min = 1, max = 255))]
    pub address_line_1: String,
    /// Address line 2
    #[validate(length(max = 255))]
    pub address_line_2: Option<String>,
    /// State or region
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    /// Zip or postal code
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
    /// City
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    /// Kind of photo ID
    #[serde(default)]
    pub identification_type: IdentificationType,
    /// Kind of proof of address
    #[serde(default)]
    pub address_proof_type: AddressProofType,
    /// Initial status; `pending` when omitted
    pub kyc_status: Option<KycStatus>,
    /// PEP declaration
    #[serde(default)]
    pub politically_exposed_person: PepStatus,
    /// Place of birth
    #[validate(length(max = 255))]
    pub place_of_birth: Option<String>,
    /// Passport or national ID number
    #[validate(length(max = 100))]
    pub identification_number: Option<String>,
    /// Issue date of the ID
    pub identification_issue_date: Option<NaiveDate>,
    /// Expiry date of the ID
    pub identification_expiry: Option<NaiveDate>,
    /// IP address of the submission
    pub kyc_submitted_ip_address: Option<String>,
    /// US citizen or tax resident declaration
    #[serde(default)]
    pub us_citizen_tax_resident: bool,
    /// Terms accepted
    #[serde(default)]
    pub accept_terms: bool,
    /// Data usage agreed
    #[serde(default)]
    pub agreed_to_data_usage: bool,
    /// Country of citizenship
    pub citizenship_id: i64,
    /// Second citizenship
    pub second_citizenship_id: Option<i64>,
    /// Country of residence
    pub country_residence_id: Option<i64>,
    /// Country whose KYC rules apply
    pub kyc_country_id: Option<i64>,
}

/// Uploaded evidence accompanying a submission
#[derive(Debug, Clone)]
pub struct KycDocuments {
    /// Bank statement, credit card statement or utility bill
    pub proof_of_address: UploadedFile,
    /// Front of the photo ID
    pub photo_id: UploadedFile,
    /// Back of the photo ID
    pub photo_id_back: Option<UploadedFile>,
    /// Selfie holding the ID
    pub selfie_with_id: Option<UploadedFile>,
}

/// What a reviewer decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Approve the application
    Verify,
    /// Refuse the application for the given reason
    Reject {
        /// Why the application was refused
        refusal_code: RefusalCode,
    },
    /// Cancel the application
    Cancel,
    /// Ask the applicant for more information
    RequestAction,
}

impl ReviewDecision {
    /// Status the application moves to.
    #[must_use]
    pub const fn target_status(self) -> KycStatus {
        match self {
            Self::Verify => KycStatus::Verified,
            Self::Reject { .. } => KycStatus::Rejected,
            Self::Cancel => KycStatus::Cancelled,
            Self::RequestAction => KycStatus::ActionRequired,
        }
    }

    /// Permissions that allow this decision; holding any one is enough.
    #[must_use]
    pub const fn accepted_permissions(self) -> &'static [Permission] {
        match self {
            Self::Verify => &[Permission::VerifyKyc],
            Self::Reject { .. } => &[Permission::RejectKyc],
            Self::Cancel | Self::RequestAction => &[Permission::VerifyKyc, Permission::RejectKyc],
        }
    }
}

/// A staff review of one application
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReviewRequest {
    /// Staff member performing the review
    pub reviewer_id: Uuid,
    /// The decision
    pub decision: ReviewDecision,
    /// Note stored with the status change
    pub note: Option<String>,
    /// IP address of the reviewer
    pub reviewer_ip: Option<String>,
}

const fn mirrored_user_status(status: KycStatus) -> UserKycStatus {
    match status {
        KycStatus::Verified => UserKycStatus::Verified,
        KycStatus::Unverified => UserKycStatus::Unverified,
        KycStatus::Pending => UserKycStatus::Pending,
        KycStatus::Rejected => UserKycStatus::Rejected,
        KycStatus::Cancelled => UserKycStatus::Cancelled,
        KycStatus::ActionRequired => UserKycStatus::ActionRequired,
    }
}

/// Checks the identification document dates against `today`.
///
/// The issue date may not equal the expiry date or lie in the future, and the
/// document must expire strictly after `today`. Missing dates are not checked.
///
/// # Errors
/// Returns a validation error naming the first rule that failed.
pub fn validate_identification_dates(
    issue_date: Option<NaiveDate>,
    expiry: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<()> {
    if let (Some(issue), Some(expiry)) = (issue_date, expiry) {
        if issue == expiry {
            return Err(Error::validation(
                "Identification issue date and expiry date cannot be the same",
            ));
        }
    }
    if issue_date.is_some_and(|issue| issue > today) {
        return Err(Error::validation(
            "Identification issue date cannot be in the future",
        ));
    }
    if expiry.is_some_and(|expiry| expiry <= today) {
        return Err(Error::validation("Identification document has expired"));
    }
    Ok(())
}

async fn require_country<C>(db: &C, country_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(id) = country_id {
        if get_country_by_id(db, id).await?.is_none() {
            return Err(Error::not_found("Country", id));
        }
    }
    Ok(())
}

/// Relative paths of the documents saved for one submission
struct StoredDocuments {
    proof_of_address: String,
    photo_id: String,
    photo_id_back: Option<String>,
    selfie_with_id: Option<String>,
}

impl StoredDocuments {
    fn paths(&self) -> Vec<String> {
        [
            Some(&self.proof_of_address),
            Some(&self.photo_id),
            self.photo_id_back.as_ref(),
            self.selfie_with_id.as_ref(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}

/// Saves every upload of a submission. If any save fails, the documents
/// already written are removed again.
async fn save_documents(store: &DocumentStore, documents: &KycDocuments) -> Result<StoredDocuments> {
    let mut saved = Vec::new();
    match save_each(store, documents, &mut saved).await {
        Ok(stored) => Ok(stored),
        Err(e) => {
            store.discard(&saved).await;
            Err(e)
        }
    }
}

async fn save_each(
    store: &DocumentStore,
    documents: &KycDocuments,
    saved: &mut Vec<String>,
) -> Result<StoredDocuments> {
    let proof_of_address = save_tracked(
        store,
        DocumentKind::ProofOfAddress,
        &documents.proof_of_address,
        saved,
    )
    .await?;
    let photo_id = save_tracked(store, DocumentKind::PhotoId, &documents.photo_id, saved).await?;
    let photo_id_back = match &documents.photo_id_back {
        Some(file) => Some(save_tracked(store, DocumentKind::PhotoIdBack, file, saved).await?),
        None => None,
    };
    let selfie_with_id = match &documents.selfie_with_id {
        Some(file) => Some(save_tracked(store, DocumentKind::SelfieWithId, file, saved).await?),
        None => None,
    };

    Ok(StoredDocuments {
        proof_of_address,
        photo_id,
        photo_id_back,
        selfie_with_id,
    })
}

async fn save_tracked(
    store: &DocumentStore,
    kind: DocumentKind,
    file: &UploadedFile,
    saved: &mut Vec<String>,
) -> Result<String> {
    let path = store.save(kind, file).await?;
    saved.push(path.clone());
    Ok(path)
}

/// Submits a KYC application with its documents.
///
/// Documents are written to the store before the database insert and removed
/// again if the submission fails afterwards. The owning
/// user is marked as having submitted KYC and its status mirrors the
/// application's initial status.
#[instrument(skip_all, fields(user_id = %submission.user_id))]
pub async fn submit_application(
    db: &DatabaseConnection,
    store: &DocumentStore,
    submission: KycSubmission,
    documents: KycDocuments,
) -> Result<kyc_application::Model> {
    submission.validate()?;
    validate_identification_dates(
        submission.identification_issue_date,
        submission.identification_expiry,
        Utc::now().date_naive(),
    )?;

    let status = submission.kyc_status.unwrap_or_default();
    if !matches!(status, KycStatus::Pending | KycStatus::Unverified) {
        return Err(Error::validation(format!(
            "A new application cannot start as '{}'",
            status.as_str()
        )));
    }

    let owner = get_user_by_id(db, submission.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", submission.user_id))?;
    require_country(db, Some(submission.citizenship_id)).await?;
    require_country(db, submission.second_citizenship_id).await?;
    require_country(db, submission.country_residence_id).await?;
    require_country(db, submission.kyc_country_id).await?;

    let stored = save_documents(store, &documents).await?;
    let stored_paths = stored.paths();

    let now = Utc::now();
    let application = kyc_application::ActiveModel {
        id: Set(Uuid::new_v4()),
        created_date: Set(now),
        modified_date: Set(now),
        legal_first_names: Set(submission.legal_first_names),
        legal_last_names: Set(submission.legal_last_names),
        birth_date: Set(submission.birth_date),
        email: Set(submission.email),
        address_line_1: Set(submission.address_line_1),
        address_line_2: Set(submission.address_line_2),
        state: Set(submission.state),
        zip_code: Set(submission.zip_code),
        city: Set(submission.city),
        identification_type: Set(submission.identification_type),
        address_proof_type: Set(submission.address_proof_type),
        proof_of_address_document: Set(stored.proof_of_address),
        photo_id: Set(stored.photo_id),
        photo_id_back: Set(stored.photo_id_back),
        selfie_with_id: Set(stored.selfie_with_id),
        kyc_status: Set(status),
        kyc_status_note: Set(None),
        status_update_date: Set(now),
        politically_exposed_person: Set(submission.politically_exposed_person),
        place_of_birth: Set(submission.place_of_birth),
        identification_number: Set(submission.identification_number),
        identification_issue_date: Set(submission.identification_issue_date),
        identification_expiry: Set(submission.identification_expiry),
        kyc_submitted_ip_address: Set(submission.kyc_submitted_ip_address),
        registered_ip_address: Set(owner.registered_ip_address.clone()),
        us_citizen_tax_resident: Set(submission.us_citizen_tax_resident),
        accept_terms: Set(submission.accept_terms),
        agreed_to_data_usage: Set(submission.agreed_to_data_usage),
        citizenship_id: Set(submission.citizenship_id),
        second_citizenship_id: Set(submission.second_citizenship_id),
        country_residence_id: Set(submission.country_residence_id),
        kyc_country_id: Set(submission.kyc_country_id),
        user_id: Set(owner.id),
        reviewer_id: Set(None),
        kyc_review_date: Set(None),
        reviewer_ip_address: Set(None),
        kyc_refused_code: Set(None),
    };

    match insert_application(db, application, owner, status).await {
        Ok(created) => {
            info!("KYC application {} submitted", created.id);
            Ok(created)
        }
        Err(e) => {
            store.discard(&stored_paths).await;
            Err(e)
        }
    }
}

async fn insert_application(
    db: &DatabaseConnection,
    application: kyc_application::ActiveModel,
    owner: user::Model,
    status: KycStatus,
) -> Result<kyc_application::Model> {
    let txn = db.begin().await?;
    let created = application.insert(&txn).await?;

    let mut owner: user::ActiveModel = owner.into();
    owner.kyc_submitted = Set(true);
    owner.kyc_status = Set(mirrored_user_status(status));
    owner.update(&txn).await?;
    txn.commit().await?;

    Ok(created)
}

async fn check_review_permission<C>(db: &C, reviewer_id: Uuid, decision: ReviewDecision) -> Result<()>
where
    C: ConnectionTrait,
{
    for permission in decision.accepted_permissions() {
        if has_permission(db, reviewer_id, *permission).await? {
            return Ok(());
        }
    }
    Err(Error::PermissionDenied {
        reason: format!(
            "Reviewer {reviewer_id} may not move applications to '{}'",
            decision.target_status().as_str()
        ),
    })
}

/// Applies a staff review to an application.
///
/// The reviewer must be active staff holding a permission accepted by the
/// decision, and the application must not be in a final state. Status, note,
/// review stamps and the mirrored user status are written in one transaction;
/// a verification also marks the user's KYC complete.
#[instrument(skip(db, request), fields(reviewer_id = %request.reviewer_id, decision = ?request.decision))]
pub async fn review_application(
    db: &DatabaseConnection,
    application_id: Uuid,
    request: ReviewRequest,
) -> Result<kyc_application::Model> {
    let txn = db.begin().await?;

    let reviewer = require_staff(&txn, request.reviewer_id).await?;
    let application = KycApplication::find_by_id(application_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("KycApplication", application_id))?;
    check_review_permission(&txn, reviewer.id, request.decision).await?;

    let target = request.decision.target_status();
    if !application.kyc_status.can_transition_to(target) {
        warn!(
            "Refused transition {} -> {} for {}",
            application.kyc_status.as_str(),
            target.as_str(),
            application_id
        );
        return Err(Error::InvalidTransition {
            from: application.kyc_status.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }

    let now = Utc::now();
    let owner_id = application.user_id;
    let mut active: kyc_application::ActiveModel = application.into();
    active.kyc_status = Set(target);
    active.kyc_status_note = Set(request.note);
    active.status_update_date = Set(now);
    active.modified_date = Set(now);
    active.reviewer_id = Set(Some(reviewer.id));
    active.kyc_review_date = Set(Some(now));
    active.reviewer_ip_address = Set(request.reviewer_ip);
    active.kyc_refused_code = Set(match request.decision {
        ReviewDecision::Reject { refusal_code } => Some(refusal_code),
        _ => None,
    });
    let updated = active.update(&txn).await?;

    let owner = User::find_by_id(owner_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", owner_id))?;
    let mut owner: user::ActiveModel = owner.into();
    owner.kyc_status = Set(mirrored_user_status(target));
    if target == KycStatus::Verified {
        owner.kyc_complete = Set(true);
        owner.kyc_complete_date = Set(Some(now));
        owner.verification_date = Set(Some(now));
    }
    owner.update(&txn).await?;

    txn.commit().await?;
    info!(
        "KYC application {} moved to {} by {}",
        updated.id,
        target.as_str(),
        reviewer.id
    );
    Ok(updated)
}

/// Copies a verified application's identity onto the applicant's profile.
///
/// Legal names replace the first/last name (and the display name), and the
/// birth date, place of birth and residence country are copied when present.
/// Requires active staff holding the merge permission.
#[instrument(skip(db))]
pub async fn merge_into_user(
    db: &DatabaseConnection,
    application_id: Uuid,
    actor_id: Uuid,
) -> Result<user::Model> {
    let actor = require_staff(db, actor_id).await?;
    if !has_permission(db, actor.id, Permission::MergeKyc).await? {
        return Err(Error::PermissionDenied {
            reason: format!("User {actor_id} may not merge KYC data"),
        });
    }

    let application = get_application(db, application_id)
        .await?
        .ok_or_else(|| Error::not_found("KycApplication", application_id))?;
    if application.kyc_status != KycStatus::Verified {
        return Err(Error::validation(format!(
            "Only verified applications can be merged, this one is '{}'",
            application.kyc_status.as_str()
        )));
    }

    let owner = get_user_by_id(db, application.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", application.user_id))?;

    let first_name = application.legal_first_names.or(owner.first_name.clone());
    let last_name = application.legal_last_names.or(owner.last_name.clone());
    let display_name = [first_name.as_deref(), last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let mut active: user::ActiveModel = owner.into();
    if !display_name.is_empty() {
        active.name = Set(display_name);
    }
    active.first_name = Set(first_name);
    active.last_name = Set(last_name);
    if application.birth_date.is_some() {
        active.date_of_birth = Set(application.birth_date);
    }
    if application.place_of_birth.is_some() {
        active.place_of_birth = Set(application.place_of_birth);
    }
    if application.country_residence_id.is_some() {
        active.country_of_residence_id = Set(application.country_residence_id);
    }

    let merged = active.update(db).await?;
    debug!("Merged KYC application {} into user {}", application_id, merged.id);
    Ok(merged)
}

/// Finds an application by id.
pub async fn get_application(
    db: &DatabaseConnection,
    application_id: Uuid,
) -> Result<Option<kyc_application::Model>> {
    KycApplication::find_by_id(application_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applications waiting for a reviewer, oldest first.
pub async fn list_pending_applications(
    db: &DatabaseConnection,
) -> Result<Vec<kyc_application::Model>> {
    KycApplication::find()
        .filter(kyc_application::Column::KycStatus.eq(KycStatus::Pending))
        .order_by_asc(kyc_application::Column::CreatedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All applications of one user, newest first.
pub async fn list_applications_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<kyc_application::Model>> {
    KycApplication::find()
        .filter(kyc_application::Column::UserId.eq(user_id))
        .order_by_desc(kyc_application::Column::CreatedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Stored path of one of the application's documents, if it was uploaded.
#[must_use]
pub fn document_path(application: &kyc_application::Model, kind: DocumentKind) -> Option<&str> {
    match kind {
        DocumentKind::ProofOfAddress => Some(application.proof_of_address_document.as_str()),
        DocumentKind::PhotoId => Some(application.photo_id.as_str()),
        DocumentKind::PhotoIdBack => application.photo_id_back.as_deref(),
        DocumentKind::SelfieWithId => application.selfie_with_id.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Days;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn review(reviewer_id: Uuid, decision: ReviewDecision) -> ReviewRequest {
        ReviewRequest {
            reviewer_id,
            decision,
            note: Some("checked".to_string()),
            reviewer_ip: Some("10.0.0.7".to_string()),
        }
    }

    #[test]
    fn test_identification_dates() {
        let today = date(2024, 6, 1);

        assert!(validate_identification_dates(None, None, today).is_ok());
        assert!(
            validate_identification_dates(Some(date(2020, 1, 1)), Some(date(2030, 1, 1)), today)
                .is_ok()
        );

        // Same issue and expiry date
        let same = validate_identification_dates(Some(date(2025, 1, 1)), Some(date(2025, 1, 1)), today);
        assert!(matches!(same.unwrap_err(), Error::Validation { .. }));

        // Issued in the future
        let future = validate_identification_dates(Some(date(2024, 6, 2)), None, today);
        assert!(matches!(future.unwrap_err(), Error::Validation { .. }));

        // Expires today
        let expired = validate_identification_dates(None, Some(today), today);
        assert!(matches!(expired.unwrap_err(), Error::Validation { .. }));
    }

    #[test]
    fn test_decision_permissions() {
        assert_eq!(
            ReviewDecision::Verify.accepted_permissions(),
            &[Permission::VerifyKyc]
        );
        let reject = ReviewDecision::Reject {
            refusal_code: RefusalCode::ExpiredDocument,
        };
        assert_eq!(reject.accepted_permissions(), &[Permission::RejectKyc]);
        assert_eq!(reject.target_status(), KycStatus::Rejected);
        assert_eq!(ReviewDecision::Cancel.accepted_permissions().len(), 2);
    }

    #[test]
    fn test_decision_wire_format() {
        let decision: ReviewDecision = serde_json::from_str(
            r#"{"action":"reject","refusal_code":"DOCUMENT_DOES_NOT_MATCH_USER_DATA"}"#,
        )
        .unwrap();
        assert_eq!(
            decision,
            ReviewDecision::Reject {
                refusal_code: RefusalCode::DocumentDoesNotMatchUserData
            }
        );

        // A rejection must name a refusal code
        assert!(serde_json::from_str::<ReviewDecision>(r#"{"action":"reject"}"#).is_err());
    }

    #[tokio::test]
    async fn test_submission_defaults_to_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let application = create_test_application(&db, &store, user.id, country.id).await?;
        assert_eq!(application.kyc_status, KycStatus::Pending);
        assert_eq!(application.identification_type, IdentificationType::NationalId);
        assert_eq!(application.address_proof_type, AddressProofType::BankStatement);
        assert_eq!(application.politically_exposed_person, PepStatus::NonPep);
        assert!(application.reviewer_id.is_none());
        assert!(store.resolve(&application.photo_id).exists());
        assert!(application.photo_id_back.is_none());
        assert_eq!(
            document_path(&application, DocumentKind::ProofOfAddress),
            Some(application.proof_of_address_document.as_str())
        );
        assert_eq!(application.age_at(date(2024, 6, 14)), Some(33));

        let user = get_user_by_id(&db, user.id).await?.unwrap();
        assert!(user.kyc_submitted);
        assert_eq!(user.kyc_status, UserKycStatus::Pending);

        assert_eq!(list_pending_applications(&db).await?.len(), 1);
        assert_eq!(list_applications_for_user(&db, user.id).await?.len(), 1);

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_submission_rejects_expired_identification() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let mut submission = test_submission(user.id, country.id);
        submission.identification_expiry = Utc::now().date_naive().checked_sub_days(Days::new(1));
        let result = submit_application(&db, &store, submission, test_documents()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert!(!store.root().exists());

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_no_documents() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let mut documents = test_documents();
        documents.photo_id = UploadedFile::new("front.jpg", Vec::new());
        let result =
            submit_application(&db, &store, test_submission(user.id, country.id), documents).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        assert_eq!(stored_document_count(&store), 0);
        assert!(list_applications_for_user(&db, user.id).await?.is_empty());
        let user = get_user_by_id(&db, user.id).await?.unwrap();
        assert!(!user.kyc_submitted);

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_submission_requires_citizenship_country() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let user = create_test_user(&db, "anna@example.com").await?;

        let result =
            submit_application(&db, &store, test_submission(user.id, 404), test_documents()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "Country",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_submission_cannot_start_verified() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;

        let mut submission = test_submission(user.id, country.id);
        submission.kyc_status = Some(KycStatus::Verified);
        let result = submit_application(&db, &store, submission, test_documents()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_mirrors_onto_user() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let reviewer = create_staff_user(&db, "staff@example.com", &[Permission::VerifyKyc]).await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;

        let reviewed = review_application(
            &db,
            application.id,
            review(reviewer.id, ReviewDecision::Verify),
        )
        .await?;
        assert_eq!(reviewed.kyc_status, KycStatus::Verified);
        assert_eq!(reviewed.reviewer_id, Some(reviewer.id));
        assert_eq!(reviewed.reviewer_ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(reviewed.kyc_status_note.as_deref(), Some("checked"));
        assert!(reviewed.kyc_review_date.is_some());
        assert!(reviewed.kyc_refused_code.is_none());

        let user = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(user.kyc_status, UserKycStatus::Verified);
        assert!(user.kyc_complete);
        assert!(user.kyc_complete_date.is_some());
        assert!(user.verification_date.is_some());

        assert!(list_pending_applications(&db).await?.is_empty());

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_reject_records_refusal_code() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let reviewer = create_staff_user(&db, "staff@example.com", &[Permission::RejectKyc]).await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;

        let reviewed = review_application(
            &db,
            application.id,
            review(
                reviewer.id,
                ReviewDecision::Reject {
                    refusal_code: RefusalCode::ExpiredDocument,
                },
            ),
        )
        .await?;
        assert_eq!(reviewed.kyc_status, KycStatus::Rejected);
        assert_eq!(reviewed.kyc_refused_code, Some(RefusalCode::ExpiredDocument));

        let user = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(user.kyc_status, UserKycStatus::Rejected);
        assert!(!user.kyc_complete);

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_review_requires_matching_permission() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let rejecter = create_staff_user(&db, "rejecter@example.com", &[Permission::RejectKyc]).await?;
        let outsider = create_test_user(&db, "outsider@example.com").await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;

        let result = review_application(
            &db,
            application.id,
            review(rejecter.id, ReviewDecision::Verify),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        let result = review_application(
            &db,
            application.id,
            review(outsider.id, ReviewDecision::Cancel),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        // Nothing was written
        let unchanged = get_application(&db, application.id).await?.unwrap();
        assert_eq!(unchanged.kyc_status, KycStatus::Pending);
        assert!(unchanged.reviewer_id.is_none());

        // Either review permission is enough to ask for more information
        let reviewed = review_application(
            &db,
            application.id,
            review(rejecter.id, ReviewDecision::RequestAction),
        )
        .await?;
        assert_eq!(reviewed.kyc_status, KycStatus::ActionRequired);

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_terminal_states_cannot_be_reviewed() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let reviewer = create_staff_user(
            &db,
            "staff@example.com",
            &[Permission::VerifyKyc, Permission::RejectKyc],
        )
        .await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;

        review_application(
            &db,
            application.id,
            review(reviewer.id, ReviewDecision::RequestAction),
        )
        .await?;
        review_application(&db, application.id, review(reviewer.id, ReviewDecision::Cancel)).await?;

        let result = review_application(
            &db,
            application.id,
            review(reviewer.id, ReviewDecision::Verify),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition { from, to } if from == "cancelled" && to == "verified"
        ));

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_review_unknown_application() -> Result<()> {
        let db = setup_test_db().await?;
        let reviewer = create_staff_user(&db, "staff@example.com", &[Permission::VerifyKyc]).await?;

        let result = review_application(
            &db,
            Uuid::new_v4(),
            review(reviewer.id, ReviewDecision::Verify),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_verified_application() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let staff = create_staff_user(
            &db,
            "staff@example.com",
            &[Permission::VerifyKyc, Permission::MergeKyc],
        )
        .await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;

        // Not verified yet
        let result = merge_into_user(&db, application.id, staff.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        review_application(&db, application.id, review(staff.id, ReviewDecision::Verify)).await?;
        let merged = merge_into_user(&db, application.id, staff.id).await?;
        assert_eq!(merged.first_name.as_deref(), Some("Anna Maria"));
        assert_eq!(merged.last_name.as_deref(), Some("Schmidt"));
        assert_eq!(merged.name, "Anna Maria Schmidt");
        assert_eq!(merged.date_of_birth, Some(date(1990, 6, 15)));
        assert_eq!(merged.place_of_birth.as_deref(), Some("Munich"));
        assert_eq!(merged.country_of_residence_id, Some(country.id));

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_merge_requires_permission() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        let verifier = create_staff_user(&db, "staff@example.com", &[Permission::VerifyKyc]).await?;
        let application = create_test_application(&db, &store, user.id, country.id).await?;
        review_application(
            &db,
            application.id,
            review(verifier.id, ReviewDecision::Verify),
        )
        .await?;

        let result = merge_into_user(&db, application.id, verifier.id).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }

    #[tokio::test]
    async fn test_applications_removed_with_user() -> Result<()> {
        let db = setup_test_db().await?;
        let store = test_store();
        let country = create_test_country(&db, "Germany", "DE").await?;
        let user = create_test_user(&db, "anna@example.com").await?;
        create_test_application(&db, &store, user.id, country.id).await?;

        User::delete_by_id(user.id).exec(&db).await?;
        assert!(list_applications_for_user(&db, user.id).await?.is_empty());

        std::fs::remove_dir_all(store.root()).ok();
        Ok(())
    }
}
