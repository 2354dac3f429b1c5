//! Admin JSON routes under `/admin`.
//!
//! Every route requires an active staff actor identified by the `X-Actor-Id`
//! header. KYC review decisions additionally need the matching staff
//! permission, checked in [`crate::core::kyc`].

use crate::{
    core::{
        admin::{self, ListQuery},
        kyc::{self, ReviewDecision, ReviewRequest},
        location,
        user::require_staff,
    },
    entities::user,
    errors::{Error, Result},
    storage::{DocumentKind, DocumentStore},
    web::ApiResponse,
};
use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

/// Header carrying the acting staff member's id
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Body of a review request; the reviewer comes from the actor header
#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    /// The decision, tagged by `action`
    #[serde(flatten)]
    pub decision: ReviewDecision,
    /// Note stored with the status change
    pub note: Option<String>,
}

fn actor_id(req: &HttpRequest) -> Result<Uuid> {
    req.headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| Error::PermissionDenied {
            reason: format!("Missing or invalid {ACTOR_HEADER} header"),
        })
}

async fn staff_actor(req: &HttpRequest, db: &DatabaseConnection) -> Result<user::Model> {
    require_staff(db, actor_id(req)?).await
}

fn peer_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

#[get("/countries")]
async fn list_countries(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_countries(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[delete("/countries/{country_id}")]
async fn delete_country(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    country_id: web::Path<i64>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    location::delete_country(&db, country_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/states")]
async fn list_states(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_states(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[get("/cities")]
async fn list_cities(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_cities(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[get("/users")]
async fn list_users(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_users(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[get("/user-addresses")]
async fn list_user_addresses(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_user_addresses(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[get("/team-members")]
async fn list_team_members(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = admin::list_team(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[get("/kyc/pending")]
async fn list_pending_applications(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let rows = kyc::list_pending_applications(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rows)))
}

#[post("/kyc/{application_id}/review")]
async fn review_application(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    application_id: web::Path<Uuid>,
    body: web::Json<ReviewBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let request = ReviewRequest {
        reviewer_id: actor_id(&req)?,
        decision: body.decision,
        note: body.note,
        reviewer_ip: peer_ip(&req),
    };
    let updated = kyc::review_application(&db, application_id.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[post("/kyc/{application_id}/merge")]
async fn merge_application(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    application_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let merged = kyc::merge_into_user(&db, application_id.into_inner(), actor_id(&req)?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(merged)))
}

#[get("/kyc/{application_id}/documents/{kind}")]
async fn download_document(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    store: web::Data<DocumentStore>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse> {
    staff_actor(&req, &db).await?;
    let (application_id, kind_name) = path.into_inner();
    let kind = DocumentKind::parse(&kind_name)
        .ok_or_else(|| Error::not_found("DocumentKind", &kind_name))?;

    let application = kyc::get_application(&db, application_id)
        .await?
        .ok_or_else(|| Error::not_found("KycApplication", application_id))?;
    let relative = kyc::document_path(&application, kind)
        .ok_or_else(|| Error::not_found("Document", kind.as_str()))?;

    let bytes = store.read(relative).await?;
    debug!("Serving {} for application {}", kind.as_str(), application_id);
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .body(bytes))
}

/// Registers the admin routes under `/admin`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(list_countries)
            .service(delete_country)
            .service(list_states)
            .service(list_cities)
            .service(list_users)
            .service(list_user_addresses)
            .service(list_team_members)
            .service(list_pending_applications)
            .service(review_application)
            .service(merge_application)
            .service(download_document),
    );
}
