//! HTTP layer - content pages, admin listings and the KYC review endpoints.
//!
//! Handlers are thin: they extract input, call into [`crate::core`] and wrap
//! the result. Errors surface through the [`ResponseError`] implementation on
//! [`Error`], which picks the status code and writes an [`ApiResponse`] body.

/// Admin JSON routes
pub mod admin;
/// Server-rendered content pages
pub mod pages;

use crate::{
    config::settings::Settings,
    errors::{Error, Result},
    storage::DocumentStore,
};
use actix_web::{
    App, HttpResponse, HttpServer, Responder, ResponseError, get, http::StatusCode,
    middleware::Logger, web,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{error, info};

/// JSON envelope for every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Message on failure
    pub error: Option<String>,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed response carrying a message.
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidSort { .. } => StatusCode::BAD_REQUEST,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateEmail { .. }
            | Self::Constraint { .. }
            | Self::CountryInUse { .. }
            | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Config { .. } | Self::Database { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ApiResponse::<()>::error(message))
    }
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "vigolend",
        "timestamp": Utc::now()
    }))
}

/// Registers every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .configure(pages::configure)
        .configure(admin::configure);
}

/// Serves the application until the server is stopped.
///
/// # Errors
/// Returns an I/O error if the address cannot be bound or the server fails.
pub async fn run_server(
    settings: &Settings,
    db: DatabaseConnection,
    store: DocumentStore,
) -> Result<()> {
    let db = web::Data::new(db);
    let store = web::Data::new(store);
    let bind_address = settings.bind_address();

    info!("Starting VigoLend on {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(store.clone())
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
