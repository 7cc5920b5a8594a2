//! API service routes

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use config::ConfigError;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    error::{ApiError, ApiResult},
    identity::{SessionToken, presented_token},
    middleware::cors_layer,
    models::{
        Attachment, BootstrapResponse, HealthResponse, SubmissionListResponse, SubmissionResponse,
    },
    settings::ServerConfig,
    state::AppState,
};

const PROMPT_FIELD: &str = "prompt";
const DIAGRAM_FIELD: &str = "diagram";

/// Create the router for the API service
pub fn create_router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(config.allowed_origin_header()?);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/test", get(bootstrap_identity))
        .route("/api/submit-diagram", post(submit_diagram))
        .route("/api/sessions/:token/submissions", get(list_submissions))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.store.health_check().await.unwrap_or_else(|e| {
        error!("Record store health check failed: {}", e);
        false
    });

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(database)))
}

/// Resolve the caller's session and make sure it is stored
///
/// Never fails: reconciliation errors are only logged.
pub async fn bootstrap_identity(
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    let (jar, identity) = state.identity.resolve(jar);

    if identity.is_new {
        info!("New client assigned ID: {}", identity.token);
    } else {
        info!("Client returned with ID: {}", identity.token);
    }

    if let Err(e) = state.sessions.ensure_exists(&identity.token).await {
        error!("Failed to reconcile session {}: {}", identity.token, e);
    }

    (jar, Json(BootstrapResponse::connected(&identity.token)))
}

/// Store a prompt and its diagram for the calling session
pub async fn submit_diagram(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<SubmissionResponse>> {
    let token = presented_token(&jar).ok_or_else(|| {
        warn!("Submission without a valid client_id cookie");
        ApiError::BadRequest("Missing or malformed client_id cookie".to_string())
    })?;

    let mut multipart = multipart.map_err(|e| {
        warn!("Submission is not a multipart form: {}", e);
        ApiError::BadRequest(e.body_text())
    })?;

    let form = read_submission_form(&mut multipart).await?;

    let diagram = form.diagram.ok_or_else(|| {
        warn!("Submission from {} has no diagram file", token);
        ApiError::BadRequest("Failed to read file from request".to_string())
    })?;

    state
        .submissions
        .record(&token, form.prompt, diagram)
        .await?;

    Ok(Json(SubmissionResponse::saved()))
}

/// List the submissions stored under a session token, without file contents
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<SubmissionListResponse>> {
    let token = SessionToken::parse(&token).ok_or_else(|| {
        warn!("Submission listing for malformed token");
        ApiError::BadRequest("Malformed session token".to_string())
    })?;

    let submissions = state
        .store
        .find_submissions_by_token(&token)
        .await
        .map_err(|e| {
            error!("Failed to list submissions for {}: {}", token, e);
            ApiError::from(e)
        })?;

    Ok(Json(SubmissionListResponse::new(&token, submissions)))
}

struct SubmissionForm {
    prompt: String,
    diagram: Option<Attachment>,
}

/// Collect the `prompt` and `diagram` fields, ignoring anything else
///
/// Only the first occurrence of each field is used. A missing prompt reads as
/// empty, and a `diagram` part without a file name does not count as a file.
async fn read_submission_form(multipart: &mut Multipart) -> ApiResult<SubmissionForm> {
    let mut prompt = None;
    let mut diagram = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            PROMPT_FIELD if prompt.is_none() => {
                prompt = Some(field.text().await.map_err(multipart_error)?);
            }
            DIAGRAM_FIELD if diagram.is_none() => {
                // A part without a file name (browsers send `filename=""` for an
                // empty file input) is a plain value, not an attachment.
                let Some(file_name) = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                else {
                    continue;
                };
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(multipart_error)?;

                diagram = Some(Attachment {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(SubmissionForm {
        prompt: prompt.unwrap_or_default(),
        diagram,
    })
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Submission exceeded the upload limit");
        return ApiError::PayloadTooLarge;
    }

    warn!("Failed to read multipart form: {}", err);
    ApiError::BadRequest(format!("Failed to read file from request: {}", err.body_text()))
}
