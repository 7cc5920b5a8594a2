//! Records and response payloads for the API service

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::identity::SessionToken;

/// Persisted session record
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Uploaded diagram file
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Submission payload before it is persisted
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub session_token: SessionToken,
    pub prompt: String,
    pub diagram: Attachment,
}

/// Persisted submission record (attachment bytes are not read back)
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub session_token: String,
    pub prompt: String,
    pub diagram_name: String,
    pub diagram_content_type: Option<String>,
    pub diagram_size: i64,
    pub created_at: DateTime<Utc>,
}

/// Status marker shared by all JSON responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response for the identity bootstrap endpoint
#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub status: ResponseStatus,
    pub pbid: String,
    pub message: String,
}

impl BootstrapResponse {
    pub fn connected(token: &SessionToken) -> Self {
        Self {
            status: ResponseStatus::Success,
            pbid: token.to_string(),
            message: "Connected to session store".to_string(),
        }
    }
}

/// Response for a stored submission
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl SubmissionResponse {
    pub fn saved() -> Self {
        Self {
            status: ResponseStatus::Success,
            message: "Sequence diagram saved successfully".to_string(),
        }
    }
}

/// Submission history of one session, oldest first
#[derive(Debug, Serialize)]
pub struct SubmissionListResponse {
    pub status: ResponseStatus,
    pub pbid: String,
    pub submissions: Vec<Submission>,
}

impl SubmissionListResponse {
    pub fn new(token: &SessionToken, submissions: Vec<Submission>) -> Self {
        Self {
            status: ResponseStatus::Success,
            pbid: token.to_string(),
            submissions,
        }
    }
}

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    pub message: String,
}

/// Response for the health endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub database: bool,
}

impl HealthResponse {
    pub fn new(database: bool) -> Self {
        Self {
            status: if database { "ok" } else { "degraded" },
            service: "srauto-api",
            database,
        }
    }
}
