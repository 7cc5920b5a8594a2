//! Record store access for sessions and submissions

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    identity::SessionToken,
    models::{NewSubmission, Session, Submission},
};

#[cfg(test)]
pub mod memory;

/// Create and find-by-field operations over the session and submission
/// collections
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the session record holding `token`
    async fn find_session_by_token(&self, token: &SessionToken) -> DatabaseResult<Option<Session>>;

    /// Insert a session record for `token`
    ///
    /// Fails with [`DatabaseError::UniqueViolation`] if one already exists.
    async fn create_session(&self, token: &SessionToken) -> DatabaseResult<Session>;

    /// Insert a submission record together with its attachment
    async fn create_submission(&self, submission: &NewSubmission) -> DatabaseResult<Submission>;

    /// All submissions stored for `token`, oldest first, without attachment
    /// bytes
    async fn find_submissions_by_token(
        &self,
        token: &SessionToken,
    ) -> DatabaseResult<Vec<Submission>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> DatabaseResult<bool>;
}

/// PostgreSQL-backed record store
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new record store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_session_by_token(&self, token: &SessionToken) -> DatabaseResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, token, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn create_session(&self, token: &SessionToken) -> DatabaseResult<Session> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, token)
            VALUES ($1, $2)
            RETURNING id, token, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)
    }

    async fn create_submission(&self, submission: &NewSubmission) -> DatabaseResult<Submission> {
        let row = sqlx::query(
            r#"
            INSERT INTO submissions
                (id, session_token, prompt, diagram_name, diagram_content_type, diagram)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, session_token, prompt, diagram_name, diagram_content_type,
                      octet_length(diagram)::BIGINT AS diagram_size, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submission.session_token.as_str())
        .bind(&submission.prompt)
        .bind(&submission.diagram.file_name)
        .bind(submission.diagram.content_type.as_deref())
        .bind(&submission.diagram.data[..])
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(submission_from_row(&row))
    }

    async fn find_submissions_by_token(
        &self,
        token: &SessionToken,
    ) -> DatabaseResult<Vec<Submission>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_token, prompt, diagram_name, diagram_content_type,
                   octet_length(diagram)::BIGINT AS diagram_size, created_at
            FROM submissions
            WHERE session_token = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(token.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows.iter().map(submission_from_row).collect())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}

fn submission_from_row(row: &PgRow) -> Submission {
    Submission {
        id: row.get("id"),
        session_token: row.get("session_token"),
        prompt: row.get("prompt"),
        diagram_name: row.get("diagram_name"),
        diagram_content_type: row.get("diagram_content_type"),
        diagram_size: row.get("diagram_size"),
        created_at: row.get("created_at"),
    }
}
