//! In-memory record store used by handler tests

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::RecordStore;
use crate::{
    identity::SessionToken,
    models::{NewSubmission, Session, Submission},
};

#[derive(Default)]
struct Records {
    sessions: Vec<Session>,
    submissions: Vec<(Submission, Bytes)>,
}

/// Record store kept in process memory, with switches to inject failures
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Records>,
    fail_lookups: AtomicBool,
    fail_writes: AtomicBool,
    lose_insert_race: AtomicBool,
    lookups: AtomicUsize,
    writes: AtomicUsize,
}

fn unavailable() -> DatabaseError {
    DatabaseError::Query(sqlx::Error::PoolTimedOut)
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next session insert behave as if a concurrent request
    /// inserted the same token between lookup and insert
    pub fn lose_insert_race(&self) {
        self.lose_insert_race.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn seed_session(&self, token: &str) {
        self.records.lock().await.sessions.push(Session {
            id: Uuid::new_v4(),
            token: token.to_string(),
            created_at: Utc::now(),
        });
    }

    pub async fn sessions_with_token(&self, token: &str) -> usize {
        self.records
            .lock()
            .await
            .sessions
            .iter()
            .filter(|session| session.token == token)
            .count()
    }

    pub async fn session_count(&self) -> usize {
        self.records.lock().await.sessions.len()
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.records
            .lock()
            .await
            .submissions
            .iter()
            .map(|(submission, _)| submission.clone())
            .collect()
    }

    pub async fn attachment_data(&self, id: Uuid) -> Option<Bytes> {
        self.records
            .lock()
            .await
            .submissions
            .iter()
            .find(|(submission, _)| submission.id == id)
            .map(|(_, data)| data.clone())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_session_by_token(&self, token: &SessionToken) -> DatabaseResult<Option<Session>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        Ok(self
            .records
            .lock()
            .await
            .sessions
            .iter()
            .find(|session| session.token == token.as_str())
            .cloned())
    }

    async fn create_session(&self, token: &SessionToken) -> DatabaseResult<Session> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let mut records = self.records.lock().await;

        if self.lose_insert_race.swap(false, Ordering::SeqCst) {
            records.sessions.push(Session {
                id: Uuid::new_v4(),
                token: token.to_string(),
                created_at: Utc::now(),
            });
        }

        if records.sessions.iter().any(|s| s.token == token.as_str()) {
            return Err(DatabaseError::UniqueViolation(
                "sessions_token_key".to_string(),
            ));
        }

        let session = Session {
            id: Uuid::new_v4(),
            token: token.to_string(),
            created_at: Utc::now(),
        };
        records.sessions.push(session.clone());
        Ok(session)
    }

    async fn create_submission(&self, submission: &NewSubmission) -> DatabaseResult<Submission> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let stored = Submission {
            id: Uuid::new_v4(),
            session_token: submission.session_token.to_string(),
            prompt: submission.prompt.clone(),
            diagram_name: submission.diagram.file_name.clone(),
            diagram_content_type: submission.diagram.content_type.clone(),
            diagram_size: submission.diagram.data.len() as i64,
            created_at: Utc::now(),
        };

        self.records
            .lock()
            .await
            .submissions
            .push((stored.clone(), submission.diagram.data.clone()));
        Ok(stored)
    }

    async fn find_submissions_by_token(
        &self,
        token: &SessionToken,
    ) -> DatabaseResult<Vec<Submission>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        Ok(self
            .records
            .lock()
            .await
            .submissions
            .iter()
            .filter(|(submission, _)| submission.session_token == token.as_str())
            .map(|(submission, _)| submission.clone())
            .collect())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(!self.fail_lookups.load(Ordering::SeqCst))
    }
}
