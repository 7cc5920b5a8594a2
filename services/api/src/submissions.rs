//! Submission persistence

use common::error::DatabaseError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    identity::SessionToken,
    models::{Attachment, NewSubmission, Submission},
    repositories::RecordStore,
};

/// Reasons a submission could not be stored
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// No session record holds the presented token
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// The record store rejected or failed the operation
    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

/// Writes prompt and diagram submissions
#[derive(Clone)]
pub struct SubmissionWriter {
    store: Arc<dyn RecordStore>,
    require_known_session: bool,
}

impl SubmissionWriter {
    /// Create a new submission writer
    pub fn new(store: Arc<dyn RecordStore>, require_known_session: bool) -> Self {
        Self {
            store,
            require_known_session,
        }
    }

    /// Persist one submission for `token` in a single write
    pub async fn record(
        &self,
        token: &SessionToken,
        prompt: String,
        diagram: Attachment,
    ) -> Result<Submission, SubmissionError> {
        if self.require_known_session && self.store.find_session_by_token(token).await?.is_none()
        {
            warn!("Rejecting submission from unknown session {}", token);
            return Err(SubmissionError::UnknownSession(token.to_string()));
        }

        let new_submission = NewSubmission {
            session_token: token.clone(),
            prompt,
            diagram,
        };

        let submission = self
            .store
            .create_submission(&new_submission)
            .await
            .map_err(|e| {
                error!("Failed to save submission for {}: {}", token, e);
                e
            })?;

        info!(
            "Diagram record created with ID: {} ({} bytes)",
            submission.id, submission.diagram_size
        );
        Ok(submission)
    }
}
