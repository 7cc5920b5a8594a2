//! Session record reconciliation

use common::error::DatabaseResult;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{identity::SessionToken, models::Session, repositories::RecordStore};

/// Result of reconciling a token with the record store
#[derive(Debug)]
pub enum Reconciled {
    /// A record for the token was already stored
    Existing,
    /// A record was inserted by this call
    Created(Session),
}

/// Keeps exactly one session record per token
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn RecordStore>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Ensure a session record exists for `token`
    ///
    /// A failed lookup is logged and the insert is attempted anyway. An
    /// insert rejected by the uniqueness constraint means another request
    /// stored the token first, which satisfies the postcondition.
    pub async fn ensure_exists(&self, token: &SessionToken) -> DatabaseResult<Reconciled> {
        match self.store.find_session_by_token(token).await {
            Ok(Some(_)) => {
                info!("Session {} already exists, skipping insert", token);
                return Ok(Reconciled::Existing);
            }
            Ok(None) => {}
            Err(e) => warn!("Session lookup failed for {}, attempting insert: {}", token, e),
        }

        info!("Inserting new session: {}", token);

        match self.store.create_session(token).await {
            Ok(session) => {
                info!("Session record created with ID: {}", session.id);
                Ok(Reconciled::Created(session))
            }
            Err(e) if e.is_unique_violation() => {
                info!("Session {} was stored concurrently, nothing to insert", token);
                Ok(Reconciled::Existing)
            }
            Err(e) => {
                error!("Failed to insert session {}: {}", token, e);
                Err(e)
            }
        }
    }
}
