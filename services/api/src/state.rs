//! Application state shared across handlers

use std::sync::Arc;
use time::Duration;

use crate::{
    identity::{CookieSettings, IdentityResolver},
    repositories::RecordStore,
    session::SessionManager,
    settings::ServerConfig,
    submissions::SubmissionWriter,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub identity: IdentityResolver,
    pub sessions: SessionManager,
    pub submissions: SubmissionWriter,
}

impl AppState {
    /// Wire the handlers' collaborators around one record store
    pub fn new(store: Arc<dyn RecordStore>, config: &ServerConfig) -> Self {
        let identity = IdentityResolver::new(CookieSettings {
            secure: config.cookie_secure,
            max_age: Duration::days(config.cookie_max_age_days),
        });

        Self {
            identity,
            sessions: SessionManager::new(store.clone()),
            submissions: SubmissionWriter::new(store.clone(), config.require_known_session),
            store,
        }
    }
}
