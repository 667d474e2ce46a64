use std::sync::Arc;

use crate::session::SessionStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live session store (connection id -> session)
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}
