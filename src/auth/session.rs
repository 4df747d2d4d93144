use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::Session;

#[derive(Debug, Default)]
struct Slot {
    session: Option<Session>,
    ready: bool,
}

/// Process-wide session. Read through [`SessionStore::current`]; written only
/// by the auth handlers and by a forced logout after a 401.
#[derive(Clone, Default)]
pub struct SessionStore {
    slot: Arc<RwLock<Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Session> {
        self.slot.read().await.session.clone()
    }

    /// True once the bootstrap check has finished, whatever its outcome.
    pub async fn is_ready(&self) -> bool {
        self.slot.read().await.ready
    }

    pub(crate) async fn establish(&self, session: Session) {
        let mut slot = self.slot.write().await;
        tracing::info!("Signed in as {} ({:?})", session.username, session.role);
        slot.session = Some(session);
        slot.ready = true;
    }

    pub(crate) async fn mark_ready(&self, session: Option<Session>) {
        let mut slot = self.slot.write().await;
        slot.session = session;
        slot.ready = true;
    }

    pub(crate) async fn clear(&self) -> Option<Session> {
        let mut slot = self.slot.write().await;
        slot.ready = true;
        slot.session.take()
    }

    /// Drop the session because the server rejected our credentials.
    pub(crate) async fn force_logout(&self, op: &str) {
        if let Some(previous) = self.clear().await {
            tracing::warn!(
                "{} returned 401, signing out {}",
                op,
                previous.username
            );
        }
    }
}
