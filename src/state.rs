use std::sync::Arc;

use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::feed::store::PostStore;
use crate::gateway::{BlogGateway, Remote};
use crate::mutation::MutationController;
use crate::notify::Notifier;
use crate::search::SearchDispatcher;

/// Everything a front end needs, wired to one gateway and one session.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub remote: Remote,
    pub session: SessionStore,
    pub posts: MutationController,
    pub search: SearchDispatcher,
    pub notices: Notifier,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn BlogGateway>) -> Self {
        let session = SessionStore::new();
        let notices = Notifier::new();
        let remote = Remote::new(gateway, session.clone(), config.request_timeout());
        let posts = MutationController::new(remote.clone(), PostStore::new(), notices.clone());
        let search = SearchDispatcher::new(remote.clone(), config.debounce());

        Self {
            config,
            remote,
            session,
            posts,
            search,
            notices,
        }
    }
}
