use crate::auth::permissions;
use crate::error::{ClientError, ClientResult};
use crate::models::{Post, User};
use crate::validate;

use super::controller::{MutationController, Outcome};

/// What the current view lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    All,
    Genre(String),
    Mine,
    Single(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub users: Vec<User>,
    pub post_count: usize,
}

impl MutationController {
    /// Open a view: start a new epoch, fetch, and fill the store unless
    /// another view was opened meanwhile. A refused `Mine` leaves the current
    /// view alone.
    pub async fn load(&self, source: FeedSource) -> ClientResult<Outcome<usize>> {
        if source == FeedSource::Mine {
            self.session_or_warn("see your blogs").await?;
        }
        let epoch = self.begin_view().await;

        let result = match &source {
            FeedSource::All => {
                self.remote
                    .call("list_posts", self.remote.gateway().list_posts())
                    .await
            }
            FeedSource::Genre(genre) => {
                let slug = validate::genre_slug(genre);
                self.remote
                    .call("posts_by_genre", self.remote.gateway().posts_by_genre(&slug))
                    .await
            }
            FeedSource::Mine => {
                self.remote
                    .call("my_posts", self.remote.gateway().my_posts())
                    .await
            }
            FeedSource::Single(id) => self
                .remote
                .call("get_post", self.remote.gateway().get_post(id))
                .await
                .map(|post| vec![post]),
        };

        let posts = match result {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", source, e);
                self.notifier.error(e.notice());
                return Err(e);
            }
        };

        Ok(self.fill(epoch, posts).await)
    }

    /// Unmount the current view. Responses still in flight for it become
    /// no-ops.
    pub async fn close(&self) {
        self.begin_view().await;
    }

    /// Users and posts for the admin view, fetched together.
    pub async fn admin_dashboard(&self) -> ClientResult<Dashboard> {
        permissions::require_admin(self.remote.session().current().await)?;
        let epoch = self.begin_view().await;

        let users = self
            .remote
            .call("list_users", self.remote.gateway().list_users());
        let posts = self
            .remote
            .call("list_posts", self.remote.gateway().list_posts());

        let (users, posts) = match futures::try_join!(users, posts) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Failed to fetch admin data: {}", e);
                self.notifier
                    .error("Failed to load data. Please try again later.");
                return Err(e);
            }
        };

        let post_count = posts.len();
        if let Outcome::Stale = self.fill(epoch, posts).await {
            return Err(ClientError::Transient(
                "admin view was closed while loading".into(),
            ));
        }

        Ok(Dashboard { users, post_count })
    }

    /// Settled phases belong to the old view and are dropped with it.
    async fn begin_view(&self) -> u64 {
        let epoch = self.store.write().await.begin_view();
        self.inflight.prune();
        epoch
    }

    async fn fill(&self, epoch: u64, posts: Vec<Post>) -> Outcome<usize> {
        let mut feed = self.store.write().await;
        if feed.epoch() != epoch {
            tracing::debug!("Dropping {} posts for a closed view", posts.len());
            return Outcome::Stale;
        }
        let count = posts.len();
        feed.posts = posts;
        Outcome::Committed(count)
    }
}
