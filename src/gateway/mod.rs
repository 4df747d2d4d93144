//! Remote data gateway: the REST surface of the blog service.
//!
//! `BlogGateway` is the seam between local state and the network. `HttpGateway`
//! talks to a real deployment; `FakeGateway` is an in-memory double used by the
//! test suite. Callers go through [`Remote`], which bounds every call with a
//! timeout and turns a 401 into a forced logout.

pub mod fake;
pub mod http;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::session::SessionStore;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    CommentResponse, Credentials, LikeResponse, Post, PostDraft, RegisterResponse, Registration,
    SearchHit, User,
};

pub use fake::FakeGateway;
pub use http::HttpGateway;

#[async_trait]
pub trait BlogGateway: Send + Sync {
    /// GET /api/auth/me
    async fn me(&self) -> ClientResult<User>;
    /// POST /api/auth/login. Some deployments omit the user from the body.
    async fn login(&self, credentials: &Credentials) -> ClientResult<Option<User>>;
    /// POST /api/auth/register
    async fn register(&self, registration: &Registration) -> ClientResult<RegisterResponse>;
    /// POST /api/auth/logout
    async fn logout(&self) -> ClientResult<()>;

    /// GET /api/blogs
    async fn list_posts(&self) -> ClientResult<Vec<Post>>;
    /// GET /api/blogs/search?query=
    async fn search(&self, query: &str) -> ClientResult<Vec<SearchHit>>;
    /// GET /api/blogs/:id
    async fn get_post(&self, id: &str) -> ClientResult<Post>;
    /// GET /api/blogs/genre/:genre
    async fn posts_by_genre(&self, genre: &str) -> ClientResult<Vec<Post>>;
    /// GET /api/blogs/user/me
    async fn my_posts(&self) -> ClientResult<Vec<Post>>;

    /// POST /api/blogs (multipart)
    async fn create_post(&self, draft: &PostDraft) -> ClientResult<Post>;
    /// PUT /api/blogs/:id (multipart)
    async fn update_post(&self, id: &str, draft: &PostDraft) -> ClientResult<Post>;
    /// DELETE /api/blogs/:id
    async fn delete_post(&self, id: &str) -> ClientResult<()>;
    /// PUT /api/blogs/like/:id
    async fn toggle_like(&self, id: &str) -> ClientResult<LikeResponse>;
    /// POST /api/blogs/comment/:id
    async fn add_comment(&self, post_id: &str, text: &str) -> ClientResult<CommentResponse>;
    /// DELETE /api/blogs/comment/:blogId/:commentId
    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> ClientResult<()>;

    /// GET /api/users (admin)
    async fn list_users(&self) -> ClientResult<Vec<User>>;
}

/// A gateway bound to the process session and a per-call deadline.
#[derive(Clone)]
pub struct Remote {
    gateway: Arc<dyn BlogGateway>,
    session: SessionStore,
    timeout: Duration,
}

impl Remote {
    pub fn new(gateway: Arc<dyn BlogGateway>, session: SessionStore, timeout: Duration) -> Self {
        Self {
            gateway,
            session,
            timeout,
        }
    }

    pub fn gateway(&self) -> &dyn BlogGateway {
        self.gateway.as_ref()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Await a gateway call. Expiry of the deadline is a transient failure even
    /// if the transport is still waiting. Any 401 clears the session.
    pub async fn call<T, F>(&self, op: &'static str, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", op, self.timeout);
                Err(ClientError::Transient(format!(
                    "{} timed out after {}s",
                    op,
                    self.timeout.as_secs()
                )))
            }
        };

        if let Err(ClientError::Unauthenticated) = &result {
            self.session.force_logout(op).await;
        }

        result
    }
}
