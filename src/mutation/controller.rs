use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::inflight::{Inflight, MutationKind, Phase, Ticket};
use super::transitions::{Action, Rollback};
use crate::auth::permissions;
use crate::error::{ClientError, ClientResult};
use crate::feed::store::{Feed, PostStore};
use crate::gateway::Remote;
use crate::models::{Comment, CommentResponse, LikeResponse, Post, PostDraft, Session};
use crate::notify::Notifier;
use crate::validate;

/// How a mutation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The server agreed and local state now reflects its answer.
    Committed(T),
    /// Another invocation for the same key was still pending.
    Ignored,
    /// The view was closed or reloaded before the answer arrived.
    Stale,
}

impl<T> Outcome<T> {
    pub fn committed(self) -> Option<T> {
        match self {
            Outcome::Committed(value) => Some(value),
            _ => None,
        }
    }
}

/// The only writer of the shared post collection.
///
/// Each mutation is applied locally first, then the remote call runs on its
/// own task so that dropping the caller cannot strand an optimistic change.
#[derive(Clone)]
pub struct MutationController {
    pub(super) remote: Remote,
    pub(super) store: PostStore,
    pub(super) inflight: Arc<Inflight>,
    pub(super) notifier: Notifier,
}

impl MutationController {
    pub fn new(remote: Remote, store: PostStore, notifier: Notifier) -> Self {
        Self {
            remote,
            store,
            inflight: Inflight::new(),
            notifier,
        }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn phase(&self, kind: MutationKind, id: &str) -> Phase {
        self.inflight.phase(kind, id)
    }

    pub async fn can_delete_post(&self, post: &Post) -> bool {
        permissions::can_delete_post(self.remote.session().current().await.as_ref(), post)
    }

    pub async fn can_delete_comment(&self, comment: &Comment) -> bool {
        permissions::can_delete_comment(self.remote.session().current().await.as_ref(), comment)
    }

    pub(super) async fn session_or_warn(&self, action: &str) -> ClientResult<Session> {
        match self.remote.session().current().await {
            Some(session) => Ok(session),
            None => {
                self.notifier
                    .warn(format!("Please log in to {}!", action));
                Err(ClientError::Unauthenticated)
            }
        }
    }

    /// Like or unlike a post for the session user.
    pub async fn toggle_like(&self, post_id: &str) -> ClientResult<Outcome<BTreeSet<String>>> {
        let session = self.session_or_warn("like blogs").await?;
        let Some(ticket) = self.inflight.begin(MutationKind::ToggleLike, post_id) else {
            tracing::debug!("Like for {} already in flight, ignoring", post_id);
            return Ok(Outcome::Ignored);
        };

        let action = Action::ToggleLike {
            post_id: post_id.to_string(),
            user_id: session.user_id,
        };
        let (epoch, rollback) = match self.apply(&action).await {
            Ok(applied) => applied,
            Err(e) => {
                ticket.release();
                return Err(e);
            }
        };

        let remote = self.remote.clone();
        let id = post_id.to_string();
        let call = async move { remote.call("toggle_like", remote.gateway().toggle_like(&id)).await };

        let id = post_id.to_string();
        let handle = self.settle(ticket, epoch, post_id, Some(rollback), call, move |feed, response: LikeResponse| {
            if let Some(post) = feed.get_mut(&id) {
                post.liked_by = response.likes.clone();
            }
            response
        });

        let outcome = join(handle).await?;
        Ok(match outcome {
            Outcome::Committed(response) => {
                self.notifier
                    .success(response.message.unwrap_or_else(|| "Like updated!".to_string()));
                Outcome::Committed(response.likes)
            }
            Outcome::Ignored => Outcome::Ignored,
            Outcome::Stale => Outcome::Stale,
        })
    }

    /// Append a comment. Nothing is shown until the server assigns the id.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> ClientResult<Outcome<Vec<Comment>>> {
        self.session_or_warn("comment").await?;
        let text = match validate::comment(text) {
            Ok(text) => text,
            Err(e) => {
                self.notifier.warn(e.notice());
                return Err(e);
            }
        };

        let Some(ticket) = self.inflight.begin(MutationKind::AddComment, post_id) else {
            tracing::debug!("Comment on {} already in flight, ignoring", post_id);
            return Ok(Outcome::Ignored);
        };

        let epoch = {
            let feed = self.store.write().await;
            if feed.get(post_id).is_none() {
                ticket.release();
                return Err(ClientError::NotFound);
            }
            feed.epoch()
        };

        let remote = self.remote.clone();
        let id = post_id.to_string();
        let call = async move {
            remote
                .call("add_comment", remote.gateway().add_comment(&id, &text))
                .await
        };

        let id = post_id.to_string();
        let handle = self.settle(ticket, epoch, post_id, None, call, move |feed, response: CommentResponse| {
            let comments = response.into_comments();
            if let Some(post) = feed.get_mut(&id) {
                post.comments = comments.clone();
            }
            comments
        });

        let outcome = join(handle).await?;
        if let Outcome::Committed(_) = outcome {
            self.notifier.success("Comment added!");
        }
        Ok(outcome)
    }

    /// Remove a comment immediately; it comes back at the same position if the
    /// server refuses.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> ClientResult<Outcome<()>> {
        self.session_or_warn("delete comments").await?;
        let Some(ticket) = self.inflight.begin(MutationKind::DeleteComment, comment_id) else {
            tracing::debug!("Delete of comment {} already in flight, ignoring", comment_id);
            return Ok(Outcome::Ignored);
        };

        let action = Action::RemoveComment {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
        };
        let (epoch, rollback) = match self.apply(&action).await {
            Ok(applied) => applied,
            Err(e) => {
                ticket.release();
                return Err(e);
            }
        };

        let remote = self.remote.clone();
        let (pid, cid) = (post_id.to_string(), comment_id.to_string());
        let call = async move {
            remote
                .call("delete_comment", remote.gateway().delete_comment(&pid, &cid))
                .await
        };

        let handle = self.settle(ticket, epoch, post_id, Some(rollback), call, |_, ()| ());
        let outcome = join(handle).await?;
        if let Outcome::Committed(_) = outcome {
            self.notifier.success("Comment deleted!");
        }
        Ok(outcome)
    }

    /// Remove a post immediately; it comes back at the same index if the
    /// server refuses.
    pub async fn delete_post(&self, post_id: &str) -> ClientResult<Outcome<()>> {
        self.session_or_warn("delete blogs").await?;
        let Some(ticket) = self.inflight.begin(MutationKind::DeletePost, post_id) else {
            tracing::debug!("Delete of {} already in flight, ignoring", post_id);
            return Ok(Outcome::Ignored);
        };

        let action = Action::RemovePost {
            post_id: post_id.to_string(),
        };
        let (epoch, rollback) = match self.apply(&action).await {
            Ok(applied) => applied,
            Err(e) => {
                ticket.release();
                return Err(e);
            }
        };

        let remote = self.remote.clone();
        let id = post_id.to_string();
        let call = async move { remote.call("delete_post", remote.gateway().delete_post(&id)).await };

        let id = post_id.to_string();
        let handle = self.settle(ticket, epoch, post_id, Some(rollback), call, move |feed, ()| {
            feed.confirm_removal(&id);
        });
        let outcome = join(handle).await?;
        if let Outcome::Committed(_) = outcome {
            self.notifier.success("Blog deleted!");
        }
        Ok(outcome)
    }

    /// Publish a new post; it is prepended to the current view.
    pub async fn create_post(&self, draft: PostDraft) -> ClientResult<Post> {
        self.session_or_warn("create blogs").await?;
        if let Err(e) = validate::draft(&draft) {
            self.notifier.warn(e.notice());
            return Err(e);
        }

        let epoch = self.store.epoch().await;
        let result = self
            .remote
            .call("create_post", self.remote.gateway().create_post(&draft))
            .await;
        let post = match result {
            Ok(post) => post,
            Err(e) => {
                self.notifier.error(e.notice());
                return Err(e);
            }
        };

        let mut feed = self.store.write().await;
        if feed.epoch() == epoch && feed.get(&post.id).is_none() {
            feed.posts.insert(0, post.clone());
        }
        self.notifier.success("Blog created successfully!");
        Ok(post)
    }

    /// Replace a post's title, content, genre and optionally its image.
    pub async fn update_post(&self, post_id: &str, draft: PostDraft) -> ClientResult<Outcome<Post>> {
        self.session_or_warn("edit blogs").await?;
        if let Err(e) = validate::draft(&draft) {
            self.notifier.warn(e.notice());
            return Err(e);
        }
        let Some(ticket) = self.inflight.begin(MutationKind::UpdatePost, post_id) else {
            tracing::debug!("Update of {} already in flight, ignoring", post_id);
            return Ok(Outcome::Ignored);
        };

        let epoch = self.store.epoch().await;
        let remote = self.remote.clone();
        let id = post_id.to_string();
        let call = async move {
            remote
                .call("update_post", remote.gateway().update_post(&id, &draft))
                .await
        };

        let id = post_id.to_string();
        let handle = self.settle(ticket, epoch, post_id, None, call, move |feed, post: Post| {
            if let Some(existing) = feed.get_mut(&id) {
                *existing = post.clone();
            }
            post
        });

        let outcome = join(handle).await?;
        if let Outcome::Committed(_) = outcome {
            self.notifier.success("Blog updated successfully!");
        }
        Ok(outcome)
    }

    /// Run `action` against the store. Returns the epoch it was applied in
    /// and what it displaced.
    async fn apply(&self, action: &Action) -> ClientResult<(u64, Rollback)> {
        let mut feed = self.store.write().await;
        let rollback = feed.apply(action)?;
        Ok((feed.epoch(), rollback))
    }

    /// Await the remote call on its own task, then commit through `commit` or
    /// restore `rollback`. Nothing is touched if the epoch moved. When the
    /// server no longer has `post_id` the post is dropped instead.
    fn settle<R, T, F, C>(
        &self,
        ticket: Ticket,
        epoch: u64,
        post_id: &str,
        rollback: Option<Rollback>,
        call: F,
        commit: C,
    ) -> JoinHandle<ClientResult<Outcome<T>>>
    where
        R: Send + 'static,
        T: Send + 'static,
        F: Future<Output = ClientResult<R>> + Send + 'static,
        C: FnOnce(&mut Feed, R) -> T + Send + 'static,
    {
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let post_id = post_id.to_string();

        tokio::spawn(async move {
            let result = call.await;
            let mut feed = store.write().await;

            if feed.epoch() != epoch {
                tracing::debug!("View changed before the response arrived, dropping it");
                return match result {
                    Ok(_) => {
                        ticket.commit();
                        Ok(Outcome::Stale)
                    }
                    Err(e) => {
                        ticket.roll_back();
                        Err(e)
                    }
                };
            }

            match result {
                Ok(response) => {
                    let value = commit(&mut *feed, response);
                    ticket.commit();
                    Ok(Outcome::Committed(value))
                }
                Err(ClientError::NotFound) => {
                    match rollback {
                        // The comment is gone on the server as well.
                        Some(Rollback::Comment { .. }) => {}
                        _ => feed.forget(&post_id),
                    }
                    ticket.roll_back();
                    tracing::warn!("{} no longer exists on the server, dropping it", post_id);
                    notifier.error(ClientError::NotFound.notice());
                    Err(ClientError::NotFound)
                }
                Err(e) => {
                    if let Some(rollback) = rollback {
                        feed.roll_back(rollback);
                    }
                    ticket.roll_back();
                    tracing::warn!("Mutation rolled back: {}", e);
                    notifier.error(e.notice());
                    Err(e)
                }
            }
        })
    }
}

async fn join<T>(handle: JoinHandle<ClientResult<Outcome<T>>>) -> ClientResult<Outcome<T>> {
    handle
        .await
        .map_err(|e| ClientError::Internal(format!("mutation task failed: {}", e)))?
}
