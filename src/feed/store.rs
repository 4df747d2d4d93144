use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::error::ClientResult;
use crate::models::Post;
use crate::mutation::transitions::{restore, transition, Action, Rollback};

/// The posts of the current view plus the view's epoch. A new epoch starts
/// whenever the view is reloaded or closed; responses tagged with an older
/// epoch must not touch the posts.
///
/// Posts removed optimistically stay in `removed` until their delete settles,
/// so other mutations on them can still be reconciled.
#[derive(Debug, Default)]
pub struct Feed {
    pub(crate) posts: Vec<Post>,
    removed: HashMap<String, Post>,
    epoch: u64,
}

impl Feed {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// A listed post, or one whose removal is still pending.
    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Post> {
        match self.posts.iter_mut().find(|p| p.id == id) {
            Some(post) => Some(post),
            None => self.removed.get_mut(id),
        }
    }

    pub fn is_pending_removal(&self, id: &str) -> bool {
        self.removed.contains_key(id)
    }

    /// Start a new view: later responses from the old one become stale.
    pub(crate) fn begin_view(&mut self) -> u64 {
        self.epoch += 1;
        self.posts.clear();
        self.removed.clear();
        self.epoch
    }

    /// Apply an optimistic step and return what it displaced.
    pub(crate) fn apply(&mut self, action: &Action) -> ClientResult<Rollback> {
        let (next, rollback) = transition(&self.posts, action)?;
        self.posts = next;
        if let Rollback::Post { post, .. } = &rollback {
            self.removed.insert(post.id.clone(), post.clone());
        }
        Ok(rollback)
    }

    /// Undo an optimistic step. A removed post comes back as it is now, with
    /// whatever other mutations settled while it was hidden.
    pub(crate) fn roll_back(&mut self, rollback: Rollback) {
        match rollback {
            Rollback::Post { index, post } => {
                let post = self.removed.remove(&post.id).unwrap_or(post);
                self.posts = restore(&self.posts, Rollback::Post { index, post });
            }
            rollback if self.get(rollback.post_id()).is_some() => {
                self.posts = restore(&self.posts, rollback);
            }
            rollback => {
                if let Some(hidden) = self.removed.get_mut(rollback.post_id()) {
                    let restored = restore(std::slice::from_ref(hidden), rollback);
                    if let Some(post) = restored.into_iter().next() {
                        *hidden = post;
                    }
                }
            }
        }
    }

    /// The server confirmed the removal.
    pub(crate) fn confirm_removal(&mut self, id: &str) {
        self.removed.remove(id);
    }

    /// Drop a post the server no longer has.
    pub(crate) fn forget(&mut self, id: &str) {
        self.posts.retain(|p| p.id != id);
        self.removed.remove(id);
    }
}

/// Shared post collection. Only the mutation controller writes to it.
#[derive(Clone, Default)]
pub struct PostStore {
    feed: Arc<RwLock<Feed>>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<Post> {
        self.feed.read().await.posts.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Post> {
        self.feed.read().await.get(id).cloned()
    }

    pub async fn epoch(&self) -> u64 {
        self.feed.read().await.epoch
    }

    pub async fn len(&self) -> usize {
        self.feed.read().await.posts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.feed.read().await.posts.is_empty()
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Feed> {
        self.feed.write().await
    }
}
