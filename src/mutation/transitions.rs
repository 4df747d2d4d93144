//! Transport-free state transitions for optimistic mutations.
//!
//! `transition` maps the prior posts and an action to the optimistic posts plus
//! a rollback record holding the exact values it displaced. `restore` puts
//! those values back.

use std::collections::BTreeSet;

use crate::error::{ClientError, ClientResult};
use crate::models::{Comment, Post};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ToggleLike { post_id: String, user_id: String },
    RemoveComment { post_id: String, comment_id: String },
    RemovePost { post_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    LikedBy {
        post_id: String,
        prior: BTreeSet<String>,
    },
    Comment {
        post_id: String,
        index: usize,
        comment: Comment,
    },
    Post {
        index: usize,
        post: Post,
    },
}

impl Rollback {
    /// The post this record belongs to.
    pub fn post_id(&self) -> &str {
        match self {
            Rollback::LikedBy { post_id, .. } | Rollback::Comment { post_id, .. } => post_id,
            Rollback::Post { post, .. } => &post.id,
        }
    }
}

fn position(posts: &[Post], post_id: &str) -> ClientResult<usize> {
    posts
        .iter()
        .position(|p| p.id == post_id)
        .ok_or(ClientError::NotFound)
}

pub fn transition(prior: &[Post], action: &Action) -> ClientResult<(Vec<Post>, Rollback)> {
    let mut next = prior.to_vec();

    let rollback = match action {
        Action::ToggleLike { post_id, user_id } => {
            let post = &mut next[position(prior, post_id)?];
            let snapshot = post.liked_by.clone();
            if !post.liked_by.remove(user_id) {
                post.liked_by.insert(user_id.clone());
            }
            Rollback::LikedBy {
                post_id: post_id.clone(),
                prior: snapshot,
            }
        }
        Action::RemoveComment {
            post_id,
            comment_id,
        } => {
            let post = &mut next[position(prior, post_id)?];
            let index = post
                .comments
                .iter()
                .position(|c| &c.id == comment_id)
                .ok_or(ClientError::NotFound)?;
            let comment = post.comments.remove(index);
            Rollback::Comment {
                post_id: post_id.clone(),
                index,
                comment,
            }
        }
        Action::RemovePost { post_id } => {
            let index = position(prior, post_id)?;
            let post = next.remove(index);
            Rollback::Post { index, post }
        }
    };

    Ok((next, rollback))
}

/// Undo an optimistic step. Anything that changed in the meantime elsewhere
/// in the collection is kept; positions are clamped to the current length.
pub fn restore(current: &[Post], rollback: Rollback) -> Vec<Post> {
    let mut next = current.to_vec();

    match rollback {
        Rollback::LikedBy { post_id, prior } => {
            if let Some(post) = next.iter_mut().find(|p| p.id == post_id) {
                post.liked_by = prior;
            }
        }
        Rollback::Comment {
            post_id,
            index,
            comment,
        } => {
            if let Some(post) = next.iter_mut().find(|p| p.id == post_id) {
                if !post.comments.iter().any(|c| c.id == comment.id) {
                    let index = index.min(post.comments.len());
                    post.comments.insert(index, comment);
                }
            }
        }
        Rollback::Post { index, post } => {
            if !next.iter().any(|p| p.id == post.id) {
                let index = index.min(next.len());
                next.insert(index, post);
            }
        }
    }

    next
}
