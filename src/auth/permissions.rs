use crate::error::{ClientError, ClientResult};
use crate::models::{Comment, Post, Session};

/// Authors and admins may delete a post.
pub fn can_delete_post(session: Option<&Session>, post: &Post) -> bool {
    match session {
        Some(s) => s.is_admin() || post.author_id() == Some(s.user_id.as_str()),
        None => false,
    }
}

/// Authors and admins may delete a comment.
pub fn can_delete_comment(session: Option<&Session>, comment: &Comment) -> bool {
    match session {
        Some(s) => s.is_admin() || comment.author_id() == Some(s.user_id.as_str()),
        None => false,
    }
}

pub fn require_session(session: Option<Session>) -> ClientResult<Session> {
    session.ok_or(ClientError::Unauthenticated)
}

pub fn require_admin(session: Option<Session>) -> ClientResult<Session> {
    let session = require_session(session)?;
    if !session.is_admin() {
        return Err(ClientError::Unauthorized);
    }
    Ok(session)
}
