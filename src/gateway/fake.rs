//! In-memory blog service used as a gateway double.
//!
//! It enforces the same ownership and role rules as the real service, records
//! every call, and can be told to fail or stall specific operations.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::BlogGateway;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AuthorRef, Comment, CommentResponse, Credentials, LikeResponse, Post, PostDraft,
    RegisterResponse, Registration, Role, SearchHit, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Me,
    Login,
    Register,
    Logout,
    ListPosts,
    Search,
    GetPost,
    PostsByGenre,
    MyPosts,
    CreatePost,
    UpdatePost,
    DeletePost,
    ToggleLike,
    AddComment,
    DeleteComment,
    ListUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub args: Vec<String>,
}

/// An injected failure for the next call of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Unauthenticated,
    Unauthorized,
    NotFound,
    Transient,
    /// Never answer; the caller's deadline has to fire.
    Hang,
}

impl Fault {
    fn into_error(self) -> ClientError {
        match self {
            Fault::Unauthenticated => ClientError::Unauthenticated,
            Fault::Unauthorized => ClientError::Unauthorized,
            Fault::NotFound => ClientError::NotFound,
            Fault::Transient | Fault::Hang => {
                ClientError::Transient("injected network failure".into())
            }
        }
    }
}

#[derive(Default)]
struct World {
    accounts: Vec<(User, String)>,
    posts: Vec<Post>,
    signed_in: Option<User>,
    calls: Vec<Call>,
    faults: HashMap<Op, VecDeque<Fault>>,
    latency: HashMap<Op, Duration>,
    search_latency: HashMap<String, Duration>,
}

impl World {
    fn require_user(&self) -> ClientResult<User> {
        self.signed_in.clone().ok_or(ClientError::Unauthenticated)
    }

    fn post_mut(&mut self, id: &str) -> ClientResult<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ClientError::NotFound)
    }
}

#[derive(Default)]
pub struct FakeGateway {
    world: Mutex<World>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_account(self, user: User, password: &str) -> Self {
        self.world().accounts.push((user, password.to_string()));
        self
    }

    pub fn with_post(self, post: Post) -> Self {
        self.world().posts.push(post);
        self
    }

    /// Treat `user` as already signed in on the server side (a live cookie).
    pub fn signed_in_as(self, user: User) -> Self {
        self.world().signed_in = Some(user);
        self
    }

    pub fn fail_next(&self, op: Op, fault: Fault) {
        self.world().faults.entry(op).or_default().push_back(fault);
    }

    pub fn set_latency(&self, op: Op, latency: Duration) {
        self.world().latency.insert(op, latency);
    }

    /// Latency for one specific query, to force out-of-order responses.
    pub fn set_search_latency(&self, query: &str, latency: Duration) {
        self.world()
            .search_latency
            .insert(query.to_string(), latency);
    }

    /// Server-side copy of the posts.
    pub fn posts(&self) -> Vec<Post> {
        self.world().posts.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.world().calls.clone()
    }

    pub fn calls_for(&self, op: Op) -> Vec<Vec<String>> {
        self.world()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.args.clone())
            .collect()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.calls_for(op).len()
    }

    /// Record the call, run `handler` against the world unless a fault is
    /// queued, then wait out the configured latency.
    async fn serve<T>(
        &self,
        op: Op,
        args: &[&str],
        handler: impl FnOnce(&mut World) -> ClientResult<T> + Send,
    ) -> ClientResult<T>
    where
        T: Send,
    {
        let (result, latency, hang) = {
            let mut world = self.world();
            world.calls.push(Call {
                op,
                args: args.iter().map(|a| a.to_string()).collect(),
            });

            let mut latency = world.latency.get(&op).copied();
            if op == Op::Search {
                if let Some(per_query) = args.first().and_then(|q| world.search_latency.get(*q)) {
                    latency = Some(*per_query);
                }
            }

            let fault = world.faults.get_mut(&op).and_then(VecDeque::pop_front);
            match fault {
                Some(Fault::Hang) => (Err(Fault::Hang.into_error()), latency, true),
                Some(fault) => (Err(fault.into_error()), latency, false),
                None => (handler(&mut *world), latency, false),
            }
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

#[async_trait]
impl BlogGateway for FakeGateway {
    async fn me(&self) -> ClientResult<User> {
        self.serve(Op::Me, &[], |w| w.require_user()).await
    }

    async fn login(&self, credentials: &Credentials) -> ClientResult<Option<User>> {
        self.serve(Op::Login, &[&credentials.email], |w| {
            let user = w
                .accounts
                .iter()
                .find(|(u, password)| {
                    u.email.as_deref() == Some(credentials.email.as_str())
                        && *password == credentials.password
                })
                .map(|(u, _)| u.clone())
                .ok_or(ClientError::Unauthenticated)?;
            w.signed_in = Some(user.clone());
            Ok(Some(user))
        })
        .await
    }

    async fn register(&self, registration: &Registration) -> ClientResult<RegisterResponse> {
        self.serve(Op::Register, &[&registration.username], |w| {
            let taken = w.accounts.iter().any(|(u, _)| {
                u.username == registration.username
                    || u.email.as_deref() == Some(registration.email.as_str())
            });
            if taken {
                return Err(ClientError::Conflict("User already exists".into()));
            }
            let user = User {
                id: uuid::Uuid::now_v7().to_string(),
                username: registration.username.clone(),
                email: Some(registration.email.clone()),
                role: Role::User,
            };
            let user_id = user.id.clone();
            w.accounts.push((user, registration.password.clone()));
            Ok(RegisterResponse { user_id })
        })
        .await
    }

    async fn logout(&self) -> ClientResult<()> {
        self.serve(Op::Logout, &[], |w| {
            w.signed_in = None;
            Ok(())
        })
        .await
    }

    async fn list_posts(&self) -> ClientResult<Vec<Post>> {
        self.serve(Op::ListPosts, &[], |w| Ok(w.posts.clone())).await
    }

    async fn search(&self, query: &str) -> ClientResult<Vec<SearchHit>> {
        self.serve(Op::Search, &[query], |w| {
            let needle = query.to_lowercase();
            Ok(w.posts
                .iter()
                .filter(|p| p.title.to_lowercase().contains(&needle))
                .map(|p| SearchHit {
                    id: p.id.clone(),
                    title: p.title.clone(),
                    genre: p.genre.clone(),
                })
                .collect())
        })
        .await
    }

    async fn get_post(&self, id: &str) -> ClientResult<Post> {
        self.serve(Op::GetPost, &[id], |w| w.post_mut(id).map(|p| p.clone()))
            .await
    }

    async fn posts_by_genre(&self, genre: &str) -> ClientResult<Vec<Post>> {
        self.serve(Op::PostsByGenre, &[genre], |w| {
            Ok(w.posts
                .iter()
                .filter(|p| p.genre.eq_ignore_ascii_case(genre))
                .cloned()
                .collect())
        })
        .await
    }

    async fn my_posts(&self) -> ClientResult<Vec<Post>> {
        self.serve(Op::MyPosts, &[], |w| {
            let user = w.require_user()?;
            Ok(w.posts
                .iter()
                .filter(|p| p.author_id() == Some(user.id.as_str()))
                .cloned()
                .collect())
        })
        .await
    }

    async fn create_post(&self, draft: &PostDraft) -> ClientResult<Post> {
        self.serve(Op::CreatePost, &[&draft.title], |w| {
            let user = w.require_user()?;
            let post = Post {
                id: uuid::Uuid::now_v7().to_string(),
                title: draft.title.clone(),
                content: draft.content.clone(),
                genre: draft.genre.clone(),
                author: Some(AuthorRef::Populated {
                    id: user.id,
                    username: Some(user.username),
                }),
                image_ref: draft
                    .image
                    .as_ref()
                    .map(|i| format!("uploads/{}", i.file_name)),
                liked_by: Default::default(),
                comments: Vec::new(),
                created_at: Some(Utc::now()),
            };
            w.posts.insert(0, post.clone());
            Ok(post)
        })
        .await
    }

    async fn update_post(&self, id: &str, draft: &PostDraft) -> ClientResult<Post> {
        self.serve(Op::UpdatePost, &[id], |w| {
            let user = w.require_user()?;
            let post = w.post_mut(id)?;
            if post.author_id() != Some(user.id.as_str()) && user.role != Role::Admin {
                return Err(ClientError::Unauthorized);
            }
            post.title = draft.title.clone();
            post.content = draft.content.clone();
            post.genre = draft.genre.clone();
            if let Some(image) = &draft.image {
                post.image_ref = Some(format!("uploads/{}", image.file_name));
            }
            Ok(post.clone())
        })
        .await
    }

    async fn delete_post(&self, id: &str) -> ClientResult<()> {
        self.serve(Op::DeletePost, &[id], |w| {
            let user = w.require_user()?;
            let post = w.post_mut(id)?;
            if post.author_id() != Some(user.id.as_str()) && user.role != Role::Admin {
                return Err(ClientError::Unauthorized);
            }
            w.posts.retain(|p| p.id != id);
            Ok(())
        })
        .await
    }

    async fn toggle_like(&self, id: &str) -> ClientResult<LikeResponse> {
        self.serve(Op::ToggleLike, &[id], |w| {
            let user = w.require_user()?;
            let post = w.post_mut(id)?;
            let message = if post.liked_by.remove(&user.id) {
                "Blog unliked"
            } else {
                post.liked_by.insert(user.id);
                "Blog liked"
            };
            Ok(LikeResponse {
                likes: post.liked_by.clone(),
                message: Some(message.to_string()),
            })
        })
        .await
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> ClientResult<CommentResponse> {
        self.serve(Op::AddComment, &[post_id, text], |w| {
            let user = w.require_user()?;
            if text.trim().is_empty() {
                return Err(ClientError::Validation("Comment text is required".into()));
            }
            let post = w.post_mut(post_id)?;
            post.comments.push(Comment {
                id: uuid::Uuid::now_v7().to_string(),
                post_id: Some(post_id.to_string()),
                author: Some(AuthorRef::Populated {
                    id: user.id,
                    username: Some(user.username),
                }),
                text: text.to_string(),
                created_at: Some(Utc::now()),
            });
            Ok(CommentResponse::Post(post.clone()))
        })
        .await
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> ClientResult<()> {
        self.serve(Op::DeleteComment, &[post_id, comment_id], |w| {
            let user = w.require_user()?;
            let post = w.post_mut(post_id)?;
            let index = post
                .comments
                .iter()
                .position(|c| c.id == comment_id)
                .ok_or(ClientError::NotFound)?;
            if post.comments[index].author_id() != Some(user.id.as_str())
                && user.role != Role::Admin
            {
                return Err(ClientError::Unauthorized);
            }
            post.comments.remove(index);
            Ok(())
        })
        .await
    }

    async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.serve(Op::ListUsers, &[], |w| {
            let user = w.require_user()?;
            if user.role != Role::Admin {
                return Err(ClientError::Unauthorized);
            }
            Ok(w.accounts.iter().map(|(u, _)| u.clone()).collect())
        })
        .await
    }
}

/// Fixture builders shared by unit and integration tests.
pub mod fixtures {
    use super::*;

    pub fn user(id: &str, username: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: Some(format!("{}@example.com", username)),
            role,
        }
    }

    pub fn post(id: &str, title: &str, author_id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("Body of {}", title),
            genre: "Books".to_string(),
            author: Some(AuthorRef::Id(author_id.to_string())),
            image_ref: None,
            liked_by: Default::default(),
            comments: Vec::new(),
            created_at: None,
        }
    }

    pub fn comment(id: &str, author_id: &str, text: &str) -> Comment {
        Comment {
            id: id.to_string(),
            post_id: None,
            author: Some(AuthorRef::Id(author_id.to_string())),
            text: text.to_string(),
            created_at: None,
        }
    }
}
