use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::BlogGateway;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    CommentResponse, Credentials, LikeResponse, LoginResponse, MeResponse, Post, PostDraft,
    RegisterResponse, Registration, SearchHit, User,
};

/// reqwest-backed gateway. The cookie store carries the session between calls.
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid API URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "Invalid API URL {}: not a base URL",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base })
    }

    /// Append path segments to the base URL. Each segment is percent-encoded,
    /// so ids and genre names cannot escape their position in the path.
    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Internal("API URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let response = self
            .client
            .get(self.url(segments)?)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    if err.is_timeout() || err.is_connect() {
        ClientError::Transient(err.to_string())
    } else {
        ClientError::Http(err)
    }
}

async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message);
    tracing::debug!("API returned {} ({:?})", status, message);
    Err(ClientError::from_status(status, message))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check(response).await?;
    let bytes = response.bytes().await.map_err(transport)?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn read_ack(response: Response) -> ClientResult<()> {
    check(response).await.map(|_| ())
}

fn draft_form(draft: &PostDraft) -> ClientResult<Form> {
    let mut form = Form::new()
        .text("title", draft.title.clone())
        .text("content", draft.content.clone())
        .text("genre", draft.genre.clone());

    if let Some(image) = &draft.image {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        form = form.part("image", part);
    }

    Ok(form)
}

#[async_trait]
impl BlogGateway for HttpGateway {
    async fn me(&self) -> ClientResult<User> {
        let body: MeResponse = self.get_json(&["api", "auth", "me"]).await?;
        Ok(body.user)
    }

    async fn login(&self, credentials: &Credentials) -> ClientResult<Option<User>> {
        let response = self
            .client
            .post(self.url(&["api", "auth", "login"])?)
            .json(credentials)
            .send()
            .await
            .map_err(transport)?;
        let body: LoginResponse = read_json(response).await?;
        Ok(body.user)
    }

    async fn register(&self, registration: &Registration) -> ClientResult<RegisterResponse> {
        let response = self
            .client
            .post(self.url(&["api", "auth", "register"])?)
            .json(registration)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn logout(&self) -> ClientResult<()> {
        let response = self
            .client
            .post(self.url(&["api", "auth", "logout"])?)
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn list_posts(&self) -> ClientResult<Vec<Post>> {
        self.get_json(&["api", "blogs"]).await
    }

    async fn search(&self, query: &str) -> ClientResult<Vec<SearchHit>> {
        let mut url = self.url(&["api", "blogs", "search"])?;
        url.query_pairs_mut().append_pair("query", query);
        let response = self.client.get(url).send().await.map_err(transport)?;
        read_json(response).await
    }

    async fn get_post(&self, id: &str) -> ClientResult<Post> {
        self.get_json(&["api", "blogs", id]).await
    }

    async fn posts_by_genre(&self, genre: &str) -> ClientResult<Vec<Post>> {
        self.get_json(&["api", "blogs", "genre", genre]).await
    }

    async fn my_posts(&self) -> ClientResult<Vec<Post>> {
        self.get_json(&["api", "blogs", "user", "me"]).await
    }

    async fn create_post(&self, draft: &PostDraft) -> ClientResult<Post> {
        let response = self
            .client
            .post(self.url(&["api", "blogs"])?)
            .multipart(draft_form(draft)?)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn update_post(&self, id: &str, draft: &PostDraft) -> ClientResult<Post> {
        let response = self
            .client
            .put(self.url(&["api", "blogs", id])?)
            .multipart(draft_form(draft)?)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn delete_post(&self, id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.url(&["api", "blogs", id])?)
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn toggle_like(&self, id: &str) -> ClientResult<LikeResponse> {
        let response = self
            .client
            .put(self.url(&["api", "blogs", "like", id])?)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn add_comment(&self, post_id: &str, text: &str) -> ClientResult<CommentResponse> {
        let response = self
            .client
            .post(self.url(&["api", "blogs", "comment", post_id])?)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn delete_comment(&self, post_id: &str, comment_id: &str) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.url(&["api", "blogs", "comment", post_id, comment_id])?)
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn list_users(&self) -> ClientResult<Vec<User>> {
        self.get_json(&["api", "users"]).await
    }
}
