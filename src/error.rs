use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Not allowed")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Classify a non-success response status. `message` is the server's
    /// `message` field when the body carried one.
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
            StatusCode::FORBIDDEN => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound,
            StatusCode::CONFLICT => {
                ClientError::Conflict(message.unwrap_or_else(|| "Conflict".to_string()))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(message.unwrap_or_else(|| "Rejected by server".to_string()))
            }
            s if s == StatusCode::REQUEST_TIMEOUT
                || s == StatusCode::TOO_MANY_REQUESTS
                || s.is_server_error() =>
            {
                ClientError::Transient(format!("server returned {}", s))
            }
            s => ClientError::Internal(format!("unexpected status {}", s)),
        }
    }

    /// Whether the user can recover (retry, sign in, fix input) without
    /// restarting anything.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ClientError::Unauthorized | ClientError::Internal(_))
    }

    /// Short message suitable for a dismissible notice.
    pub fn notice(&self) -> String {
        match self {
            ClientError::Unauthenticated => "Please log in to continue.".to_string(),
            ClientError::Unauthorized => "You are not allowed to do that.".to_string(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::NotFound => {
                "That item no longer exists. Refresh to see the latest.".to_string()
            }
            ClientError::Conflict(_) => {
                "Someone else changed this. Refresh and try again.".to_string()
            }
            ClientError::Transient(_) | ClientError::Http(_) => {
                "Network problem. Please try again.".to_string()
            }
            ClientError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                "Unexpected response from server.".to_string()
            }
            ClientError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Something went wrong.".to_string()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
