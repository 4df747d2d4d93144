use crate::error::{ClientError, ClientResult};
use crate::gateway::Remote;
use crate::models::{Credentials, Registration, Session};
use crate::validate;

/// Ask the server who we are. Any failure, 401 included, leaves the process
/// anonymous; the store is marked ready either way.
pub async fn bootstrap(remote: &Remote) -> Option<Session> {
    let session = match remote.call("me", remote.gateway().me()).await {
        Ok(user) => Some(Session::from(user)),
        Err(ClientError::Unauthenticated) => None,
        Err(e) => {
            tracing::warn!("Failed to verify authentication: {}", e);
            None
        }
    };

    if let Some(ref s) = session {
        tracing::info!("Restored session for {}", s.username);
    }
    remote.session().mark_ready(session.clone()).await;
    session
}

pub async fn login(remote: &Remote, credentials: Credentials) -> ClientResult<Session> {
    validate::credentials(&credentials)?;

    let user = match remote
        .call("login", remote.gateway().login(&credentials))
        .await?
    {
        Some(user) => user,
        // The cookie is set; ask for the profile separately.
        None => remote.call("me", remote.gateway().me()).await?,
    };

    let session = Session::from(user);
    remote.session().establish(session.clone()).await;
    Ok(session)
}

/// Create an account. Registration does not sign in: the service answers
/// with the new user id, which is confirmed out of band.
pub async fn register(remote: &Remote, registration: Registration) -> ClientResult<String> {
    validate::registration(&registration)?;

    let response = remote
        .call("register", remote.gateway().register(&registration))
        .await?;
    tracing::info!("Registered {} as {}", registration.username, response.user_id);
    Ok(response.user_id)
}

/// Sign out. The local session is dropped even when the server call fails.
pub async fn logout(remote: &Remote) {
    if let Err(e) = remote.call("logout", remote.gateway().logout()).await {
        tracing::warn!("Logout failed: {}", e);
    }
    if let Some(previous) = remote.session().clear().await {
        tracing::info!("Signed out {}", previous.username);
    }
}
