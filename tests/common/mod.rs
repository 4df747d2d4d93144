//! Shared setup for the scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use inkpad::auth::handlers;
use inkpad::config::Config;
use inkpad::gateway::FakeGateway;
use inkpad::mutation::FeedSource;
use inkpad::state::AppState;

/// Build an app over `fake`, restore whatever session the fake holds and
/// load the full feed.
pub async fn app(fake: FakeGateway) -> (Arc<FakeGateway>, AppState) {
    let fake = Arc::new(fake);
    let state = AppState::new(Config::default(), fake.clone());
    handlers::bootstrap(&state.remote).await;
    state
        .posts
        .load(FeedSource::All)
        .await
        .expect("initial load");
    (fake, state)
}

pub fn ids<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}
