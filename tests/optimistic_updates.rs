mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use inkpad::error::ClientError;
use inkpad::gateway::fake::{fixtures, Fault, Op};
use inkpad::gateway::FakeGateway;
use inkpad::models::Role;
use inkpad::mutation::{MutationKind, Outcome, Phase};
use inkpad::notify::Level;
use tokio_test::{assert_err, assert_ok};

use common::{app, ids};

fn likes(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn anonymous_like_is_refused_without_a_request() {
    let (fake, state) = app(FakeGateway::new().with_post(fixtures::post("p1", "T", "a"))).await;

    let result = state.posts.toggle_like("p1").await;
    assert!(matches!(result, Err(ClientError::Unauthenticated)));
    assert_eq!(fake.call_count(Op::ToggleLike), 0);

    let notices = state.notices.active();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, Level::Warning);
    assert_eq!(notices[0].message, "Please log in to like blogs!");
}

#[tokio::test]
async fn failed_like_restores_exact_prior_likes() {
    let mut post = fixtures::post("p1", "T", "a");
    post.liked_by = likes(&["A"]);
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(post)
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.fail_next(Op::ToggleLike, Fault::Transient);

    assert_err!(state.posts.toggle_like("p1").await);
    let restored = state.posts.store().get("p1").await.unwrap();
    assert_eq!(restored.liked_by, likes(&["A"]));
    assert_eq!(
        state.posts.phase(MutationKind::ToggleLike, "p1"),
        Phase::RolledBack
    );
    assert_eq!(state.notices.active()[0].level, Level::Error);
}

#[tokio::test(start_paused = true)]
async fn double_toggle_sends_one_request() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::ToggleLike, Duration::from_secs(1));

    let (first, second) = tokio::join!(
        state.posts.toggle_like("p1"),
        state.posts.toggle_like("p1")
    );

    assert_eq!(assert_ok!(first), Outcome::Committed(likes(&["B"])));
    assert_eq!(assert_ok!(second), Outcome::Ignored);
    assert_eq!(fake.call_count(Op::ToggleLike), 1);
    assert_eq!(fake.posts()[0].liked_by, likes(&["B"]));
}

#[tokio::test(start_paused = true)]
async fn like_is_visible_before_the_server_answers() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::ToggleLike, Duration::from_secs(1));

    let pending = {
        let posts = state.posts.clone();
        tokio::spawn(async move { posts.toggle_like("p1").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.posts.store().get("p1").await.unwrap().is_liked_by("B"));
    assert_eq!(
        state.posts.phase(MutationKind::ToggleLike, "p1"),
        Phase::Pending
    );

    assert_ok!(pending.await.unwrap());
    assert_eq!(
        state.posts.phase(MutationKind::ToggleLike, "p1"),
        Phase::Committed
    );
}

#[tokio::test(start_paused = true)]
async fn refused_post_delete_comes_back_at_its_index() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "A", "B"))
            .with_post(fixtures::post("p2", "B", "someone-else"))
            .with_post(fixtures::post("p3", "C", "B"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::DeletePost, Duration::from_secs(1));

    let pending = {
        let posts = state.posts.clone();
        tokio::spawn(async move { posts.delete_post("p2").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.posts.store().get("p2").await.is_none());

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(ClientError::Unauthorized)));

    let order: Vec<_> = state
        .posts
        .store()
        .snapshot()
        .await
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(order, ids(["p1", "p2", "p3"]));
    assert_eq!(fake.call_count(Op::DeletePost), 1);
}

#[tokio::test]
async fn owner_delete_removes_post_everywhere() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "A", "B"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;

    assert_eq!(
        assert_ok!(state.posts.delete_post("p1").await),
        Outcome::Committed(())
    );
    assert!(state.posts.store().is_empty().await);
    assert!(fake.posts().is_empty());
}

#[tokio::test]
async fn comment_delete_keeps_the_others_in_order() {
    let mut post = fixtures::post("p1", "T", "a");
    post.comments = vec![
        fixtures::comment("c1", "x", "first"),
        fixtures::comment("c2", "B", "second"),
        fixtures::comment("c3", "y", "third"),
    ];
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(post)
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;

    assert_ok!(state.posts.delete_comment("p1", "c2").await);

    let local: Vec<_> = state.posts.store().get("p1").await.unwrap().comments;
    let local: Vec<_> = local.into_iter().map(|c| c.id).collect();
    assert_eq!(local, ids(["c1", "c3"]));

    let remote: Vec<_> = fake.posts()[0].comments.iter().map(|c| c.id.clone()).collect();
    assert_eq!(remote, local);
}

#[tokio::test(start_paused = true)]
async fn stalled_request_times_out_and_rolls_back() {
    let mut post = fixtures::post("p1", "T", "a");
    post.comments = vec![
        fixtures::comment("c1", "B", "one"),
        fixtures::comment("c2", "B", "two"),
    ];
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(post.clone())
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.fail_next(Op::DeleteComment, Fault::Hang);

    let started = tokio::time::Instant::now();
    let result = state.posts.delete_comment("p1", "c1").await;

    assert!(matches!(result, Err(ClientError::Transient(_))));
    assert!(started.elapsed() >= state.config.request_timeout());
    assert_eq!(state.posts.store().get("p1").await.unwrap(), post);
}

#[tokio::test]
async fn rejected_session_forces_logout_and_rolls_back() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    assert!(state.session.current().await.is_some());
    fake.fail_next(Op::ToggleLike, Fault::Unauthenticated);

    let result = state.posts.toggle_like("p1").await;
    assert!(matches!(result, Err(ClientError::Unauthenticated)));
    assert!(state.session.current().await.is_none());
    assert!(state
        .posts
        .store()
        .get("p1")
        .await
        .unwrap()
        .liked_by
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn response_after_close_changes_nothing() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::ToggleLike, Duration::from_secs(1));

    let pending = {
        let posts = state.posts.clone();
        tokio::spawn(async move { posts.toggle_like("p1").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    state.posts.close().await;

    assert_eq!(assert_ok!(pending.await.unwrap()), Outcome::Stale);
    assert!(state.posts.store().is_empty().await);
    assert!(fake.posts()[0].is_liked_by("B"));
}

#[tokio::test(start_paused = true)]
async fn comment_appears_only_after_confirmation() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::AddComment, Duration::from_secs(1));

    let pending = {
        let posts = state.posts.clone();
        tokio::spawn(async move { posts.add_comment("p1", "  nice post ").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(state.posts.store().get("p1").await.unwrap().comments.is_empty());

    let comments = assert_ok!(pending.await.unwrap()).committed().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "nice post");
    assert_eq!(fake.calls_for(Op::AddComment)[0][1], "nice post");
}

#[tokio::test]
async fn failed_comment_leaves_state_unchanged() {
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "T", "a"))
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.fail_next(Op::AddComment, Fault::Transient);

    assert_err!(state.posts.add_comment("p1", "hello").await);
    assert!(state.posts.store().get("p1").await.unwrap().comments.is_empty());
    assert_eq!(
        state.posts.phase(MutationKind::AddComment, "p1"),
        Phase::RolledBack
    );
}

fn three_posts() -> FakeGateway {
    FakeGateway::new()
        .with_post(fixtures::post("p1", "A", "B"))
        .with_post(fixtures::post("p2", "B", "someone-else"))
        .with_post(fixtures::post("p3", "C", "B"))
        .signed_in_as(fixtures::user("B", "bee", Role::User))
}

async fn order(state: &inkpad::state::AppState) -> Vec<String> {
    state
        .posts
        .store()
        .snapshot()
        .await
        .into_iter()
        .map(|p| p.id)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn failed_like_during_refused_delete_matches_the_server() {
    let (fake, state) = app(three_posts()).await;
    fake.set_latency(Op::ToggleLike, Duration::from_secs(1));
    fake.set_latency(Op::DeletePost, Duration::from_secs(2));
    fake.fail_next(Op::ToggleLike, Fault::Transient);

    let (liked, deleted) = tokio::join!(
        state.posts.toggle_like("p2"),
        state.posts.delete_post("p2")
    );

    assert!(matches!(liked, Err(ClientError::Transient(_))));
    assert!(matches!(deleted, Err(ClientError::Unauthorized)));
    assert_eq!(order(&state).await, ids(["p1", "p2", "p3"]));

    let local = state.posts.store().get("p2").await.unwrap();
    assert!(local.liked_by.is_empty());
    assert_eq!(local.liked_by, fake.posts()[1].liked_by);
}

#[tokio::test(start_paused = true)]
async fn like_settled_while_hidden_survives_refused_delete() {
    let (fake, state) = app(three_posts()).await;
    fake.set_latency(Op::ToggleLike, Duration::from_secs(1));
    fake.set_latency(Op::DeletePost, Duration::from_secs(2));

    let (liked, deleted) = tokio::join!(
        state.posts.toggle_like("p2"),
        state.posts.delete_post("p2")
    );

    assert_eq!(assert_ok!(liked), Outcome::Committed(likes(&["B"])));
    assert_err!(deleted);

    let local = state.posts.store().get("p2").await.unwrap();
    assert_eq!(local.liked_by, likes(&["B"]));
    assert_eq!(local.liked_by, fake.posts()[1].liked_by);
    assert_eq!(order(&state).await, ids(["p1", "p2", "p3"]));
}

#[tokio::test(start_paused = true)]
async fn failed_comment_delete_under_refused_post_delete_keeps_the_comment() {
    let mut post = fixtures::post("p2", "B", "someone-else");
    post.comments = vec![
        fixtures::comment("c1", "B", "first"),
        fixtures::comment("c2", "x", "second"),
    ];
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(fixtures::post("p1", "A", "B"))
            .with_post(post.clone())
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.set_latency(Op::DeleteComment, Duration::from_secs(1));
    fake.set_latency(Op::DeletePost, Duration::from_secs(2));
    fake.fail_next(Op::DeleteComment, Fault::Transient);

    let (comment, deleted) = tokio::join!(
        state.posts.delete_comment("p2", "c1"),
        state.posts.delete_post("p2")
    );

    assert_err!(comment);
    assert_err!(deleted);
    assert_eq!(state.posts.store().get("p2").await.unwrap(), post);
    assert_eq!(fake.posts()[1], post);
}

#[tokio::test]
async fn post_gone_on_the_server_is_dropped_locally() {
    let (fake, state) = app(three_posts()).await;
    fake.fail_next(Op::ToggleLike, Fault::NotFound);

    let result = state.posts.toggle_like("p2").await;

    assert!(matches!(result, Err(ClientError::NotFound)));
    assert_eq!(order(&state).await, ids(["p1", "p3"]));
    assert_eq!(
        state.posts.phase(MutationKind::ToggleLike, "p2"),
        Phase::RolledBack
    );
    assert_eq!(state.notices.active()[0].level, Level::Error);
}

#[tokio::test]
async fn comment_gone_on_the_server_stays_removed() {
    let mut post = fixtures::post("p1", "T", "a");
    post.comments = vec![
        fixtures::comment("c1", "B", "first"),
        fixtures::comment("c2", "B", "second"),
    ];
    let (fake, state) = app(
        FakeGateway::new()
            .with_post(post)
            .signed_in_as(fixtures::user("B", "bee", Role::User)),
    )
    .await;
    fake.fail_next(Op::DeleteComment, Fault::NotFound);

    assert_err!(state.posts.delete_comment("p1", "c1").await);

    let remaining = state.posts.store().get("p1").await.unwrap().comments;
    assert_eq!(ids(remaining.iter().map(|c| c.id.as_str())), ids(["c2"]));
}
