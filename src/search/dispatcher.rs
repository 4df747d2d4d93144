use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;

use super::debounce::{Debouncer, SequenceGuard};
use crate::gateway::Remote;
use crate::models::SearchHit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Loading { query: String },
    Results { query: String, hits: Vec<SearchHit> },
    /// Zero matches, or the request failed.
    NoResults { query: String },
}

impl SearchState {
    /// True once a dispatched query has been answered either way.
    pub fn is_settled(&self) -> bool {
        matches!(self, SearchState::Results { .. } | SearchState::NoResults { .. })
    }
}

struct Inner {
    remote: Remote,
    debouncer: Debouncer,
    /// Bumped on every reset; work scheduled before it must not start.
    generation: SequenceGuard,
    seq: SequenceGuard,
    state: watch::Sender<SearchState>,
}

impl Inner {
    async fn dispatch(&self, query: String, generation: u64) {
        let mut seq = 0;
        let started = self.state.send_if_modified(|state| {
            if !self.generation.is_current(generation) {
                return false;
            }
            seq = self.seq.issue();
            *state = SearchState::Loading {
                query: query.clone(),
            };
            true
        });
        if !started {
            tracing::debug!("Search for {:?} was cleared before it started", query);
            return;
        }
        tracing::debug!("Searching for {:?} (#{})", query, seq);

        let result = self
            .remote
            .call("search", self.remote.gateway().search(&query))
            .await;

        let next = match result {
            Ok(hits) if hits.is_empty() => {
                tracing::debug!("No posts match {:?}", query);
                SearchState::NoResults { query }
            }
            Ok(hits) => SearchState::Results { query, hits },
            Err(e) => {
                tracing::warn!("Search for {:?} failed: {}", query, e);
                SearchState::NoResults { query }
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if !self.seq.is_current(seq) {
                return false;
            }
            *state = next;
            true
        });
        if !applied {
            tracing::debug!("Dropping superseded search response #{}", seq);
        }
    }

    fn reset(&self) {
        self.debouncer.cancel();
        self.state.send_modify(|state| {
            self.generation.invalidate();
            self.seq.invalidate();
            *state = SearchState::Idle;
        });
    }
}

/// Turns keystrokes into debounced search requests and publishes the
/// latest answer.
#[derive(Clone)]
pub struct SearchDispatcher {
    inner: Arc<Inner>,
}

impl SearchDispatcher {
    pub fn new(remote: Remote, delay: Duration) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            inner: Arc::new(Inner {
                remote,
                debouncer: Debouncer::new(delay),
                generation: SequenceGuard::new(),
                seq: SequenceGuard::new(),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Feed the current contents of the search box.
    pub fn input(&self, raw: &str) {
        let query = raw.trim();
        if query.is_empty() {
            self.inner.reset();
            return;
        }

        let query = query.to_string();
        let generation = self.inner.generation.current();
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = inner.upgrade() {
                inner.dispatch(query, generation).await;
            }
        });
    }

    /// Dispatch `raw` now, skipping the quiet period, and wait for the answer.
    pub async fn submit(&self, raw: &str) -> SearchState {
        let query = raw.trim();
        if query.is_empty() {
            self.inner.reset();
            return SearchState::Idle;
        }

        self.inner.debouncer.cancel();
        let generation = self.inner.generation.current();
        self.inner.dispatch(query.to_string(), generation).await;
        self.state()
    }

    /// A result was picked: clear the surface and hand back the post id.
    pub fn select(&self, hit: &SearchHit) -> String {
        self.inner.reset();
        hit.id.clone()
    }

    /// The search surface went away. Pending and in-flight queries are dropped.
    pub fn close(&self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionStore;
    use crate::gateway::fake::{fixtures, Fault, Op};
    use crate::gateway::FakeGateway;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    fn dispatcher() -> (Arc<FakeGateway>, SearchDispatcher) {
        let fake = Arc::new(
            FakeGateway::new()
                .with_post(fixtures::post("p1", "Dragon Tales", "a"))
                .with_post(fixtures::post("p2", "Dragons of Autumn", "a"))
                .with_post(fixtures::post("p3", "Gardening", "a")),
        );
        let remote = Remote::new(fake.clone(), SessionStore::new(), Duration::from_secs(12));
        (fake, SearchDispatcher::new(remote, DEBOUNCE))
    }

    async fn settled(dispatcher: &SearchDispatcher) -> SearchState {
        let mut rx = dispatcher.subscribe();
        let state = rx.wait_for(SearchState::is_settled).await.unwrap();
        state.clone()
    }

    #[tokio::test(start_paused = true)]
    async fn typing_burst_sends_only_final_query() {
        let (fake, dispatcher) = dispatcher();
        for partial in ["d", "dr", "dra", "drag"] {
            dispatcher.input(partial);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let state = settled(&dispatcher).await;
        assert_eq!(fake.calls_for(Op::Search), vec![vec!["drag".to_string()]]);
        assert!(matches!(state, SearchState::Results { ref hits, .. } if hits.len() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn query_is_trimmed_before_sending() {
        let (fake, dispatcher) = dispatcher();
        dispatcher.input("  garden  ");
        settled(&dispatcher).await;
        assert_eq!(fake.calls_for(Op::Search), vec![vec!["garden".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_clears_without_a_call() {
        let (fake, dispatcher) = dispatcher();
        dispatcher.input("dragon");
        tokio::time::sleep(Duration::from_millis(100)).await;
        dispatcher.input("   ");

        assert_eq!(dispatcher.state(), SearchState::Idle);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fake.call_count(Op::Search), 0);
        assert_eq!(dispatcher.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_matches_and_failures_both_mean_no_results() {
        let (fake, dispatcher) = dispatcher();
        dispatcher.input("zebra");
        assert_eq!(
            settled(&dispatcher).await,
            SearchState::NoResults {
                query: "zebra".into()
            }
        );

        fake.fail_next(Op::Search, Fault::Transient);
        dispatcher.input("dragon");
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(
            dispatcher.state(),
            SearchState::NoResults {
                query: "dragon".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn close_ignores_in_flight_response() {
        let (fake, dispatcher) = dispatcher();
        fake.set_latency(Op::Search, Duration::from_secs(2));

        dispatcher.input("dragon");
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
        assert_eq!(
            dispatcher.state(),
            SearchState::Loading {
                query: "dragon".into()
            }
        );

        dispatcher.close();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fake.call_count(Op::Search), 1);
        assert_eq!(dispatcher.state(), SearchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_beats_an_already_fired_timer() {
        let (fake, dispatcher) = dispatcher();
        let generation = dispatcher.inner.generation.current();

        // The timer fired and spawned its search, but the box was cleared
        // before that task got to run.
        dispatcher.close();
        dispatcher.inner.dispatch("dragon".into(), generation).await;

        assert_eq!(fake.call_count(Op::Search), 0);
        assert_eq!(dispatcher.state(), SearchState::Idle);

        dispatcher.input("dragon");
        assert!(settled(&dispatcher).await.is_settled());
        assert_eq!(fake.call_count(Op::Search), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn select_clears_and_returns_id() {
        let (_, dispatcher) = dispatcher();
        let hits = match dispatcher.submit("gardening").await {
            SearchState::Results { hits, .. } => hits,
            other => panic!("unexpected state {:?}", other),
        };

        assert_eq!(dispatcher.select(&hits[0]), "p3");
        assert_eq!(dispatcher.state(), SearchState::Idle);
    }
}
