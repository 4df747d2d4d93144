use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ToggleLike,
    AddComment,
    DeleteComment,
    DeletePost,
    UpdatePost,
}

/// Lifecycle of one mutation instance. `Committed` and `RolledBack` are
/// terminal for that instance; a later invocation starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Committed,
    RolledBack,
}

type Key = (MutationKind, String);

/// Single-flight registry keyed by `(kind, entity id)`.
#[derive(Debug, Default)]
pub struct Inflight {
    phases: Mutex<HashMap<Key, Phase>>,
}

impl Inflight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn phases(&self) -> MutexGuard<'_, HashMap<Key, Phase>> {
        self.phases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the key. `None` while another instance for it is pending.
    pub fn begin(self: &Arc<Self>, kind: MutationKind, id: &str) -> Option<Ticket> {
        let key = (kind, id.to_string());
        let mut phases = self.phases();
        if phases.get(&key) == Some(&Phase::Pending) {
            return None;
        }
        let previous = phases.insert(key.clone(), Phase::Pending);
        Some(Ticket {
            registry: Arc::clone(self),
            key,
            previous,
            settled: false,
        })
    }

    pub fn phase(&self, kind: MutationKind, id: &str) -> Phase {
        self.phases()
            .get(&(kind, id.to_string()))
            .copied()
            .unwrap_or(Phase::Idle)
    }

    /// Forget settled phases. Pending claims are kept.
    pub fn prune(&self) {
        self.phases().retain(|_, phase| *phase == Phase::Pending);
    }

    fn set(&self, key: &Key, phase: Option<Phase>) {
        let mut phases = self.phases();
        match phase {
            Some(phase) => {
                phases.insert(key.clone(), phase);
            }
            None => {
                phases.remove(key);
            }
        }
    }
}

/// Proof of a pending claim. Settling it records the terminal phase; dropping
/// it unsettled counts as a rollback so the key never stays stuck.
#[derive(Debug)]
pub struct Ticket {
    registry: Arc<Inflight>,
    key: Key,
    previous: Option<Phase>,
    settled: bool,
}

impl Ticket {
    pub fn commit(mut self) {
        self.settled = true;
        self.registry.set(&self.key, Some(Phase::Committed));
    }

    pub fn roll_back(mut self) {
        self.settled = true;
        self.registry.set(&self.key, Some(Phase::RolledBack));
    }

    /// Give the claim up before anything was applied or sent.
    pub fn release(mut self) {
        self.settled = true;
        self.registry.set(&self.key, self.previous);
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.set(&self.key, Some(Phase::RolledBack));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_while_pending() {
        let inflight = Inflight::new();
        let ticket = inflight.begin(MutationKind::ToggleLike, "p1").unwrap();
        assert!(inflight.begin(MutationKind::ToggleLike, "p1").is_none());
        assert_eq!(inflight.phase(MutationKind::ToggleLike, "p1"), Phase::Pending);

        ticket.commit();
        assert_eq!(
            inflight.phase(MutationKind::ToggleLike, "p1"),
            Phase::Committed
        );
        assert!(inflight.begin(MutationKind::ToggleLike, "p1").is_some());
    }

    #[test]
    fn keys_are_independent() {
        let inflight = Inflight::new();
        let _a = inflight.begin(MutationKind::ToggleLike, "p1").unwrap();
        assert!(inflight.begin(MutationKind::ToggleLike, "p2").is_some());
        assert!(inflight.begin(MutationKind::DeletePost, "p1").is_some());
    }

    #[test]
    fn release_restores_previous_phase() {
        let inflight = Inflight::new();
        inflight
            .begin(MutationKind::DeletePost, "p1")
            .unwrap()
            .release();
        assert_eq!(inflight.phase(MutationKind::DeletePost, "p1"), Phase::Idle);
    }

    #[test]
    fn prune_keeps_only_pending_claims() {
        let inflight = Inflight::new();
        inflight.begin(MutationKind::ToggleLike, "p1").unwrap().commit();
        inflight.begin(MutationKind::DeletePost, "p2").unwrap().roll_back();
        let pending = inflight.begin(MutationKind::AddComment, "p3").unwrap();

        inflight.prune();

        assert_eq!(inflight.phase(MutationKind::ToggleLike, "p1"), Phase::Idle);
        assert_eq!(inflight.phase(MutationKind::DeletePost, "p2"), Phase::Idle);
        assert_eq!(inflight.phase(MutationKind::AddComment, "p3"), Phase::Pending);
        assert!(inflight.begin(MutationKind::AddComment, "p3").is_none());

        pending.commit();
        assert_eq!(
            inflight.phase(MutationKind::AddComment, "p3"),
            Phase::Committed
        );
    }

    #[test]
    fn dropped_ticket_counts_as_rollback() {
        let inflight = Inflight::new();
        drop(inflight.begin(MutationKind::AddComment, "p1").unwrap());
        assert_eq!(
            inflight.phase(MutationKind::AddComment, "p1"),
            Phase::RolledBack
        );
    }
}
