//! Optimistic writes against the shared post collection.

pub mod controller;
pub mod inflight;
pub mod loads;
pub mod transitions;

pub use controller::{MutationController, Outcome};
pub use inflight::{MutationKind, Phase};
pub use loads::{Dashboard, FeedSource};
