//! Debounced title search.

pub mod debounce;
pub mod dispatcher;

pub use dispatcher::{SearchDispatcher, SearchState};
