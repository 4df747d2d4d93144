pub mod store;
pub mod view;

pub use store::PostStore;
pub use view::{Pager, ViewState};
