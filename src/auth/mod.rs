pub mod handlers;
pub mod nav;
pub mod permissions;
pub mod session;
