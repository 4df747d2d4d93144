// Library exports for Inkpad
// The binary and the integration tests both build on these modules

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod mutation;
pub mod notify;
pub mod search;
pub mod state;
pub mod validate;
