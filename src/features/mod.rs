//! Feature stores. Each feature keeps its model, messages and update in
//! separate files.

pub mod agencies;
pub mod auth;
