//! Elm-Architecture state core for the lottery operator app.
//!
//! Feature stores ([`features`]) are pure `update` functions over immutable
//! models; the [`core`] engine commits their results and runs the commands
//! they describe against the API client, router and alert presenter.

pub mod alert;
pub mod api;
pub mod config;
pub mod core;
pub mod features;
pub mod logging;
pub mod router;
