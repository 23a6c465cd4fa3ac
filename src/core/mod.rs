//! Elm-Architecture store and effect engine.
//!
//! This module provides the pieces every feature store plugs into.
//!
//! # Architecture
//!
//! ```text
//! dispatch(msg) ──→ update(env, &model, msg) ──→ Return { model, cmd }
//!      ↑                                               │
//!      │                         commit model, notify listeners (Sub)
//!      │                                               │
//!      └──────── effect handlers (I/O on tokio) ←──── cmd
//! ```
//!
//! - **RemoteData**: lifecycle of async data
//! - **Cmd**: effect descriptions returned by updates
//! - **Return**: next model plus command, with child composition
//! - **EffectHandlers**: the only place that performs I/O
//! - **Store**: owns one model, serializes dispatch
//! - **Sub**: keyed, de-duplicated observation of other stores

mod cmd;
mod effects;
mod error;
mod generation;
mod remote_data;
mod ret;
mod store;
mod sub;
mod update;

pub use cmd::{
    Alert, AlertButton, AlertSpec, ApiRequest, ButtonStyle, Cmd, CmdTag, HttpMethod, HttpRequest,
    HttpResponder, NavMethod, Navigation, Sleep, Task,
};
pub use effects::{AlertPresenter, ApiClient, EffectHandlers, PressCallback, Router};
pub use error::{ApiError, EffectError};
pub use generation::{Generation, Ticket};
pub use remote_data::{RemoteData, WebData};
pub use ret::{ret, Return};
pub use store::{Dispatcher, Store, Subscription};
pub use sub::{Sub, SubDescriptor};
pub use update::{Message, Model, Update};
