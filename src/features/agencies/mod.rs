//! Colector dashboard: agencies of the user's structure node.

mod model;
mod msg;
mod update;

pub use model::AgenciesModel;
pub use msg::{AgenciesMsg, Session};
pub use update::{AgenciesEnv, AgenciesUpdate, SESSION_SUB};
