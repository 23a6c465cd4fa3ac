//! Sign-in session store.

mod model;
mod msg;
mod update;

pub use model::{AuthModel, LoginSession};
pub use msg::{AuthMsg, Password};
pub use update::{AuthEnv, AuthUpdate, LOGIN_ROUTE};
