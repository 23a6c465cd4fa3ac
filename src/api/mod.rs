//! REST backend access.

mod client;
mod services;

pub use client::{HttpApiClient, TimeoutConfig};
pub use services::{
    Agency, ApiLoginService, ApiStructureService, LoginService, Role, StructureService, User,
};
