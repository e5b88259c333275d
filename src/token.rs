//! Token models: redacted secrets, cached token state, and JWT claim decoding.

pub mod info;
pub mod jwt;
pub mod secret;

pub use self::{info::*, jwt::*, secret::*};
