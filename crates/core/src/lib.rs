#![forbid(unsafe_code)]

pub mod access;
pub mod completion;
pub mod error;
pub mod model;
pub mod time;

pub use access::{AccessError, Actor, AuthContext, Permission, Role};
pub use error::ParseEnumError;
pub use time::Clock;
