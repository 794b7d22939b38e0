#![forbid(unsafe_code)]

//! JSON REST surface over the club services.

pub mod error;
pub mod extract;
pub mod router;
pub mod routes;

pub use error::ApiError;
pub use extract::Caller;
pub use router::{ApiConfig, AppState, build_router, serve};
