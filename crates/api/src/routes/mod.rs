//! Route handlers, one module per area of the API.

pub mod auth;
pub mod catalog;
pub mod content;
pub mod progress;
pub mod queries;
pub mod users;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path segment into a typed id or enum, answering 400 on failure.
pub(crate) fn parse_param<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    ApiError: From<T::Err>,
{
    Ok(raw.parse::<T>()?)
}
