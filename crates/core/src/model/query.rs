use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ParseEnumError, required_text};
use crate::model::ids::QueryId;
use crate::model::user::{Email, UserError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    #[error("all fields are required")]
    MissingField,

    #[error(transparent)]
    InvalidEmail(#[from] UserError),

    #[error(transparent)]
    InvalidStatus(#[from] ParseEnumError),
}

/// Handling state of a contact-form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Pending,
    Read,
    Responded,
}

impl QueryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Read => "read",
            QueryStatus::Responded => "responded",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueryStatus::Pending),
            "read" => Ok(QueryStatus::Read),
            "responded" => Ok(QueryStatus::Responded),
            other => Err(ParseEnumError::new("query status", other)),
        }
    }
}

/// Validated contact-form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub message: String,
}

impl QueryDraft {
    /// # Errors
    ///
    /// Returns `QueryError::MissingField` when any field is blank and
    /// `QueryError::InvalidEmail` for a malformed address.
    pub fn validate(
        first_name: &str,
        last_name: &str,
        email: &str,
        message: &str,
    ) -> Result<Self, QueryError> {
        let first_name = required_text(first_name).ok_or(QueryError::MissingField)?;
        let last_name = required_text(last_name).ok_or(QueryError::MissingField)?;
        let message = required_text(message).ok_or(QueryError::MissingField)?;
        if email.trim().is_empty() {
            return Err(QueryError::MissingField);
        }
        let email = Email::parse(email)?;
        Ok(Self {
            first_name,
            last_name,
            email,
            message,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub id: QueryId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub message: String,
    pub status: QueryStatus,
    pub created_at: DateTime<Utc>,
}

/// A page of queries, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPage {
    pub queries: Vec<UserQuery>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}

/// Page/limit pair with the bounds the listing endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Missing or zero values fall back to page 1 / 10 items; the limit is
    /// capped at 100.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT);
        Self { page, limit }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    #[must_use]
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}
