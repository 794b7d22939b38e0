//! Club events and blog posts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::access::Role;
use crate::error::{ParseEnumError, optional_text, required_text};
use crate::model::ids::{BlogId, EventId, UserId};
use crate::model::resource::normalize_tags;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("blog content cannot be empty")]
    EmptyBody,

    #[error("event end cannot precede its start")]
    EndsBeforeStart,

    #[error("{0} must be an absolute http(s) url")]
    InvalidUrl(&'static str),

    #[error(transparent)]
    InvalidVisibility(#[from] ParseEnumError),
}

fn web_url(field: &'static str, raw: Option<String>) -> Result<Option<String>, ContentError> {
    optional_text(raw)
        .map(|value| match Url::parse(&value) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(value),
            _ => Err(ContentError::InvalidUrl(field)),
        })
        .transpose()
}

/// Unvalidated event input.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub online_url: Option<String>,
    pub published: Option<bool>,
    pub image_url: Option<String>,
}

impl EventDraft {
    /// # Errors
    ///
    /// Returns `ContentError` for a blank title, an end before the start, or
    /// a malformed link.
    pub fn validate(self) -> Result<EventFields, ContentError> {
        let title = required_text(self.title).ok_or(ContentError::EmptyTitle)?;
        if self.ends_at.is_some_and(|end| end < self.starts_at) {
            return Err(ContentError::EndsBeforeStart);
        }
        Ok(EventFields {
            title,
            description: optional_text(self.description),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: optional_text(self.location),
            online_url: web_url("online url", self.online_url)?,
            published: self.published.unwrap_or(true),
            image_url: web_url("image url", self.image_url)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub online_url: Option<String>,
    pub published: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(flatten)]
    pub fields: EventFields,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated blog input.
#[derive(Debug, Clone, Default)]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub visibility: Option<String>,
}

impl BlogDraft {
    /// # Errors
    ///
    /// Returns `ContentError` for blank title/body, a malformed image link, or
    /// an unknown visibility.
    pub fn validate(self) -> Result<BlogFields, ContentError> {
        let title = required_text(self.title).ok_or(ContentError::EmptyTitle)?;
        let content = required_text(self.content).ok_or(ContentError::EmptyBody)?;
        let visibility = match self.visibility.as_deref().map(str::trim) {
            None | Some("") => Role::Public,
            Some(raw) => raw.parse()?,
        };
        Ok(BlogFields {
            title,
            content,
            tags: normalize_tags(self.tags),
            image_url: web_url("image url", self.image_url)?,
            visibility,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogFields {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub visibility: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: BlogId,
    #[serde(flatten)]
    pub fields: BlogFields,
    pub author: UserId,
    pub published_at: DateTime<Utc>,
}

impl Blog {
    #[must_use]
    pub fn visible_to(&self, role: Role) -> bool {
        role.can_see(self.fields.visibility)
    }
}
