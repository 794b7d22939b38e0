use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::{ParseEnumError, optional_text, required_text};
use crate::model::ids::ResourceId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("resource title cannot be empty")]
    EmptyTitle,

    #[error(transparent)]
    InvalidKind(#[from] ParseEnumError),

    #[error("resource url must be an absolute http(s) url")]
    InvalidUrl,

    #[error("estimated minutes must be greater than zero")]
    InvalidEstimate,
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// What sort of learning material a resource points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Article,
    Course,
    Repo,
    #[default]
    Other,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Article => "article",
            ResourceKind::Course => "course",
            ResourceKind::Repo => "repo",
            ResourceKind::Other => "other",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ResourceKind::Video),
            "article" => Ok(ResourceKind::Article),
            "course" => Ok(ResourceKind::Course),
            "repo" => Ok(ResourceKind::Repo),
            "other" => Ok(ResourceKind::Other),
            other => Err(ParseEnumError::new("resource type", other)),
        }
    }
}

//
// ─── DRAFT / FIELDS ────────────────────────────────────────────────────────────
//

/// Unvalidated resource input as submitted by an admin.
#[derive(Debug, Clone, Default)]
pub struct ResourceDraft {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub kind: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub tags: Vec<String>,
}

impl ResourceDraft {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_owned());
        self
    }

    /// Normalize and validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` for a blank title, unknown kind, malformed URL,
    /// or a zero estimate.
    pub fn validate(self) -> Result<ResourceFields, ResourceError> {
        let title = required_text(self.title).ok_or(ResourceError::EmptyTitle)?;
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => ResourceKind::default(),
            Some(raw) => raw.parse()?,
        };
        let url = optional_text(self.url)
            .map(|raw| {
                Url::parse(&raw)
                    .ok()
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .map(|_| raw)
                    .ok_or(ResourceError::InvalidUrl)
            })
            .transpose()?;
        if self.estimated_minutes == Some(0) {
            return Err(ResourceError::InvalidEstimate);
        }

        Ok(ResourceFields {
            title,
            description: optional_text(self.description),
            url,
            kind,
            estimated_minutes: self.estimated_minutes,
            tags: normalize_tags(self.tags),
        })
    }
}

/// Trims tags, drops blanks, and removes repeats while keeping first-seen order.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(required_text)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Validated resource attributes, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFields {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub estimated_minutes: Option<u32>,
    pub tags: Vec<String>,
}

/// A stored unit of learning content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    #[serde(flatten)]
    pub fields: ResourceFields,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.fields.title
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.fields.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_kind_to_other() {
        let fields = ResourceDraft::titled("Notes").validate().unwrap();
        assert_eq!(fields.kind, ResourceKind::Other);
    }

    #[test]
    fn rejects_blank_title_and_unknown_kind() {
        assert_eq!(
            ResourceDraft::titled("   ").validate().unwrap_err(),
            ResourceError::EmptyTitle
        );
        let err = ResourceDraft::titled("x").with_kind("podcast").validate().unwrap_err();
        assert!(matches!(err, ResourceError::InvalidKind(_)));
    }

    #[test]
    fn url_must_be_web_url() {
        let mut draft = ResourceDraft::titled("Intro");
        draft.url = Some("ftp://example.com/file".into());
        assert_eq!(draft.validate().unwrap_err(), ResourceError::InvalidUrl);

        let mut draft = ResourceDraft::titled("Intro");
        draft.url = Some("https://www.youtube.com/watch?v=rfscVS0vtbw".into());
        assert!(draft.validate().unwrap().url.is_some());

        let mut draft = ResourceDraft::titled("Intro");
        draft.url = Some("  ".into());
        assert_eq!(draft.validate().unwrap().url, None);
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = normalize_tags(vec![
            " python ".into(),
            "basics".into(),
            String::new(),
            "python".into(),
        ]);
        assert_eq!(tags, vec!["python".to_string(), "basics".to_string()]);
    }

    #[test]
    fn zero_estimate_is_invalid() {
        let mut draft = ResourceDraft::titled("Intro");
        draft.estimated_minutes = Some(0);
        assert_eq!(draft.validate().unwrap_err(), ResourceError::InvalidEstimate);
    }
}
