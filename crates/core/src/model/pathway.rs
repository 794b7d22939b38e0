use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ParseEnumError, optional_text, required_text};
use crate::model::ids::{ResourceId, UserId};
use crate::model::resource::Resource;
use crate::model::PathwayId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathwayError {
    #[error("pathway title cannot be empty")]
    EmptyTitle,

    #[error("pathway category is required")]
    MissingCategory,

    #[error(transparent)]
    InvalidCategory(#[from] ParseEnumError),

    #[error("resource {0} appears more than once in the pathway")]
    DuplicateResource(ResourceId),

    #[error("pathway references unknown resource {0}")]
    UnknownResource(ResourceId),
}

/// Track a pathway belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "DS")]
    DataScience,
    #[serde(rename = "AIML")]
    MachineLearning,
    #[serde(rename = "DA")]
    DataAnalytics,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::DataScience => "DS",
            Category::MachineLearning => "AIML",
            Category::DataAnalytics => "DA",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DS" => Ok(Category::DataScience),
            "AIML" => Ok(Category::MachineLearning),
            "DA" => Ok(Category::DataAnalytics),
            other => Err(ParseEnumError::new("pathway category", other)),
        }
    }
}

/// Unvalidated pathway input.
#[derive(Debug, Clone, Default)]
pub struct PathwayDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub resource_ids: Vec<ResourceId>,
}

impl PathwayDraft {
    /// Normalize and validate the draft. Whether the referenced resources
    /// exist is checked against the store by the caller.
    ///
    /// # Errors
    ///
    /// Returns `PathwayError` for a blank title, missing or unknown category,
    /// or a resource listed twice.
    pub fn validate(self) -> Result<PathwayFields, PathwayError> {
        let title = required_text(self.title).ok_or(PathwayError::EmptyTitle)?;
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => return Err(PathwayError::MissingCategory),
            Some(raw) => raw.parse::<Category>()?,
        };
        let mut seen = HashSet::with_capacity(self.resource_ids.len());
        for id in &self.resource_ids {
            if !seen.insert(*id) {
                return Err(PathwayError::DuplicateResource(*id));
            }
        }
        Ok(PathwayFields {
            title,
            description: optional_text(self.description),
            category,
            resource_ids: self.resource_ids,
        })
    }
}

/// Validated pathway attributes. `resource_ids` order is the task order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayFields {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    #[serde(rename = "resources")]
    pub resource_ids: Vec<ResourceId>,
}

impl PathwayFields {
    /// Ids that are referenced but absent from `known`, in pathway order.
    #[must_use]
    pub fn missing_from(&self, known: &[ResourceId]) -> Vec<ResourceId> {
        let known: HashSet<_> = known.iter().copied().collect();
        self.resource_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect()
    }
}

/// A stored pathway with unresolved resource references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    pub id: PathwayId,
    #[serde(flatten)]
    pub fields: PathwayFields,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Pathway {
    #[must_use]
    pub fn resource_ids(&self) -> &[ResourceId] {
        &self.fields.resource_ids
    }

    #[must_use]
    pub fn contains(&self, resource_id: ResourceId) -> bool {
        self.fields.resource_ids.contains(&resource_id)
    }

    /// Replace references with the full records, keeping pathway order.
    /// References that no longer resolve are skipped.
    #[must_use]
    pub fn populate(self, resources: &[Resource]) -> PathwayDetail {
        let ordered = self
            .fields
            .resource_ids
            .iter()
            .filter_map(|id| resources.iter().find(|r| r.id == *id).cloned())
            .collect();
        PathwayDetail {
            id: self.id,
            title: self.fields.title,
            description: self.fields.description,
            category: self.fields.category,
            created_by: self.created_by,
            created_at: self.created_at,
            resources: ordered,
        }
    }
}

/// Pathway with its resources resolved, as served to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayDetail {
    pub id: PathwayId,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub resources: Vec<Resource>,
}
