use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParseEnumError, optional_text};
use crate::model::ids::{PathwayId, ProgressId, ResourceId, UserId};

/// Completion state of one resource for one user.
///
/// Any state may follow any other; there is no required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }

    /// Completion timestamp to store after moving to `self`.
    ///
    /// A fresh completion is stamped with `now`. Repeating `completed` keeps
    /// the original stamp, and leaving `completed` clears it.
    #[must_use]
    pub fn completed_at_after(
        self,
        previous: Option<(ProgressStatus, Option<DateTime<Utc>>)>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match (self, previous) {
            (ProgressStatus::Completed, Some((ProgressStatus::Completed, Some(at)))) => Some(at),
            (ProgressStatus::Completed, _) => Some(now),
            _ => None,
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ProgressStatus::NotStarted),
            "in_progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            other => Err(ParseEnumError::new("progress status", other)),
        }
    }
}

/// A request to record a status, keyed on `(user_id, resource_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMark {
    pub user_id: UserId,
    pub pathway_id: PathwayId,
    pub resource_id: ResourceId,
    pub status: ProgressStatus,
    pub notes: Option<String>,
    pub source_platform: Option<String>,
}

impl ProgressMark {
    #[must_use]
    pub fn new(
        user_id: UserId,
        pathway_id: PathwayId,
        resource_id: ResourceId,
        status: ProgressStatus,
    ) -> Self {
        Self {
            user_id,
            pathway_id,
            resource_id,
            status,
            notes: None,
            source_platform: None,
        }
    }

    /// Attach free-text notes; blank notes are ignored.
    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = optional_text(notes);
        self
    }

    #[must_use]
    pub fn with_source_platform(mut self, platform: Option<String>) -> Self {
        self.source_platform = optional_text(platform);
        self
    }
}

/// One row of the progress ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub id: ProgressId,
    pub user_id: UserId,
    pub pathway_id: PathwayId,
    pub resource_id: ResourceId,
    pub status: ProgressStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub source_platform: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressEntry {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn first_completion_is_stamped() {
        let now = fixed_now();
        assert_eq!(ProgressStatus::Completed.completed_at_after(None, now), Some(now));
        assert_eq!(
            ProgressStatus::Completed
                .completed_at_after(Some((ProgressStatus::InProgress, None)), now),
            Some(now)
        );
    }

    #[test]
    fn repeat_completion_keeps_first_stamp() {
        let first = fixed_now();
        let later = first + Duration::hours(3);
        let kept = ProgressStatus::Completed
            .completed_at_after(Some((ProgressStatus::Completed, Some(first))), later);
        assert_eq!(kept, Some(first));
    }

    #[test]
    fn regression_clears_stamp() {
        let now = fixed_now();
        for status in [ProgressStatus::InProgress, ProgressStatus::NotStarted] {
            assert_eq!(
                status.completed_at_after(Some((ProgressStatus::Completed, Some(now))), now),
                None
            );
        }
    }

    #[test]
    fn blank_notes_are_dropped() {
        let mark = ProgressMark::new(
            UserId::new(1),
            PathwayId::new(1),
            ResourceId::new(1),
            ProgressStatus::InProgress,
        )
        .with_notes(Some("   ".into()));
        assert_eq!(mark.notes, None);
    }

    #[test]
    fn status_strings_match_wire_format() {
        assert_eq!("in_progress".parse::<ProgressStatus>().unwrap(), ProgressStatus::InProgress);
        assert!("done".parse::<ProgressStatus>().is_err());
    }
}
