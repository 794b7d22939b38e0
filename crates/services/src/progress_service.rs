use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use club_core::completion::{self, Completion, RosterRow, Standing};
use club_core::model::{
    Category, Email, Pathway, PathwayDetail, PathwayId, ProgressEntry, ProgressId, ProgressMark,
    ProgressStatus, Resource, ResourceId, UserId,
};
use club_core::{Actor, Permission};
use storage::repository::{
    PathwayRepository, ProgressRepository, ResourceRepository, StorageError, UserRepository,
};

use crate::Clock;
use crate::error::ProgressError;

/// Minimal pathway reference embedded in progress views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwaySummary {
    pub id: PathwayId,
    pub title: String,
    pub category: Category,
}

impl From<&Pathway> for PathwaySummary {
    fn from(p: &Pathway) -> Self {
        Self {
            id: p.id,
            title: p.fields.title.clone(),
            category: p.fields.category,
        }
    }
}

/// A ledger entry with its pathway and resource resolved. Either side is
/// `None` when the record no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: ProgressEntry,
    pub pathway: Option<PathwaySummary>,
    pub resource: Option<Resource>,
}

/// The caller's completion of one pathway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayCompletion {
    pub pathway: PathwayDetail,
    #[serde(flatten)]
    pub completion: Completion,
    pub entries: Vec<ProgressEntry>,
}

/// One overview line per pathway the caller has touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewItem {
    pub pathway: PathwaySummary,
    #[serde(flatten)]
    pub completion: Completion,
    pub standing: Standing,
}

/// Roster row with the member's display details. Email is only filled in
/// for admin views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    #[serde(flatten)]
    pub row: RosterRow,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

/// Records per-user resource status and derives completion views.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    resources: Arc<dyn ResourceRepository>,
    pathways: Arc<dyn PathwayRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        resources: Arc<dyn ResourceRepository>,
        pathways: Arc<dyn PathwayRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            resources,
            pathways,
            progress,
        }
    }

    /// Record the caller's status on a resource of a pathway.
    ///
    /// There is one entry per (user, resource); marking again updates it and
    /// moves it under `pathway_id`. Notes and source platform are only
    /// overwritten when given.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is a junior or admin,
    /// `ProgressError::NotInPathway` when the resource is not listed in the
    /// pathway, and `ProgressError::Storage` (`NotFound`) for an unknown
    /// pathway.
    pub async fn mark(
        &self,
        actor: &Actor,
        pathway_id: PathwayId,
        resource_id: ResourceId,
        status: ProgressStatus,
        notes: Option<String>,
        source_platform: Option<String>,
    ) -> Result<ProgressEntry, ProgressError> {
        let me = actor.require(Permission::TrackOwnProgress)?;
        let pathway = self.pathway(pathway_id).await?;
        if !pathway.contains(resource_id) {
            return Err(ProgressError::NotInPathway {
                pathway: pathway_id,
                resource: resource_id,
            });
        }

        let mark = ProgressMark::new(me.user_id, pathway_id, resource_id, status)
            .with_notes(notes)
            .with_source_platform(source_platform);
        let entry = self.progress.upsert_progress(&mark, self.clock.now()).await?;
        tracing::info!(
            entry_id = %entry.id,
            user_id = %me.user_id,
            pathway_id = %pathway_id,
            resource_id = %resource_id,
            status = %status,
            "progress recorded"
        );
        Ok(entry)
    }

    /// Change the status (and optionally the notes) of one of the caller's
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` with `NotFound` when the entry does not
    /// exist or belongs to someone else.
    pub async fn update_entry(
        &self,
        actor: &Actor,
        entry_id: ProgressId,
        status: ProgressStatus,
        notes: Option<String>,
    ) -> Result<ProgressEntry, ProgressError> {
        let me = actor.require(Permission::TrackOwnProgress)?;
        let existing = self
            .progress
            .get_progress(entry_id)
            .await?
            .filter(|e| e.user_id == me.user_id)
            .ok_or(StorageError::NotFound)?;

        let mark = ProgressMark::new(me.user_id, existing.pathway_id, existing.resource_id, status)
            .with_notes(notes);
        let entry = self.progress.upsert_progress(&mark, self.clock.now()).await?;
        tracing::info!(entry_id = %entry.id, status = %status, "progress entry updated");
        Ok(entry)
    }

    /// All of the caller's entries with pathway and resource resolved.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is a junior or admin.
    pub async fn my_entries(&self, actor: &Actor) -> Result<Vec<EntryDetail>, ProgressError> {
        let me = actor.require(Permission::TrackOwnProgress)?;
        let entries = self.progress.entries_for_user(me.user_id).await?;

        let resource_ids: Vec<ResourceId> = entries.iter().map(|e| e.resource_id).collect();
        let resources: HashMap<ResourceId, Resource> = self
            .resources
            .resources_by_ids(&resource_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let mut pathways: HashMap<PathwayId, Option<PathwaySummary>> = HashMap::new();
        for id in completion::pathways_touched(&entries) {
            let summary = self.pathways.get_pathway(id).await?;
            pathways.insert(id, summary.as_ref().map(PathwaySummary::from));
        }

        Ok(entries
            .into_iter()
            .map(|entry| EntryDetail {
                pathway: pathways.get(&entry.pathway_id).cloned().flatten(),
                resource: resources.get(&entry.resource_id).cloned(),
                entry,
            })
            .collect())
    }

    /// Every entry recorded under a pathway, for admins.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is an admin and a
    /// `NotFound` storage error for an unknown pathway.
    pub async fn entries_for_pathway(
        &self,
        actor: &Actor,
        pathway_id: PathwayId,
    ) -> Result<Vec<ProgressEntry>, ProgressError> {
        actor.require(Permission::ViewCohortProgress)?;
        self.pathway(pathway_id).await?;
        Ok(self.progress.entries_for_pathway(pathway_id).await?)
    }

    /// The caller's completion of a pathway.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is a junior or admin
    /// and a `NotFound` storage error for an unknown pathway.
    pub async fn completion(
        &self,
        actor: &Actor,
        pathway_id: PathwayId,
    ) -> Result<PathwayCompletion, ProgressError> {
        let me = actor.require(Permission::TrackOwnProgress)?;
        let pathway = self.pathway(pathway_id).await?;
        let entries: Vec<ProgressEntry> = self
            .progress
            .entries_for_user(me.user_id)
            .await?
            .into_iter()
            .filter(|e| pathway.contains(e.resource_id))
            .collect();

        let completion = completion::completion_for(&pathway, &entries);
        let resources = self.resources.resources_by_ids(pathway.resource_ids()).await?;
        Ok(PathwayCompletion {
            pathway: pathway.populate(&resources),
            completion,
            entries,
        })
    }

    /// Per-user completion for everyone with an entry under the pathway.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is an admin and a
    /// `NotFound` storage error for an unknown pathway.
    pub async fn roster(
        &self,
        actor: &Actor,
        pathway_id: PathwayId,
    ) -> Result<Vec<RosterMember>, ProgressError> {
        actor.require(Permission::ViewCohortProgress)?;
        let rows = self.roster_rows(pathway_id).await?;
        self.with_members(rows, true).await
    }

    /// The roster ranked by completed resources, highest first. Open to
    /// juniors, so member emails are left out.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is a junior or admin
    /// and a `NotFound` storage error for an unknown pathway.
    pub async fn comparative(
        &self,
        actor: &Actor,
        pathway_id: PathwayId,
    ) -> Result<Vec<RosterMember>, ProgressError> {
        actor.require(Permission::TrackOwnProgress)?;
        let mut rows = self.roster_rows(pathway_id).await?;
        completion::rank_by_completed(&mut rows);
        self.with_members(rows, actor.is_admin()).await
    }

    /// The caller's completion of every pathway they have an entry in.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Access` unless the caller is a junior or admin.
    pub async fn overview(&self, actor: &Actor) -> Result<Vec<OverviewItem>, ProgressError> {
        let me = actor.require(Permission::TrackOwnProgress)?;
        let entries = self.progress.entries_for_user(me.user_id).await?;

        let mut items = Vec::new();
        for id in completion::pathways_touched(&entries) {
            let Some(pathway) = self.pathways.get_pathway(id).await? else {
                continue;
            };
            let completion = completion::completion_for(&pathway, &entries);
            items.push(OverviewItem {
                pathway: PathwaySummary::from(&pathway),
                standing: completion.standing(),
                completion,
            });
        }
        Ok(items)
    }

    async fn pathway(&self, id: PathwayId) -> Result<Pathway, ProgressError> {
        Ok(self
            .pathways
            .get_pathway(id)
            .await?
            .ok_or(StorageError::NotFound)?)
    }

    async fn roster_rows(&self, pathway_id: PathwayId) -> Result<Vec<RosterRow>, ProgressError> {
        let pathway = self.pathway(pathway_id).await?;
        let pathway_entries = self.progress.entries_for_pathway(pathway_id).await?;
        let resource_entries = self
            .progress
            .entries_for_resources(pathway.resource_ids())
            .await?;
        Ok(completion::roster(
            &pathway,
            &pathway_entries,
            &resource_entries,
        ))
    }

    async fn with_members(
        &self,
        rows: Vec<RosterRow>,
        include_email: bool,
    ) -> Result<Vec<RosterMember>, ProgressError> {
        let ids: Vec<UserId> = rows.iter().map(|r| r.user_id).collect();
        let users: HashMap<_, _> = self
            .users
            .users_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let user = users.get(&row.user_id)?;
                Some(RosterMember {
                    row,
                    name: user.name.clone(),
                    email: include_email.then(|| user.email.clone()),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use club_core::model::{PathwayDraft, ResourceDraft, User};
    use club_core::time::fixed_clock;
    use club_core::{AccessError, Role};
    use storage::repository::{NewPathwayRecord, NewResourceRecord, NewUserRecord, Storage};

    struct Fixture {
        storage: Storage,
        service: ProgressService,
        pathway: Pathway,
    }

    async fn user(storage: &Storage, email: &str, role: Role) -> User {
        storage
            .users
            .insert_user(NewUserRecord {
                name: email.split('@').next().unwrap_or_default().into(),
                email: Email::parse(email).unwrap(),
                password_hash: "h".into(),
                role,
                year: None,
                created_at: fixed_clock().now(),
            })
            .await
            .unwrap()
    }

    async fn fixture(resource_count: usize) -> Fixture {
        let storage = Storage::in_memory();
        let admin = user(&storage, "admin@club.io", Role::Admin).await;
        let mut ids = Vec::new();
        for n in 0..resource_count {
            let r = storage
                .resources
                .insert_resource(NewResourceRecord {
                    fields: ResourceDraft::titled(format!("R{n}")).validate().unwrap(),
                    created_at: fixed_clock().now(),
                })
                .await
                .unwrap();
            ids.push(r.id);
        }
        let pathway = storage
            .pathways
            .insert_pathway(
                NewPathwayRecord {
                    fields: PathwayDraft {
                        title: "DS Path".into(),
                        description: None,
                        category: Some("DS".into()),
                        resource_ids: ids,
                    }
                    .validate()
                    .unwrap(),
                    created_by: admin.id,
                    created_at: fixed_clock().now(),
                },
                Vec::new(),
            )
            .await
            .unwrap();
        let service = ProgressService::new(
            fixed_clock(),
            Arc::clone(&storage.users),
            Arc::clone(&storage.resources),
            Arc::clone(&storage.pathways),
            Arc::clone(&storage.progress),
        );
        Fixture {
            storage,
            service,
            pathway,
        }
    }

    #[tokio::test]
    async fn second_mark_replaces_status_of_single_entry() {
        let f = fixture(1).await;
        let junior = user(&f.storage, "u1@club.io", Role::Junior).await;
        let actor = Actor::user(junior.id, Role::Junior);
        let r = f.pathway.resource_ids()[0];

        f.service
            .mark(&actor, f.pathway.id, r, ProgressStatus::InProgress, None, None)
            .await
            .unwrap();
        f.service
            .mark(&actor, f.pathway.id, r, ProgressStatus::Completed, None, None)
            .await
            .unwrap();

        let mine = f.service.my_entries(&actor).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].entry.status, ProgressStatus::Completed);
        assert_eq!(mine[0].resource.as_ref().map(|r| r.id), Some(r));
        assert_eq!(mine[0].pathway.as_ref().map(|p| p.id), Some(f.pathway.id));
    }

    #[tokio::test]
    async fn repeat_completion_keeps_first_timestamp() {
        let f = fixture(1).await;
        let junior = user(&f.storage, "u1@club.io", Role::Junior).await;
        let actor = Actor::user(junior.id, Role::Junior);
        let r = f.pathway.resource_ids()[0];

        let first = f
            .service
            .mark(&actor, f.pathway.id, r, ProgressStatus::Completed, None, None)
            .await
            .unwrap();
        let later = ProgressService {
            clock: fixed_clock().advanced(Duration::days(3)),
            ..f.service.clone()
        };
        let second = later
            .mark(&actor, f.pathway.id, r, ProgressStatus::Completed, None, None)
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.completed_at, first.completed_at);

        let regressed = later
            .update_entry(&actor, first.id, ProgressStatus::InProgress, None)
            .await
            .unwrap();
        assert_eq!(regressed.completed_at, None);
    }

    #[tokio::test]
    async fn single_resource_completion_is_full() {
        let f = fixture(1).await;
        let junior = user(&f.storage, "u1@club.io", Role::Junior).await;
        let actor = Actor::user(junior.id, Role::Junior);
        f.service
            .mark(
                &actor,
                f.pathway.id,
                f.pathway.resource_ids()[0],
                ProgressStatus::Completed,
                None,
                None,
            )
            .await
            .unwrap();

        let view = f.service.completion(&actor, f.pathway.id).await.unwrap();
        assert_eq!(view.completion.completed_count, 1);
        assert_eq!(view.completion.total_count, 1);
        assert_eq!(view.completion.percentage, 100);
    }

    #[tokio::test]
    async fn roster_lists_only_members_with_entries() {
        let f = fixture(1).await;
        let u1 = user(&f.storage, "u1@club.io", Role::Junior).await;
        let _u2 = user(&f.storage, "u2@club.io", Role::Junior).await;
        f.service
            .mark(
                &Actor::user(u1.id, Role::Junior),
                f.pathway.id,
                f.pathway.resource_ids()[0],
                ProgressStatus::Completed,
                None,
                None,
            )
            .await
            .unwrap();

        let admin = Actor::user(f.pathway.created_by, Role::Admin);
        let roster = f.service.roster(&admin, f.pathway.id).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].row.user_id, u1.id);
        assert_eq!(roster[0].row.standing, Standing::Certified);
        assert_eq!(roster[0].email.as_ref().map(Email::as_str), Some("u1@club.io"));
    }

    #[tokio::test]
    async fn comparative_ranks_by_completed_and_hides_email_from_juniors() {
        let f = fixture(2).await;
        let [r1, r2] = [f.pathway.resource_ids()[0], f.pathway.resource_ids()[1]];
        let slow = user(&f.storage, "slow@club.io", Role::Junior).await;
        let fast = user(&f.storage, "fast@club.io", Role::Junior).await;
        let slow_actor = Actor::user(slow.id, Role::Junior);
        let fast_actor = Actor::user(fast.id, Role::Junior);

        f.service
            .mark(&slow_actor, f.pathway.id, r1, ProgressStatus::InProgress, None, None)
            .await
            .unwrap();
        for r in [r1, r2] {
            f.service
                .mark(&fast_actor, f.pathway.id, r, ProgressStatus::Completed, None, None)
                .await
                .unwrap();
        }

        let ranked = f.service.comparative(&slow_actor, f.pathway.id).await.unwrap();
        let order: Vec<_> = ranked.iter().map(|m| m.row.user_id).collect();
        assert_eq!(order, vec![fast.id, slow.id]);
        assert!(ranked.iter().all(|m| m.email.is_none()));
    }

    #[tokio::test]
    async fn public_users_cannot_mark_and_nothing_is_written() {
        let f = fixture(1).await;
        let visitor = user(&f.storage, "v@club.io", Role::Public).await;
        let r = f.pathway.resource_ids()[0];
        for actor in [Actor::Anonymous, Actor::user(visitor.id, Role::Public)] {
            let err = f
                .service
                .mark(&actor, f.pathway.id, r, ProgressStatus::Completed, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ProgressError::Access(_)));
        }
        assert!(f.storage.progress.entries_for_resources(&[r]).await.unwrap().is_empty());
        let err = f
            .service
            .mark(&Actor::Anonymous, f.pathway.id, r, ProgressStatus::Completed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Access(AccessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn resource_outside_pathway_is_rejected() {
        let f = fixture(1).await;
        let junior = user(&f.storage, "u1@club.io", Role::Junior).await;
        let err = f
            .service
            .mark(
                &Actor::user(junior.id, Role::Junior),
                f.pathway.id,
                ResourceId::new(999),
                ProgressStatus::InProgress,
                None,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotInPathway { .. }));
    }

    #[tokio::test]
    async fn other_users_entries_are_not_found() {
        let f = fixture(1).await;
        let owner = user(&f.storage, "o@club.io", Role::Junior).await;
        let intruder = user(&f.storage, "i@club.io", Role::Junior).await;
        let entry = f
            .service
            .mark(
                &Actor::user(owner.id, Role::Junior),
                f.pathway.id,
                f.pathway.resource_ids()[0],
                ProgressStatus::InProgress,
                None,
                None,
            )
            .await
            .unwrap();
        let err = f
            .service
            .update_entry(
                &Actor::user(intruder.id, Role::Junior),
                entry.id,
                ProgressStatus::Completed,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn overview_covers_touched_pathways() {
        let f = fixture(2).await;
        let junior = user(&f.storage, "u1@club.io", Role::Junior).await;
        let actor = Actor::user(junior.id, Role::Junior);
        f.service
            .mark(
                &actor,
                f.pathway.id,
                f.pathway.resource_ids()[0],
                ProgressStatus::Completed,
                None,
                None,
            )
            .await
            .unwrap();
        let overview = f.service.overview(&actor).await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].completion.percentage, 50);
        assert_eq!(overview[0].standing, Standing::InProgress);
    }
}
