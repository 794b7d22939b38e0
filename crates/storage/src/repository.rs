use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use club_core::Role;
use club_core::model::{
    Blog, BlogFields, BlogId, Email, Event, EventFields, EventId, PageRequest, Pathway,
    PathwayFields, PathwayId, ProgressEntry, ProgressId, ProgressMark, QueryDraft, QueryId,
    QueryStatus, Resource, ResourceFields, ResourceId, User, UserId, UserQuery,
};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// A uniqueness or reference constraint rejected the write.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub year: Option<u8>,
    pub created_at: DateTime<Utc>,
}

/// A user together with the stored credential hash, used only for login.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResourceRecord {
    pub fields: ResourceFields,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPathwayRecord {
    pub fields: PathwayFields,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQueryRecord {
    pub draft: QueryDraft,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEventRecord {
    pub fields: EventFields,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBlogRecord {
    pub fields: BlogFields,
    pub author: UserId,
    pub published_at: DateTime<Utc>,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the email is already registered.
    async fn insert_user(&self, user: NewUserRecord) -> Result<User, StorageError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Fetch the users that exist among `ids`, in no particular order.
    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError>;

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, StorageError>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn set_role(&self, id: UserId, role: Role) -> Result<User, StorageError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: NewSessionRecord) -> Result<(), StorageError>;

    /// Resolve a token to its user if the session has not expired at `now`.
    async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StorageError>;

    async fn delete_session(&self, token: &str) -> Result<(), StorageError>;

    /// Remove sessions that expired before `now`; returns how many went.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn insert_resource(&self, record: NewResourceRecord) -> Result<Resource, StorageError>;

    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, StorageError>;

    /// Fetch the resources that exist among `ids`, in no particular order.
    async fn resources_by_ids(&self, ids: &[ResourceId]) -> Result<Vec<Resource>, StorageError>;

    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError>;

    /// Replace a resource's attributes, keeping its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the resource does not exist.
    async fn update_resource(
        &self,
        id: ResourceId,
        fields: ResourceFields,
    ) -> Result<Resource, StorageError>;

    /// Delete a resource, dropping it from every pathway and removing the
    /// progress recorded against it, atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the resource does not exist.
    async fn delete_resource(&self, id: ResourceId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PathwayRepository: Send + Sync {
    /// Insert `new_resources`, then a pathway whose resource list is the
    /// record's references followed by the new resources in order. Either
    /// everything is stored or nothing is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a reference (owner or resource)
    /// does not resolve.
    async fn insert_pathway(
        &self,
        record: NewPathwayRecord,
        new_resources: Vec<NewResourceRecord>,
    ) -> Result<Pathway, StorageError>;

    async fn get_pathway(&self, id: PathwayId) -> Result<Option<Pathway>, StorageError>;

    async fn list_pathways(&self) -> Result<Vec<Pathway>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the pathway does not exist.
    async fn update_pathway(
        &self,
        id: PathwayId,
        fields: PathwayFields,
    ) -> Result<Pathway, StorageError>;

    /// Delete a pathway. Resources stay. Progress recorded under it moves to
    /// the lowest-id pathway that still lists the entry's resource, or is
    /// deleted when no pathway does. Runs atomically.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the pathway does not exist.
    async fn delete_pathway(&self, id: PathwayId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert-or-update the entry for `(mark.user_id, mark.resource_id)` in a
    /// single atomic statement, applying the completion-stamp policy of
    /// `ProgressStatus::completed_at_after`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user, pathway, or resource
    /// does not exist.
    async fn upsert_progress(
        &self,
        mark: &ProgressMark,
        now: DateTime<Utc>,
    ) -> Result<ProgressEntry, StorageError>;

    async fn get_progress(&self, id: ProgressId) -> Result<Option<ProgressEntry>, StorageError>;

    /// Entries of one user, ordered by id.
    async fn entries_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StorageError>;

    /// Entries whose pathway field is `pathway_id`, ordered by id.
    async fn entries_for_pathway(
        &self,
        pathway_id: PathwayId,
    ) -> Result<Vec<ProgressEntry>, StorageError>;

    /// Entries on any of `resource_ids`, ordered by id.
    async fn entries_for_resources(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<ProgressEntry>, StorageError>;
}

#[async_trait]
pub trait QueryRepository: Send + Sync {
    async fn insert_query(&self, record: NewQueryRecord) -> Result<UserQuery, StorageError>;

    /// One page of queries, newest first, plus the total count.
    async fn list_queries(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<UserQuery>, u64), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the query does not exist.
    async fn set_query_status(
        &self,
        id: QueryId,
        status: QueryStatus,
    ) -> Result<UserQuery, StorageError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert_event(&self, record: NewEventRecord) -> Result<Event, StorageError>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError>;

    /// Events by start time; unpublished ones only when asked for.
    async fn list_events(&self, include_unpublished: bool) -> Result<Vec<Event>, StorageError>;

    async fn update_event(&self, id: EventId, fields: EventFields) -> Result<Event, StorageError>;

    /// Delete and return the removed event.
    async fn delete_event(&self, id: EventId) -> Result<Event, StorageError>;
}

#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn insert_blog(&self, record: NewBlogRecord) -> Result<Blog, StorageError>;

    async fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StorageError>;

    /// Blogs whose visibility is within `visible`, newest first.
    async fn list_blogs(&self, visible: &[Role]) -> Result<Vec<Blog>, StorageError>;

    async fn update_blog(&self, id: BlogId, fields: BlogFields) -> Result<Blog, StorageError>;

    /// Delete and return the removed blog.
    async fn delete_blog(&self, id: BlogId) -> Result<Blog, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    pub pathways: Arc<dyn PathwayRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub queries: Arc<dyn QueryRepository>,
    pub events: Arc<dyn EventRepository>,
    pub blogs: Arc<dyn BlogRepository>,
}

impl Storage {
    /// Build every repository handle from one backend value.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: UserRepository
            + SessionRepository
            + ResourceRepository
            + PathwayRepository
            + ProgressRepository
            + QueryRepository
            + EventRepository
            + BlogRepository
            + 'static,
    {
        let repo = Arc::new(repo);
        Self {
            users: repo.clone(),
            sessions: repo.clone(),
            resources: repo.clone(),
            pathways: repo.clone(),
            progress: repo.clone(),
            queries: repo.clone(),
            events: repo.clone(),
            blogs: repo,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }
}
