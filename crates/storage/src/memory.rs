//! In-memory repository for tests and prototyping.
//!
//! All tables sit behind one mutex so multi-row writes are atomic, and the
//! reference checks mirror the foreign keys of the `SQLite` schema.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use club_core::Role;
use club_core::model::{
    Blog, BlogFields, BlogId, Email, Event, EventFields, EventId, PageRequest, Pathway,
    PathwayFields, PathwayId, ProgressEntry, ProgressId, ProgressMark, QueryId, QueryStatus,
    Resource, ResourceFields, ResourceId, User, UserId, UserQuery,
};

use crate::repository::{
    BlogRepository, EventRepository, NewBlogRecord, NewEventRecord, NewPathwayRecord,
    NewQueryRecord, NewResourceRecord, NewSessionRecord, NewUserRecord, PathwayRepository,
    ProgressRepository, QueryRepository, ResourceRepository, SessionRepository, StorageError,
    UserCredentials, UserRepository,
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<UserId, (User, String)>,
    sessions: BTreeMap<String, NewSessionRecord>,
    resources: BTreeMap<ResourceId, Resource>,
    pathways: BTreeMap<PathwayId, Pathway>,
    progress: BTreeMap<ProgressId, ProgressEntry>,
    queries: BTreeMap<QueryId, UserQuery>,
    events: BTreeMap<EventId, Event>,
    blogs: BTreeMap<BlogId, Blog>,
}

impl Tables {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError> {
        let mut t = self.lock()?;
        if t.users.values().any(|(u, _)| u.email == record.email) {
            return Err(StorageError::Conflict);
        }
        let user = User {
            id: UserId::new(t.next()),
            name: record.name,
            email: record.email,
            role: record.role,
            year: record.year,
            created_at: record.created_at,
        };
        t.users.insert(user.id, (user.clone(), record.password_hash));
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError> {
        let t = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| t.users.get(id).map(|(u, _)| u.clone()))
            .collect())
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let t = self.lock()?;
        Ok(t.users
            .values()
            .find(|(u, _)| &u.email == email)
            .map(|(user, hash)| UserCredentials {
                user: user.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.lock()?.users.values().map(|(u, _)| u.clone()).collect())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, StorageError> {
        let mut t = self.lock()?;
        let (user, _) = t.users.get_mut(&id).ok_or(StorageError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: NewSessionRecord) -> Result<(), StorageError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&session.user_id) || t.sessions.contains_key(&session.token) {
            return Err(StorageError::Conflict);
        }
        t.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StorageError> {
        let t = self.lock()?;
        Ok(t.sessions
            .get(token)
            .filter(|s| s.expires_at > now)
            .map(|s| s.user_id))
    }

    async fn delete_session(&self, token: &str) -> Result<(), StorageError> {
        self.lock()?.sessions.remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut t = self.lock()?;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - t.sessions.len()) as u64)
    }
}

fn insert_resource_locked(t: &mut Tables, record: NewResourceRecord) -> Resource {
    let resource = Resource {
        id: ResourceId::new(t.next()),
        fields: record.fields,
        created_at: record.created_at,
    };
    t.resources.insert(resource.id, resource.clone());
    resource
}

#[async_trait]
impl ResourceRepository for InMemoryRepository {
    async fn insert_resource(&self, record: NewResourceRecord) -> Result<Resource, StorageError> {
        let mut t = self.lock()?;
        Ok(insert_resource_locked(&mut t, record))
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, StorageError> {
        Ok(self.lock()?.resources.get(&id).cloned())
    }

    async fn resources_by_ids(&self, ids: &[ResourceId]) -> Result<Vec<Resource>, StorageError> {
        let t = self.lock()?;
        Ok(ids.iter().filter_map(|id| t.resources.get(id).cloned()).collect())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError> {
        Ok(self.lock()?.resources.values().cloned().collect())
    }

    async fn update_resource(
        &self,
        id: ResourceId,
        fields: ResourceFields,
    ) -> Result<Resource, StorageError> {
        let mut t = self.lock()?;
        let resource = t.resources.get_mut(&id).ok_or(StorageError::NotFound)?;
        resource.fields = fields;
        Ok(resource.clone())
    }

    async fn delete_resource(&self, id: ResourceId) -> Result<(), StorageError> {
        let mut t = self.lock()?;
        t.resources.remove(&id).ok_or(StorageError::NotFound)?;
        for pathway in t.pathways.values_mut() {
            pathway.fields.resource_ids.retain(|r| *r != id);
        }
        t.progress.retain(|_, e| e.resource_id != id);
        Ok(())
    }
}

#[async_trait]
impl PathwayRepository for InMemoryRepository {
    async fn insert_pathway(
        &self,
        record: NewPathwayRecord,
        new_resources: Vec<NewResourceRecord>,
    ) -> Result<Pathway, StorageError> {
        let mut t = self.lock()?;
        let refs_ok = t.users.contains_key(&record.created_by)
            && record
                .fields
                .resource_ids
                .iter()
                .all(|id| t.resources.contains_key(id));
        if !refs_ok {
            return Err(StorageError::Conflict);
        }

        let mut fields = record.fields;
        for new in new_resources {
            let created = insert_resource_locked(&mut t, new);
            fields.resource_ids.push(created.id);
        }
        let pathway = Pathway {
            id: PathwayId::new(t.next()),
            fields,
            created_by: record.created_by,
            created_at: record.created_at,
        };
        t.pathways.insert(pathway.id, pathway.clone());
        Ok(pathway)
    }

    async fn get_pathway(&self, id: PathwayId) -> Result<Option<Pathway>, StorageError> {
        Ok(self.lock()?.pathways.get(&id).cloned())
    }

    async fn list_pathways(&self) -> Result<Vec<Pathway>, StorageError> {
        Ok(self.lock()?.pathways.values().cloned().collect())
    }

    async fn update_pathway(
        &self,
        id: PathwayId,
        fields: PathwayFields,
    ) -> Result<Pathway, StorageError> {
        let mut t = self.lock()?;
        if !fields.resource_ids.iter().all(|r| t.resources.contains_key(r)) {
            return Err(StorageError::Conflict);
        }
        let pathway = t.pathways.get_mut(&id).ok_or(StorageError::NotFound)?;
        pathway.fields = fields;
        Ok(pathway.clone())
    }

    async fn delete_pathway(&self, id: PathwayId) -> Result<(), StorageError> {
        let mut t = self.lock()?;
        t.pathways.remove(&id).ok_or(StorageError::NotFound)?;
        let Tables {
            pathways, progress, ..
        } = &mut *t;
        progress.retain(|_, entry| {
            if entry.pathway_id != id {
                return true;
            }
            let still_listed = pathways
                .values()
                .find(|p| p.fields.resource_ids.contains(&entry.resource_id));
            match still_listed {
                Some(other) => {
                    entry.pathway_id = other.id;
                    true
                }
                None => false,
            }
        });
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(
        &self,
        mark: &ProgressMark,
        now: DateTime<Utc>,
    ) -> Result<ProgressEntry, StorageError> {
        let mut t = self.lock()?;
        let refs_ok = t.users.contains_key(&mark.user_id)
            && t.pathways.contains_key(&mark.pathway_id)
            && t.resources.contains_key(&mark.resource_id);
        if !refs_ok {
            return Err(StorageError::Conflict);
        }

        let existing = t
            .progress
            .values_mut()
            .find(|e| e.user_id == mark.user_id && e.resource_id == mark.resource_id);
        if let Some(entry) = existing {
            entry.completed_at = mark
                .status
                .completed_at_after(Some((entry.status, entry.completed_at)), now);
            entry.status = mark.status;
            entry.pathway_id = mark.pathway_id;
            if mark.notes.is_some() {
                entry.notes.clone_from(&mark.notes);
            }
            if mark.source_platform.is_some() {
                entry.source_platform.clone_from(&mark.source_platform);
            }
            entry.updated_at = now;
            return Ok(entry.clone());
        }

        let entry = ProgressEntry {
            id: ProgressId::new(t.next()),
            user_id: mark.user_id,
            pathway_id: mark.pathway_id,
            resource_id: mark.resource_id,
            status: mark.status,
            completed_at: mark.status.completed_at_after(None, now),
            notes: mark.notes.clone(),
            source_platform: mark.source_platform.clone(),
            created_at: now,
            updated_at: now,
        };
        t.progress.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_progress(&self, id: ProgressId) -> Result<Option<ProgressEntry>, StorageError> {
        Ok(self.lock()?.progress.get(&id).cloned())
    }

    async fn entries_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StorageError> {
        let t = self.lock()?;
        Ok(t.progress
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn entries_for_pathway(
        &self,
        pathway_id: PathwayId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let t = self.lock()?;
        Ok(t.progress
            .values()
            .filter(|e| e.pathway_id == pathway_id)
            .cloned()
            .collect())
    }

    async fn entries_for_resources(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let t = self.lock()?;
        Ok(t.progress
            .values()
            .filter(|e| resource_ids.contains(&e.resource_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QueryRepository for InMemoryRepository {
    async fn insert_query(&self, record: NewQueryRecord) -> Result<UserQuery, StorageError> {
        let mut t = self.lock()?;
        let query = UserQuery {
            id: QueryId::new(t.next()),
            first_name: record.draft.first_name,
            last_name: record.draft.last_name,
            email: record.draft.email,
            message: record.draft.message,
            status: QueryStatus::Pending,
            created_at: record.created_at,
        };
        t.queries.insert(query.id, query.clone());
        Ok(query)
    }

    async fn list_queries(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<UserQuery>, u64), StorageError> {
        let t = self.lock()?;
        let mut all: Vec<UserQuery> = t.queries.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = all.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }

    async fn set_query_status(
        &self,
        id: QueryId,
        status: QueryStatus,
    ) -> Result<UserQuery, StorageError> {
        let mut t = self.lock()?;
        let query = t.queries.get_mut(&id).ok_or(StorageError::NotFound)?;
        query.status = status;
        Ok(query.clone())
    }
}

#[async_trait]
impl EventRepository for InMemoryRepository {
    async fn insert_event(&self, record: NewEventRecord) -> Result<Event, StorageError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&record.created_by) {
            return Err(StorageError::Conflict);
        }
        let event = Event {
            id: EventId::new(t.next()),
            fields: record.fields,
            created_by: record.created_by,
            created_at: record.created_at,
        };
        t.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        Ok(self.lock()?.events.get(&id).cloned())
    }

    async fn list_events(&self, include_unpublished: bool) -> Result<Vec<Event>, StorageError> {
        let t = self.lock()?;
        let mut events: Vec<Event> = t
            .events
            .values()
            .filter(|e| include_unpublished || e.fields.published)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.fields.starts_at.cmp(&b.fields.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn update_event(&self, id: EventId, fields: EventFields) -> Result<Event, StorageError> {
        let mut t = self.lock()?;
        let event = t.events.get_mut(&id).ok_or(StorageError::NotFound)?;
        event.fields = fields;
        Ok(event.clone())
    }

    async fn delete_event(&self, id: EventId) -> Result<Event, StorageError> {
        self.lock()?.events.remove(&id).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl BlogRepository for InMemoryRepository {
    async fn insert_blog(&self, record: NewBlogRecord) -> Result<Blog, StorageError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&record.author) {
            return Err(StorageError::Conflict);
        }
        let blog = Blog {
            id: BlogId::new(t.next()),
            fields: record.fields,
            author: record.author,
            published_at: record.published_at,
        };
        t.blogs.insert(blog.id, blog.clone());
        Ok(blog)
    }

    async fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StorageError> {
        Ok(self.lock()?.blogs.get(&id).cloned())
    }

    async fn list_blogs(&self, visible: &[Role]) -> Result<Vec<Blog>, StorageError> {
        let t = self.lock()?;
        let mut blogs: Vec<Blog> = t
            .blogs
            .values()
            .filter(|b| visible.contains(&b.fields.visibility))
            .cloned()
            .collect();
        blogs.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        Ok(blogs)
    }

    async fn update_blog(&self, id: BlogId, fields: BlogFields) -> Result<Blog, StorageError> {
        let mut t = self.lock()?;
        let blog = t.blogs.get_mut(&id).ok_or(StorageError::NotFound)?;
        blog.fields = fields;
        Ok(blog.clone())
    }

    async fn delete_blog(&self, id: BlogId) -> Result<Blog, StorageError> {
        self.lock()?.blogs.remove(&id).ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_core::model::{
        Category, PathwayDraft, ProgressStatus, ResourceDraft,
    };
    use club_core::time::fixed_now;

    async fn seed_user(repo: &InMemoryRepository, email: &str) -> User {
        repo.insert_user(NewUserRecord {
            name: "Junior".into(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".into(),
            role: Role::Junior,
            year: None,
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    fn resource(title: &str) -> NewResourceRecord {
        NewResourceRecord {
            fields: ResourceDraft::titled(title).validate().unwrap(),
            created_at: fixed_now(),
        }
    }

    fn pathway(owner: UserId, ids: Vec<ResourceId>) -> NewPathwayRecord {
        NewPathwayRecord {
            fields: PathwayDraft {
                title: "DS Path".into(),
                description: None,
                category: Some("DS".into()),
                resource_ids: ids,
            }
            .validate()
            .unwrap(),
            created_by: owner,
            created_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryRepository::new();
        seed_user(&repo, "a@x.io").await;
        let err = repo
            .insert_user(NewUserRecord {
                name: "Other".into(),
                email: Email::parse("A@X.io").unwrap(),
                password_hash: "h".into(),
                role: Role::Public,
                year: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn pathway_with_unknown_owner_stores_nothing() {
        let repo = InMemoryRepository::new();
        let err = repo
            .insert_pathway(pathway(UserId::new(77), vec![]), vec![resource("a"), resource("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert!(repo.list_resources().await.unwrap().is_empty());
        assert!(repo.list_pathways().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_resource_cascades() {
        let repo = InMemoryRepository::new();
        let user = seed_user(&repo, "a@x.io").await;
        let r1 = repo.insert_resource(resource("one")).await.unwrap();
        let r2 = repo.insert_resource(resource("two")).await.unwrap();
        let p = repo
            .insert_pathway(pathway(user.id, vec![r1.id, r2.id]), vec![])
            .await
            .unwrap();
        let mark = ProgressMark::new(user.id, p.id, r1.id, ProgressStatus::Completed);
        repo.upsert_progress(&mark, fixed_now()).await.unwrap();

        repo.delete_resource(r1.id).await.unwrap();

        let p = repo.get_pathway(p.id).await.unwrap().unwrap();
        assert_eq!(p.resource_ids(), &[r2.id]);
        assert!(repo.entries_for_user(user.id).await.unwrap().is_empty());
        assert_eq!(p.fields.category, Category::DataScience);
    }

    #[tokio::test]
    async fn deleting_pathway_keeps_progress_on_shared_resources() {
        let repo = InMemoryRepository::new();
        let user = seed_user(&repo, "a@x.io").await;
        let shared = repo.insert_resource(resource("shared")).await.unwrap();
        let own = repo.insert_resource(resource("own")).await.unwrap();
        let keep = repo
            .insert_pathway(pathway(user.id, vec![shared.id]), vec![])
            .await
            .unwrap();
        let doomed = repo
            .insert_pathway(pathway(user.id, vec![shared.id, own.id]), vec![])
            .await
            .unwrap();
        for resource_id in [shared.id, own.id] {
            let mark = ProgressMark::new(user.id, doomed.id, resource_id, ProgressStatus::Completed);
            repo.upsert_progress(&mark, fixed_now()).await.unwrap();
        }

        repo.delete_pathway(doomed.id).await.unwrap();

        let entries = repo.entries_for_user(user.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_id, shared.id);
        assert_eq!(entries[0].pathway_id, keep.id);
    }
}
