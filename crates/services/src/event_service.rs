use std::sync::Arc;

use club_core::model::{Event, EventDraft, EventId};
use club_core::{Actor, Permission};
use storage::repository::{EventRepository, NewEventRecord, StorageError};

use crate::Clock;
use crate::error::ContentServiceError;
use crate::image_store::{ImageStore, discard_in_background};

/// Club events. Drafts stay hidden from everyone but admins.
#[derive(Clone)]
pub struct EventService {
    clock: Clock,
    events: Arc<dyn EventRepository>,
    images: Arc<dyn ImageStore>,
}

impl EventService {
    #[must_use]
    pub fn new(clock: Clock, events: Arc<dyn EventRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            clock,
            events,
            images,
        }
    }

    /// Events by start time. Non-admins only see published ones.
    ///
    /// # Errors
    ///
    /// Returns `ContentServiceError::Storage` if repository access fails.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Event>, ContentServiceError> {
        actor.check(Permission::ReadPublished)?;
        Ok(self.events.list_events(actor.is_admin()).await?)
    }

    /// # Errors
    ///
    /// Returns a `NotFound` storage error for unknown ids and for drafts
    /// requested by non-admins.
    pub async fn get(&self, actor: &Actor, id: EventId) -> Result<Event, ContentServiceError> {
        actor.check(Permission::ReadPublished)?;
        Ok(self
            .events
            .get_event(id)
            .await?
            .filter(|e| e.fields.published || actor.is_admin())
            .ok_or(StorageError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `ContentServiceError::Access` unless the caller is an admin and
    /// `ContentServiceError::Content` for invalid input.
    pub async fn create(
        &self,
        actor: &Actor,
        draft: EventDraft,
    ) -> Result<Event, ContentServiceError> {
        let admin = actor.require(Permission::ManageContent)?;
        let fields = draft.validate()?;
        let event = self
            .events
            .insert_event(NewEventRecord {
                fields,
                created_by: admin.user_id,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(event_id = %event.id, "event created");
        Ok(event)
    }

    /// Replace an event's details. A replaced cover image is removed from the
    /// image host.
    ///
    /// # Errors
    ///
    /// Same as [`EventService::create`], plus `NotFound` for unknown ids.
    pub async fn update(
        &self,
        actor: &Actor,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Event, ContentServiceError> {
        actor.require(Permission::ManageContent)?;
        let fields = draft.validate()?;
        let previous = self
            .events
            .get_event(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let event = self.events.update_event(id, fields).await?;
        if previous.fields.image_url != event.fields.image_url {
            discard_in_background(&self.images, previous.fields.image_url, "event");
        }
        tracing::info!(event_id = %id, "event updated");
        Ok(event)
    }

    /// # Errors
    ///
    /// Returns `ContentServiceError::Access` unless the caller is an admin and
    /// a `NotFound` storage error for unknown ids.
    pub async fn delete(&self, actor: &Actor, id: EventId) -> Result<(), ContentServiceError> {
        actor.require(Permission::ManageContent)?;
        let removed = self.events.delete_event(id).await?;
        discard_in_background(&self.images, removed.fields.image_url, "event");
        tracing::info!(event_id = %id, "event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use club_core::Role;
    use club_core::model::{Email, UserId};
    use club_core::time::{fixed_clock, fixed_now};
    use storage::repository::{NewUserRecord, Storage};

    use crate::error::ImageStoreError;

    /// Records deletes and fails every call.
    #[derive(Default)]
    struct FailingImages {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageStore for FailingImages {
        async fn delete(&self, url: &str) -> Result<(), ImageStoreError> {
            self.seen.lock().unwrap().push(url.to_owned());
            Err(ImageStoreError::UnrecognizedUrl(url.to_owned()))
        }
    }

    /// Never answers.
    struct StalledImages;

    #[async_trait]
    impl ImageStore for StalledImages {
        async fn delete(&self, _url: &str) -> Result<(), ImageStoreError> {
            std::future::pending().await
        }
    }

    fn draft(published: bool, image: Option<&str>) -> EventDraft {
        EventDraft {
            title: "Kickoff".into(),
            description: None,
            starts_at: fixed_now(),
            ends_at: None,
            location: Some("Hall 2".into()),
            online_url: None,
            published: Some(published),
            image_url: image.map(str::to_owned),
        }
    }

    async fn setup(images: Arc<dyn ImageStore>) -> (EventService, Actor) {
        let storage = Storage::in_memory();
        let admin = storage
            .users
            .insert_user(NewUserRecord {
                name: "Admin".into(),
                email: Email::parse("admin@club.io").unwrap(),
                password_hash: "h".into(),
                role: Role::Admin,
                year: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let service = EventService::new(fixed_clock(), Arc::clone(&storage.events), images);
        (service, Actor::user(admin.id, Role::Admin))
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_non_admins() {
        let (service, admin) = setup(Arc::new(crate::image_store::NoopImageStore)).await;
        let public = service.create(&admin, draft(true, None)).await.unwrap();
        let hidden = service.create(&admin, draft(false, None)).await.unwrap();

        let junior = Actor::user(UserId::new(50), Role::Junior);
        let seen: Vec<_> = service.list(&junior).await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(seen, vec![public.id]);
        assert_eq!(service.list(&admin).await.unwrap().len(), 2);
        assert!(matches!(
            service.get(&Actor::Anonymous, hidden.id).await,
            Err(ContentServiceError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn image_cleanup_failure_does_not_fail_delete() {
        let images = Arc::new(FailingImages::default());
        let (service, admin) = setup(images.clone()).await;
        let url = "https://img.example.com/club/upload/v1/events/kickoff.jpg";
        let event = service.create(&admin, draft(true, Some(url))).await.unwrap();

        service.delete(&admin, event.id).await.unwrap();

        for _ in 0..50 {
            if !images.seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(*images.seen.lock().unwrap(), vec![url.to_string()]);
        assert!(matches!(
            service.get(&admin, event.id).await,
            Err(ContentServiceError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn stalled_image_host_does_not_hold_up_delete() {
        let (service, admin) = setup(Arc::new(StalledImages)).await;
        let url = "https://img.example.com/club/upload/v1/events/kickoff.jpg";
        let event = service.create(&admin, draft(true, Some(url))).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), service.delete(&admin, event.id))
            .await
            .expect("delete returned while the image host stalls")
            .unwrap();

        let replaced = service.create(&admin, draft(true, Some(url))).await.unwrap();
        tokio::time::timeout(
            Duration::from_secs(1),
            service.update(&admin, replaced.id, draft(true, None)),
        )
        .await
        .expect("update returned while the image host stalls")
        .unwrap();
    }
}
