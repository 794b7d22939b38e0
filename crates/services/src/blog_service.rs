use std::sync::Arc;

use club_core::model::{Blog, BlogDraft, BlogId};
use club_core::{Actor, Permission, Role};
use storage::repository::{BlogRepository, NewBlogRecord, StorageError};

use crate::Clock;
use crate::error::ContentServiceError;
use crate::image_store::{ImageStore, discard_in_background};

const ALL_ROLES: [Role; 3] = [Role::Public, Role::Junior, Role::Admin];

/// Blog posts with role-based visibility.
#[derive(Clone)]
pub struct BlogService {
    clock: Clock,
    blogs: Arc<dyn BlogRepository>,
    images: Arc<dyn ImageStore>,
}

impl BlogService {
    #[must_use]
    pub fn new(clock: Clock, blogs: Arc<dyn BlogRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            clock,
            blogs,
            images,
        }
    }

    /// Posts the caller may read, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ContentServiceError::Storage` if repository access fails.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Blog>, ContentServiceError> {
        actor.check(Permission::ReadPublished)?;
        let role = actor.role();
        let visible: Vec<Role> = ALL_ROLES.into_iter().filter(|v| role.can_see(*v)).collect();
        Ok(self.blogs.list_blogs(&visible).await?)
    }

    /// # Errors
    ///
    /// Returns a `NotFound` storage error for unknown ids and for posts above
    /// the caller's role.
    pub async fn get(&self, actor: &Actor, id: BlogId) -> Result<Blog, ContentServiceError> {
        actor.check(Permission::ReadPublished)?;
        Ok(self
            .blogs
            .get_blog(id)
            .await?
            .filter(|b| b.visible_to(actor.role()))
            .ok_or(StorageError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `ContentServiceError::Access` unless the caller is an admin and
    /// `ContentServiceError::Content` for invalid input.
    pub async fn create(&self, actor: &Actor, draft: BlogDraft) -> Result<Blog, ContentServiceError> {
        let admin = actor.require(Permission::ManageContent)?;
        let fields = draft.validate()?;
        let blog = self
            .blogs
            .insert_blog(NewBlogRecord {
                fields,
                author: admin.user_id,
                published_at: self.clock.now(),
            })
            .await?;
        tracing::info!(blog_id = %blog.id, visibility = %blog.fields.visibility, "blog published");
        Ok(blog)
    }

    /// # Errors
    ///
    /// Same as [`BlogService::create`], plus `NotFound` for unknown ids.
    pub async fn update(
        &self,
        actor: &Actor,
        id: BlogId,
        draft: BlogDraft,
    ) -> Result<Blog, ContentServiceError> {
        actor.require(Permission::ManageContent)?;
        let fields = draft.validate()?;
        let previous = self
            .blogs
            .get_blog(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let blog = self.blogs.update_blog(id, fields).await?;
        if previous.fields.image_url != blog.fields.image_url {
            discard_in_background(&self.images, previous.fields.image_url, "blog");
        }
        tracing::info!(blog_id = %id, "blog updated");
        Ok(blog)
    }

    /// # Errors
    ///
    /// Returns `ContentServiceError::Access` unless the caller is an admin and
    /// a `NotFound` storage error for unknown ids.
    pub async fn delete(&self, actor: &Actor, id: BlogId) -> Result<(), ContentServiceError> {
        actor.require(Permission::ManageContent)?;
        let removed = self.blogs.delete_blog(id).await?;
        discard_in_background(&self.images, removed.fields.image_url, "blog");
        tracing::info!(blog_id = %id, "blog deleted");
        Ok(())
    }
}
