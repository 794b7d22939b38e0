use std::sync::Arc;

use club_core::model::{
    PathwayDetail, PathwayDraft, PathwayError, PathwayFields, PathwayId, Resource, ResourceDraft,
    ResourceId,
};
use club_core::{Actor, Permission};
use storage::repository::{
    NewPathwayRecord, NewResourceRecord, PathwayRepository, ResourceRepository, StorageError,
};

use crate::Clock;
use crate::error::CatalogError;

/// Resources and the ordered pathways built from them.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    resources: Arc<dyn ResourceRepository>,
    pathways: Arc<dyn PathwayRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        resources: Arc<dyn ResourceRepository>,
        pathways: Arc<dyn PathwayRepository>,
    ) -> Self {
        Self {
            clock,
            resources,
            pathways,
        }
    }

    /// Validate and store a new resource.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Access` unless the caller is an admin,
    /// `CatalogError::Resource` for invalid input, and
    /// `CatalogError::Storage` if persistence fails.
    pub async fn create_resource(
        &self,
        actor: &Actor,
        draft: ResourceDraft,
    ) -> Result<Resource, CatalogError> {
        let admin = actor.require(Permission::ManageCatalog)?;
        let fields = draft.validate()?;
        let resource = self
            .resources
            .insert_resource(NewResourceRecord {
                fields,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(resource_id = %resource.id, by = %admin.user_id, "resource created");
        Ok(resource)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` with `NotFound` for an unknown id.
    pub async fn get_resource(&self, actor: &Actor, id: ResourceId) -> Result<Resource, CatalogError> {
        actor.check(Permission::ReadCatalog)?;
        Ok(self
            .resources
            .get_resource(id)
            .await?
            .ok_or(StorageError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_resources(&self, actor: &Actor) -> Result<Vec<Resource>, CatalogError> {
        actor.check(Permission::ReadCatalog)?;
        Ok(self.resources.list_resources().await?)
    }

    /// Replace a resource's attributes.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_resource`], plus `NotFound` storage
    /// errors for an unknown id.
    pub async fn update_resource(
        &self,
        actor: &Actor,
        id: ResourceId,
        draft: ResourceDraft,
    ) -> Result<Resource, CatalogError> {
        actor.require(Permission::ManageCatalog)?;
        let fields = draft.validate()?;
        let resource = self.resources.update_resource(id, fields).await?;
        tracing::info!(resource_id = %id, "resource updated");
        Ok(resource)
    }

    /// Delete a resource. It disappears from every pathway and the progress
    /// recorded against it is removed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Access` unless the caller is an admin and
    /// `CatalogError::Storage` if the resource is unknown or deletion fails.
    pub async fn delete_resource(&self, actor: &Actor, id: ResourceId) -> Result<(), CatalogError> {
        actor.require(Permission::ManageCatalog)?;
        self.resources.delete_resource(id).await?;
        tracing::info!(resource_id = %id, "resource deleted");
        Ok(())
    }

    /// Create a pathway over existing resources.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Pathway` for invalid input, including references
    /// to resources that do not exist.
    pub async fn create_pathway(
        &self,
        actor: &Actor,
        draft: PathwayDraft,
    ) -> Result<PathwayDetail, CatalogError> {
        self.create_pathway_with_resources(actor, draft, Vec::new())
            .await
    }

    /// Create `new_resources` and a pathway listing the draft's references
    /// followed by the new resources. Nothing is stored unless everything is.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Access` unless the caller is an admin,
    /// `CatalogError::Pathway` or `CatalogError::Resource` for invalid input,
    /// and `CatalogError::Storage` if persistence fails.
    pub async fn create_pathway_with_resources(
        &self,
        actor: &Actor,
        draft: PathwayDraft,
        new_resources: Vec<ResourceDraft>,
    ) -> Result<PathwayDetail, CatalogError> {
        let admin = actor.require(Permission::ManageCatalog)?;
        let fields = draft.validate()?;
        self.ensure_resources_exist(&fields).await?;

        let now = self.clock.now();
        let new_records = new_resources
            .into_iter()
            .map(|d| {
                d.validate().map(|fields| NewResourceRecord {
                    fields,
                    created_at: now,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let added = new_records.len();

        let pathway = self
            .pathways
            .insert_pathway(
                NewPathwayRecord {
                    fields,
                    created_by: admin.user_id,
                    created_at: now,
                },
                new_records,
            )
            .await?;
        tracing::info!(
            pathway_id = %pathway.id,
            resources = pathway.resource_ids().len(),
            new_resources = added,
            "pathway created"
        );

        let resources = self.resources.resources_by_ids(pathway.resource_ids()).await?;
        Ok(pathway.populate(&resources))
    }

    /// Fetch a pathway with its resources in pathway order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` with `NotFound` for an unknown id.
    pub async fn get_pathway(
        &self,
        actor: &Actor,
        id: PathwayId,
    ) -> Result<PathwayDetail, CatalogError> {
        actor.check(Permission::ReadCatalog)?;
        let pathway = self
            .pathways
            .get_pathway(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let resources = self.resources.resources_by_ids(pathway.resource_ids()).await?;
        Ok(pathway.populate(&resources))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_pathways(&self, actor: &Actor) -> Result<Vec<PathwayDetail>, CatalogError> {
        actor.check(Permission::ReadCatalog)?;
        let pathways = self.pathways.list_pathways().await?;
        let resources = self.resources.list_resources().await?;
        Ok(pathways
            .into_iter()
            .map(|p| p.populate(&resources))
            .collect())
    }

    /// Replace a pathway's attributes and resource list. Owner and creation
    /// time are kept.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogService::create_pathway`], plus `NotFound` storage
    /// errors for an unknown id.
    pub async fn update_pathway(
        &self,
        actor: &Actor,
        id: PathwayId,
        draft: PathwayDraft,
    ) -> Result<PathwayDetail, CatalogError> {
        actor.require(Permission::ManageCatalog)?;
        let fields = draft.validate()?;
        self.ensure_resources_exist(&fields).await?;
        let pathway = self.pathways.update_pathway(id, fields).await?;
        tracing::info!(pathway_id = %id, "pathway updated");
        let resources = self.resources.resources_by_ids(pathway.resource_ids()).await?;
        Ok(pathway.populate(&resources))
    }

    /// Delete a pathway and the progress recorded under it. Resources stay.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Access` unless the caller is an admin and
    /// `CatalogError::Storage` if the pathway is unknown or deletion fails.
    pub async fn delete_pathway(&self, actor: &Actor, id: PathwayId) -> Result<(), CatalogError> {
        actor.require(Permission::ManageCatalog)?;
        self.pathways.delete_pathway(id).await?;
        tracing::info!(pathway_id = %id, "pathway deleted");
        Ok(())
    }

    async fn ensure_resources_exist(&self, fields: &PathwayFields) -> Result<(), CatalogError> {
        let found: Vec<ResourceId> = self
            .resources
            .resources_by_ids(&fields.resource_ids)
            .await?
            .iter()
            .map(|r| r.id)
            .collect();
        match fields.missing_from(&found).first() {
            Some(missing) => Err(PathwayError::UnknownResource(*missing).into()),
            None => Ok(()),
        }
    }
}
