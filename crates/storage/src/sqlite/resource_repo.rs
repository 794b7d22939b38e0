use club_core::model::{Resource, ResourceFields, ResourceId};
use sqlx::SqliteConnection;

use super::mapping::{
    id_to_i64, ids_to_i64, map_resource_row, map_rows, placeholders, tags_to_json,
};
use super::{SqliteRepository, db_err};
use crate::repository::{NewResourceRecord, ResourceRepository, StorageError};

pub(crate) const RESOURCE_COLUMNS: &str =
    "id, title, description, url, kind, estimated_minutes, tags, created_at";

/// Insert on an open connection so pathway creation can share its transaction.
pub(crate) async fn insert_resource_on(
    conn: &mut SqliteConnection,
    record: NewResourceRecord,
) -> Result<Resource, StorageError> {
    let fields = record.fields;
    let row = sqlx::query(&format!(
        r"
        INSERT INTO resources (title, description, url, kind, estimated_minutes, tags, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {RESOURCE_COLUMNS}
        "
    ))
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.url)
    .bind(fields.kind.as_str())
    .bind(fields.estimated_minutes.map(i64::from))
    .bind(tags_to_json(&fields.tags)?)
    .bind(record.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;

    map_resource_row(&row)
}

#[async_trait::async_trait]
impl ResourceRepository for SqliteRepository {
    async fn insert_resource(&self, record: NewResourceRecord) -> Result<Resource, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_resource_on(&mut conn, record).await
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Option<Resource>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ?1"
        ))
        .bind(id_to_i64("resource_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_resource_row).transpose()
    }

    async fn resources_by_ids(&self, ids: &[ResourceId]) -> Result<Vec<Resource>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id IN ({}) ORDER BY id",
            placeholders(1, ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids_to_i64("resource_id", ids.iter().map(ResourceId::value))? {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        map_rows(&rows, map_resource_row)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows, map_resource_row)
    }

    async fn update_resource(
        &self,
        id: ResourceId,
        fields: ResourceFields,
    ) -> Result<Resource, StorageError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE resources
            SET title = ?1, description = ?2, url = ?3, kind = ?4,
                estimated_minutes = ?5, tags = ?6
            WHERE id = ?7
            RETURNING {RESOURCE_COLUMNS}
            "
        ))
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.url)
        .bind(fields.kind.as_str())
        .bind(fields.estimated_minutes.map(i64::from))
        .bind(tags_to_json(&fields.tags)?)
        .bind(id_to_i64("resource_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_resource_row(&row)
    }

    async fn delete_resource(&self, id: ResourceId) -> Result<(), StorageError> {
        // Pathway membership and progress rows go with it through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM resources WHERE id = ?1")
            .bind(id_to_i64("resource_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
