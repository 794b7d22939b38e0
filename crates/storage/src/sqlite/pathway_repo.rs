use std::collections::HashMap;

use club_core::model::{Pathway, PathwayFields, PathwayId, ResourceId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::mapping::{id_to_i64, ser};
use super::resource_repo::insert_resource_on;
use super::{SqliteRepository, db_err};
use crate::repository::{NewPathwayRecord, NewResourceRecord, PathwayRepository, StorageError};

const PATHWAY_COLUMNS: &str = "id, title, description, category, created_by, created_at";

fn row_u64(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    let v: i64 = row.try_get(column).map_err(ser)?;
    u64::try_from(v).map_err(|_| ser(format!("{column} sign overflow")))
}

fn pathway_from_row(row: &SqliteRow, resource_ids: Vec<ResourceId>) -> Result<Pathway, StorageError> {
    let category: String = row.try_get("category").map_err(ser)?;
    Ok(Pathway {
        id: PathwayId::new(row_u64(row, "id")?),
        fields: PathwayFields {
            title: row.try_get("title").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
            category: category.parse().map_err(ser)?,
            resource_ids,
        },
        created_by: UserId::new(row_u64(row, "created_by")?),
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

async fn write_members(
    conn: &mut SqliteConnection,
    pathway_id: i64,
    resource_ids: &[ResourceId],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM pathway_resources WHERE pathway_id = ?1")
        .bind(pathway_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    for (position, id) in resource_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO pathway_resources (pathway_id, position, resource_id) VALUES (?1, ?2, ?3)",
        )
        .bind(pathway_id)
        .bind(i64::try_from(position).map_err(ser)?)
        .bind(id_to_i64("resource_id", id.value())?)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    }
    Ok(())
}

async fn members_of(
    conn: &mut SqliteConnection,
    pathway_id: i64,
) -> Result<Vec<ResourceId>, StorageError> {
    let rows = sqlx::query(
        "SELECT resource_id FROM pathway_resources WHERE pathway_id = ?1 ORDER BY position",
    )
    .bind(pathway_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    rows.iter()
        .map(|row| row_u64(row, "resource_id").map(ResourceId::new))
        .collect()
}

#[async_trait::async_trait]
impl PathwayRepository for SqliteRepository {
    async fn insert_pathway(
        &self,
        record: NewPathwayRecord,
        new_resources: Vec<NewResourceRecord>,
    ) -> Result<Pathway, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut resource_ids = record.fields.resource_ids.clone();
        for new in new_resources {
            let created = insert_resource_on(&mut tx, new).await?;
            resource_ids.push(created.id);
        }

        let row = sqlx::query(&format!(
            r"
            INSERT INTO pathways (title, description, category, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {PATHWAY_COLUMNS}
            "
        ))
        .bind(&record.fields.title)
        .bind(&record.fields.description)
        .bind(record.fields.category.as_str())
        .bind(id_to_i64("user_id", record.created_by.value())?)
        .bind(record.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let pathway_id: i64 = row.try_get("id").map_err(ser)?;
        write_members(&mut tx, pathway_id, &resource_ids).await?;
        let pathway = pathway_from_row(&row, resource_ids)?;

        // Dropping the transaction on any early return above rolls it back.
        tx.commit().await.map_err(db_err)?;
        Ok(pathway)
    }

    async fn get_pathway(&self, id: PathwayId) -> Result<Option<Pathway>, StorageError> {
        let pathway_id = id_to_i64("pathway_id", id.value())?;
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        let row = sqlx::query(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM pathways WHERE id = ?1"
        ))
        .bind(pathway_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let members = members_of(&mut conn, pathway_id).await?;
        pathway_from_row(&row, members).map(Some)
    }

    async fn list_pathways(&self) -> Result<Vec<Pathway>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM pathways ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let member_rows = sqlx::query(
            "SELECT pathway_id, resource_id FROM pathway_resources ORDER BY pathway_id, position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut members: HashMap<u64, Vec<ResourceId>> = HashMap::new();
        for row in &member_rows {
            members
                .entry(row_u64(row, "pathway_id")?)
                .or_default()
                .push(ResourceId::new(row_u64(row, "resource_id")?));
        }

        rows.iter()
            .map(|row| {
                let ids = members.remove(&row_u64(row, "id")?).unwrap_or_default();
                pathway_from_row(row, ids)
            })
            .collect()
    }

    async fn update_pathway(
        &self,
        id: PathwayId,
        fields: PathwayFields,
    ) -> Result<Pathway, StorageError> {
        let pathway_id = id_to_i64("pathway_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query(&format!(
            r"
            UPDATE pathways SET title = ?1, description = ?2, category = ?3
            WHERE id = ?4
            RETURNING {PATHWAY_COLUMNS}
            "
        ))
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.category.as_str())
        .bind(pathway_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        write_members(&mut tx, pathway_id, &fields.resource_ids).await?;
        let pathway = pathway_from_row(&row, fields.resource_ids)?;
        tx.commit().await.map_err(db_err)?;
        Ok(pathway)
    }

    async fn delete_pathway(&self, id: PathwayId) -> Result<(), StorageError> {
        let pathway_id = id_to_i64("pathway_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Entries on resources another pathway still lists move to the
        // lowest such pathway; the rest go with this one.
        sqlx::query(
            r"
            UPDATE progress_entries
            SET pathway_id = (
                SELECT MIN(pr.pathway_id) FROM pathway_resources pr
                WHERE pr.resource_id = progress_entries.resource_id AND pr.pathway_id <> ?1
            )
            WHERE pathway_id = ?1
              AND EXISTS (
                SELECT 1 FROM pathway_resources pr
                WHERE pr.resource_id = progress_entries.resource_id AND pr.pathway_id <> ?1
              )
            ",
        )
        .bind(pathway_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("DELETE FROM progress_entries WHERE pathway_id = ?1")
            .bind(pathway_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let res = sqlx::query("DELETE FROM pathways WHERE id = ?1")
            .bind(pathway_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
