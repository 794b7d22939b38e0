use chrono::{DateTime, Utc};
use club_core::model::{
    PathwayId, ProgressEntry, ProgressId, ProgressMark, ProgressStatus, ResourceId, UserId,
};

use super::mapping::{id_to_i64, ids_to_i64, map_progress_row, map_rows, placeholders};
use super::{SqliteRepository, db_err};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = "id, user_id, pathway_id, resource_id, status, completed_at, \
     notes, source_platform, created_at, updated_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(
        &self,
        mark: &ProgressMark,
        now: DateTime<Utc>,
    ) -> Result<ProgressEntry, StorageError> {
        // The CASE mirrors `ProgressStatus::completed_at_after`: keep the first
        // completion stamp, stamp a fresh completion, clear on regression.
        let fresh_stamp = mark.status.completed_at_after(None, now);
        let row = sqlx::query(&format!(
            r"
            INSERT INTO progress_entries
                (user_id, pathway_id, resource_id, status, completed_at, notes, source_platform, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT(user_id, resource_id) DO UPDATE SET
                pathway_id = excluded.pathway_id,
                completed_at = CASE
                    WHEN excluded.status = 'completed' AND progress_entries.status = 'completed'
                        THEN COALESCE(progress_entries.completed_at, excluded.completed_at)
                    WHEN excluded.status = 'completed' THEN excluded.completed_at
                    ELSE NULL
                END,
                status = excluded.status,
                notes = COALESCE(excluded.notes, progress_entries.notes),
                source_platform = COALESCE(excluded.source_platform, progress_entries.source_platform),
                updated_at = excluded.updated_at
            RETURNING {PROGRESS_COLUMNS}
            "
        ))
        .bind(id_to_i64("user_id", mark.user_id.value())?)
        .bind(id_to_i64("pathway_id", mark.pathway_id.value())?)
        .bind(id_to_i64("resource_id", mark.resource_id.value())?)
        .bind(mark.status.as_str())
        .bind(fresh_stamp)
        .bind(mark.notes.as_deref())
        .bind(mark.source_platform.as_deref())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let entry = map_progress_row(&row)?;
        debug_assert!(entry.status != ProgressStatus::Completed || entry.completed_at.is_some());
        Ok(entry)
    }

    async fn get_progress(&self, id: ProgressId) -> Result<Option<ProgressEntry>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_entries WHERE id = ?1"
        ))
        .bind(id_to_i64("progress_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn entries_for_user(&self, user_id: UserId) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_entries WHERE user_id = ?1 ORDER BY id"
        ))
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows, map_progress_row)
    }

    async fn entries_for_pathway(
        &self,
        pathway_id: PathwayId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_entries WHERE pathway_id = ?1 ORDER BY id"
        ))
        .bind(id_to_i64("pathway_id", pathway_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows, map_progress_row)
    }

    async fn entries_for_resources(
        &self,
        resource_ids: &[ResourceId],
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        if resource_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_entries WHERE resource_id IN ({}) ORDER BY id",
            placeholders(1, resource_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids_to_i64("resource_id", resource_ids.iter().map(ResourceId::value))? {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        map_rows(&rows, map_progress_row)
    }
}
