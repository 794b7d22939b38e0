use club_core::model::{PageRequest, QueryId, QueryStatus, UserQuery};
use sqlx::Row;

use super::mapping::{id_to_i64, map_query_row, map_rows, ser};
use super::{SqliteRepository, db_err};
use crate::repository::{NewQueryRecord, QueryRepository, StorageError};

const QUERY_COLUMNS: &str = "id, first_name, last_name, email, message, status, created_at";

#[async_trait::async_trait]
impl QueryRepository for SqliteRepository {
    async fn insert_query(&self, record: NewQueryRecord) -> Result<UserQuery, StorageError> {
        let draft = record.draft;
        let row = sqlx::query(&format!(
            r"
            INSERT INTO user_queries (first_name, last_name, email, message, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {QUERY_COLUMNS}
            "
        ))
        .bind(draft.first_name)
        .bind(draft.last_name)
        .bind(draft.email.as_str())
        .bind(draft.message)
        .bind(QueryStatus::Pending.as_str())
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_query_row(&row)
    }

    async fn list_queries(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<UserQuery>, u64), StorageError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM user_queries")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("total")
            .map_err(ser)?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {QUERY_COLUMNS} FROM user_queries
            ORDER BY created_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "
        ))
        .bind(i64::from(page.limit()))
        .bind(i64::try_from(page.offset()).map_err(ser)?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let queries = map_rows(&rows, map_query_row)?;
        Ok((queries, u64::try_from(total).map_err(ser)?))
    }

    async fn set_query_status(
        &self,
        id: QueryId,
        status: QueryStatus,
    ) -> Result<UserQuery, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE user_queries SET status = ?1 WHERE id = ?2 RETURNING {QUERY_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id_to_i64("query_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_query_row(&row)
    }
}
