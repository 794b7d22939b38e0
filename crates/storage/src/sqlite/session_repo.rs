use chrono::{DateTime, Utc};
use club_core::model::UserId;
use sqlx::Row;

use super::mapping::{id_to_i64, ser};
use super::{SqliteRepository, db_err};
use crate::repository::{NewSessionRecord, SessionRepository, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, session: NewSessionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(session.token)
        .bind(id_to_i64("user_id", session.user_id.value())?)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, StorageError> {
        let row = sqlx::query("SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2")
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| {
            let id: i64 = row.try_get("user_id").map_err(ser)?;
            u64::try_from(id)
                .map(UserId::new)
                .map_err(|_| ser("user_id sign overflow"))
        })
        .transpose()
    }

    async fn delete_session(&self, token: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected())
    }
}
