use club_core::Role;
use club_core::model::{Email, User, UserId};
use sqlx::Row;

use super::mapping::{id_to_i64, ids_to_i64, map_rows, map_user_row, placeholders, ser};
use super::{SqliteRepository, db_err};
use crate::repository::{NewUserRecord, StorageError, UserCredentials, UserRepository};

const USER_COLUMNS: &str = "id, name, email, role, year, created_at";

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<User, StorageError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO users (name, email, password_hash, role, year, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.name)
        .bind(user.email.as_str())
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.year.map(i64::from))
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_user_row(&row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id IN ({}) ORDER BY id",
            placeholders(1, ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids_to_i64("user_id", ids.iter().map(UserId::value))? {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        map_rows(&rows, map_user_row)
    }

    async fn credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserCredentials {
            user: map_user_row(&row)?,
            password_hash: row.try_get("password_hash").map_err(ser)?,
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        map_rows(&rows, map_user_row)
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, StorageError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = ?1 WHERE id = ?2 RETURNING {USER_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(id_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_user_row(&row)
    }
}
