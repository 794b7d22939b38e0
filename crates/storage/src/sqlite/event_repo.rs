use club_core::model::{Event, EventFields, EventId};

use super::mapping::{id_to_i64, map_event_row, map_rows};
use super::{SqliteRepository, db_err};
use crate::repository::{EventRepository, NewEventRecord, StorageError};

const EVENT_COLUMNS: &str = "id, title, description, starts_at, ends_at, location, online_url, \
     published, image_url, created_by, created_at";

#[async_trait::async_trait]
impl EventRepository for SqliteRepository {
    async fn insert_event(&self, record: NewEventRecord) -> Result<Event, StorageError> {
        let f = record.fields;
        let row = sqlx::query(&format!(
            r"
            INSERT INTO events
                (title, description, starts_at, ends_at, location, online_url, published, image_url, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING {EVENT_COLUMNS}
            "
        ))
        .bind(f.title)
        .bind(f.description)
        .bind(f.starts_at)
        .bind(f.ends_at)
        .bind(f.location)
        .bind(f.online_url)
        .bind(i64::from(f.published))
        .bind(f.image_url)
        .bind(id_to_i64("user_id", record.created_by.value())?)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_event_row(&row)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))
            .bind(id_to_i64("event_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_event_row).transpose()
    }

    async fn list_events(&self, include_unpublished: bool) -> Result<Vec<Event>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE ?1 OR published = 1
            ORDER BY starts_at ASC, id ASC
            "
        ))
        .bind(include_unpublished)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        map_rows(&rows, map_event_row)
    }

    async fn update_event(&self, id: EventId, fields: EventFields) -> Result<Event, StorageError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE events
            SET title = ?1, description = ?2, starts_at = ?3, ends_at = ?4, location = ?5,
                online_url = ?6, published = ?7, image_url = ?8
            WHERE id = ?9
            RETURNING {EVENT_COLUMNS}
            "
        ))
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .bind(fields.location)
        .bind(fields.online_url)
        .bind(i64::from(fields.published))
        .bind(fields.image_url)
        .bind(id_to_i64("event_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_event_row(&row)
    }

    async fn delete_event(&self, id: EventId) -> Result<Event, StorageError> {
        let row = sqlx::query(&format!(
            "DELETE FROM events WHERE id = ?1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id_to_i64("event_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_event_row(&row)
    }
}
