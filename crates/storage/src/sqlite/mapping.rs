use std::str::FromStr;

use chrono::{DateTime, Utc};
use club_core::Role;
use club_core::model::{
    Blog, BlogFields, BlogId, Email, Event, EventFields, EventId, PathwayId, ProgressEntry,
    ProgressId, QueryId, Resource, ResourceFields, ResourceId, User, UserId, UserQuery,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

/// Row ids are `u64` in the domain and `INTEGER` in `SQLite`.
pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn ids_to_i64<I>(field: &'static str, ids: I) -> Result<Vec<i64>, StorageError>
where
    I: IntoIterator<Item = u64>,
{
    ids.into_iter().map(|v| id_to_i64(field, v)).collect()
}

fn id_column(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

fn parsed<T>(row: &SqliteRow, column: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<T>()
        .map_err(ser)
}

pub(crate) fn tags_to_json(tags: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

fn tags_column(row: &SqliteRow) -> Result<Vec<String>, StorageError> {
    let raw: String = row.try_get("tags").map_err(ser)?;
    serde_json::from_str(&raw).map_err(ser)
}

/// `?n, ?n+1, ...` for an `IN (...)` list starting at parameter `first`.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let email: String = row.try_get("email").map_err(ser)?;
    let year = row
        .try_get::<Option<i64>, _>("year")
        .map_err(ser)?
        .map(|y| u8::try_from(y).map_err(|_| ser(format!("invalid year: {y}"))))
        .transpose()?;
    Ok(User {
        id: UserId::new(id_column(row, "id")?),
        name: row.try_get("name").map_err(ser)?,
        email: Email::parse(&email).map_err(ser)?,
        role: parsed::<Role>(row, "role")?,
        year,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_resource_row(row: &SqliteRow) -> Result<Resource, StorageError> {
    let estimated_minutes = row
        .try_get::<Option<i64>, _>("estimated_minutes")
        .map_err(ser)?
        .map(|m| u32::try_from(m).map_err(|_| ser(format!("invalid estimate: {m}"))))
        .transpose()?;
    Ok(Resource {
        id: ResourceId::new(id_column(row, "id")?),
        fields: ResourceFields {
            title: row.try_get("title").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
            url: row.try_get("url").map_err(ser)?,
            kind: parsed(row, "kind")?,
            estimated_minutes,
            tags: tags_column(row)?,
        },
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressEntry, StorageError> {
    Ok(ProgressEntry {
        id: ProgressId::new(id_column(row, "id")?),
        user_id: UserId::new(id_column(row, "user_id")?),
        pathway_id: PathwayId::new(id_column(row, "pathway_id")?),
        resource_id: ResourceId::new(id_column(row, "resource_id")?),
        status: parsed(row, "status")?,
        completed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("completed_at")
            .map_err(ser)?,
        notes: row.try_get("notes").map_err(ser)?,
        source_platform: row.try_get("source_platform").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_query_row(row: &SqliteRow) -> Result<UserQuery, StorageError> {
    let email: String = row.try_get("email").map_err(ser)?;
    Ok(UserQuery {
        id: QueryId::new(id_column(row, "id")?),
        first_name: row.try_get("first_name").map_err(ser)?,
        last_name: row.try_get("last_name").map_err(ser)?,
        email: Email::parse(&email).map_err(ser)?,
        message: row.try_get("message").map_err(ser)?,
        status: parsed(row, "status")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_event_row(row: &SqliteRow) -> Result<Event, StorageError> {
    Ok(Event {
        id: EventId::new(id_column(row, "id")?),
        fields: EventFields {
            title: row.try_get("title").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
            starts_at: row.try_get("starts_at").map_err(ser)?,
            ends_at: row.try_get("ends_at").map_err(ser)?,
            location: row.try_get("location").map_err(ser)?,
            online_url: row.try_get("online_url").map_err(ser)?,
            published: row.try_get::<i64, _>("published").map_err(ser)? != 0,
            image_url: row.try_get("image_url").map_err(ser)?,
        },
        created_by: UserId::new(id_column(row, "created_by")?),
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_blog_row(row: &SqliteRow) -> Result<Blog, StorageError> {
    Ok(Blog {
        id: BlogId::new(id_column(row, "id")?),
        fields: BlogFields {
            title: row.try_get("title").map_err(ser)?,
            content: row.try_get("content").map_err(ser)?,
            tags: tags_column(row)?,
            image_url: row.try_get("image_url").map_err(ser)?,
            visibility: parsed(row, "visibility")?,
        },
        author: UserId::new(id_column(row, "author")?),
        published_at: row.try_get("published_at").map_err(ser)?,
    })
}

pub(crate) fn map_rows<T>(
    rows: &[SqliteRow],
    map: fn(&SqliteRow) -> Result<T, StorageError>,
) -> Result<Vec<T>, StorageError> {
    rows.iter().map(map).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_from_first() {
        assert_eq!(placeholders(1, 3), "?1, ?2, ?3");
        assert_eq!(placeholders(4, 1), "?4");
        assert_eq!(placeholders(1, 0), "");
    }

    #[test]
    fn oversized_ids_are_rejected() {
        assert!(id_to_i64("id", u64::MAX).is_err());
        assert_eq!(id_to_i64("id", 42).unwrap(), 42);
    }
}
