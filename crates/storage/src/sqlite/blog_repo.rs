use club_core::Role;
use club_core::model::{Blog, BlogFields, BlogId};

use super::mapping::{id_to_i64, map_blog_row, map_rows, placeholders, tags_to_json};
use super::{SqliteRepository, db_err};
use crate::repository::{BlogRepository, NewBlogRecord, StorageError};

const BLOG_COLUMNS: &str = "id, title, content, tags, image_url, visibility, author, published_at";

#[async_trait::async_trait]
impl BlogRepository for SqliteRepository {
    async fn insert_blog(&self, record: NewBlogRecord) -> Result<Blog, StorageError> {
        let f = record.fields;
        let row = sqlx::query(&format!(
            r"
            INSERT INTO blogs (title, content, tags, image_url, visibility, author, published_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING {BLOG_COLUMNS}
            "
        ))
        .bind(f.title)
        .bind(f.content)
        .bind(tags_to_json(&f.tags)?)
        .bind(f.image_url)
        .bind(f.visibility.as_str())
        .bind(id_to_i64("user_id", record.author.value())?)
        .bind(record.published_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        map_blog_row(&row)
    }

    async fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StorageError> {
        let row = sqlx::query(&format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE id = ?1"))
            .bind(id_to_i64("blog_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_blog_row).transpose()
    }

    async fn list_blogs(&self, visible: &[Role]) -> Result<Vec<Blog>, StorageError> {
        if visible.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE visibility IN ({}) \
             ORDER BY published_at DESC, id DESC",
            placeholders(1, visible.len())
        );
        let mut query = sqlx::query(&sql);
        for role in visible {
            query = query.bind(role.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        map_rows(&rows, map_blog_row)
    }

    async fn update_blog(&self, id: BlogId, fields: BlogFields) -> Result<Blog, StorageError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE blogs
            SET title = ?1, content = ?2, tags = ?3, image_url = ?4, visibility = ?5
            WHERE id = ?6
            RETURNING {BLOG_COLUMNS}
            "
        ))
        .bind(fields.title)
        .bind(fields.content)
        .bind(tags_to_json(&fields.tags)?)
        .bind(fields.image_url)
        .bind(fields.visibility.as_str())
        .bind(id_to_i64("blog_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_blog_row(&row)
    }

    async fn delete_blog(&self, id: BlogId) -> Result<Blog, StorageError> {
        let row = sqlx::query(&format!(
            "DELETE FROM blogs WHERE id = ?1 RETURNING {BLOG_COLUMNS}"
        ))
        .bind(id_to_i64("blog_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StorageError::NotFound)?;

        map_blog_row(&row)
    }
}
