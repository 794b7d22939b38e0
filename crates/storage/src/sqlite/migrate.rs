use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('public', 'junior', 'admin')),
            year INTEGER CHECK (year IS NULL OR year BETWEEN 1 AND 6),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            url TEXT,
            kind TEXT NOT NULL,
            estimated_minutes INTEGER CHECK (estimated_minutes IS NULL OR estimated_minutes > 0),
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS pathways (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT NOT NULL CHECK (category IN ('DS', 'AIML', 'DA')),
            created_by INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (created_by) REFERENCES users(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS pathway_resources (
            pathway_id INTEGER NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            resource_id INTEGER NOT NULL,
            PRIMARY KEY (pathway_id, position),
            UNIQUE (pathway_id, resource_id),
            FOREIGN KEY (pathway_id) REFERENCES pathways(id) ON DELETE CASCADE,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS progress_entries (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            pathway_id INTEGER NOT NULL,
            resource_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('not_started', 'in_progress', 'completed')),
            completed_at TEXT,
            notes TEXT,
            source_platform TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, resource_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (pathway_id) REFERENCES pathways(id) ON DELETE CASCADE,
            FOREIGN KEY (resource_id) REFERENCES resources(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_queries (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            message TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'read', 'responded')),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            starts_at TEXT NOT NULL,
            ends_at TEXT,
            location TEXT,
            online_url TEXT,
            published INTEGER NOT NULL,
            image_url TEXT,
            created_by INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (created_by) REFERENCES users(id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS blogs (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            image_url TEXT,
            visibility TEXT NOT NULL CHECK (visibility IN ('public', 'junior', 'admin')),
            author INTEGER NOT NULL,
            published_at TEXT NOT NULL,
            FOREIGN KEY (author) REFERENCES users(id)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions (expires_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_pathway_resources_resource
            ON pathway_resources (resource_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_progress_pathway ON progress_entries (pathway_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_progress_resource ON progress_entries (resource_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_user_queries_created ON user_queries (created_at, id);
    ",
];

/// Runs versioned migrations, each inside its own transaction.
///
/// Version 1 creates the full schema: accounts and sessions, the catalog
/// with ordered pathway membership, the progress ledger, and club content.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
