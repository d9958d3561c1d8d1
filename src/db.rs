use crate::config::Config;
use anyhow::{Context, Result};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

/// Per-connection settings. Cascading deletes depend on `foreign_keys`.
const CONNECTION_PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
"#;

/// Shared handle to the link store. Every caller gets its own connection so
/// that a transaction on one never captures statements from another.
pub struct Database {
    db: LibsqlDatabase,
}

impl Database {
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        conn.execute_batch(CONNECTION_PRAGMAS)
            .await
            .map_err(|e| anyhow::anyhow!("failed to configure connection: {e}"))?;
        Ok(conn)
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    /// Opens the configured database file, creating its directory if needed.
    pub async fn new(cfg: &Config) -> Result<Self> {
        let path = Path::new(&cfg.database.path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        }
        Self::open(path).await
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;

        let database = Database { db };
        let conn = database.connect().await?;
        conn.query("SELECT 1", ()).await?;
        // Readers keep their snapshot while a writer commits.
        let mut rows = conn.query("PRAGMA journal_mode = WAL", ()).await?;
        rows.next().await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        tracing::info!(path = %path.display(), "database ready");
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_apply_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("links.db");

        let mut cfg = Config::default();
        cfg.database.path = path.to_string_lossy().into_owned();
        Database::new(&cfg).await.unwrap();
        let db = Database::new(&cfg).await.unwrap();

        let conn = db.connect().await.unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM _migrations", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 2);
    }

    #[tokio::test]
    async fn database_runs_in_wal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("links.db")).await.unwrap();
        let conn = db.connect().await.unwrap();

        let mut rows = conn.query("PRAGMA journal_mode", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap().to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn connections_enforce_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("links.db")).await.unwrap();
        let conn = db.connect().await.unwrap();

        let result = conn
            .execute(
                "INSERT INTO links (group_id, name, url) VALUES (?, ?, ?)",
                libsql::params![999_i64, "orphan", "https://example.com"],
            )
            .await;
        assert!(result.is_err());
    }
}
