//! SQLite driver.
//!
//! Applied versions live in the `database_versions` table. Each apply or
//! revert runs its SQL body and the bookkeeping statement in one transaction.

use sqlx::sqlite::SqlitePool;
use sqlx::Executor;
use tracing::{debug, warn};

use super::Driver;
use crate::error::Result;
use crate::migration::Migration;

/// Name of the tracking table.
pub const VERSIONS_TABLE: &str = "database_versions";

const CREATE_VERSIONS_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS database_versions (version VARCHAR(255) UNIQUE NOT NULL)";

const INSERT_VERSION_SQL: &str = "INSERT INTO database_versions (version) VALUES (?)";
const DELETE_VERSION_SQL: &str = "DELETE FROM database_versions WHERE version = ?";

/// Runs migrations against a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Creates a driver over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Lists recorded versions in ascending order.
    pub async fn applied_versions(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT version FROM database_versions ORDER BY version")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(version,)| version).collect())
    }

    /// Runs `body` then `bookkeeping` (bound to `version`) in one transaction.
    async fn run_atomically(&self, body: &str, bookkeeping: &str, version: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let outcome = if body.trim().is_empty() {
            debug!(version = %version, "Empty migration body, only updating bookkeeping");
            Ok(())
        } else {
            Executor::execute(&mut *tx, sqlx::raw_sql(body))
                .await
                .map(|_| ())
        };
        let outcome = match outcome {
            Ok(()) => Executor::execute(&mut *tx, sqlx::query(bookkeeping).bind(version))
                .await
                .map(|_| ()),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(version = %version, error = %rollback_err, "Rollback failed");
                }
                Err(err.into())
            }
        }
    }
}

impl Driver for SqliteDriver {
    async fn create_versions_table(&self) -> Result<()> {
        sqlx::query(CREATE_VERSIONS_TABLE_SQL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn has_applied(&self, version: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM database_versions WHERE version = ?")
                .bind(version)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        self.run_atomically(
            &migration.forward_body,
            INSERT_VERSION_SQL,
            &migration.version_string(),
        )
        .await
    }

    async fn revert_migration(&self, migration: &Migration) -> Result<()> {
        self.run_atomically(
            &migration.reverse_body,
            DELETE_VERSION_SQL,
            &migration.version_string(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_driver() -> SqliteDriver {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        let driver = SqliteDriver::new(pool);
        driver.create_versions_table().await.unwrap();
        driver
    }

    async fn table_exists(driver: &SqliteDriver, name: &str) -> bool {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
                .bind(name)
                .fetch_optional(driver.pool())
                .await
                .unwrap();
        row.is_some()
    }

    fn migration(name: &str, content: &str) -> Migration {
        Migration::parse(name, content).unwrap()
    }

    #[tokio::test]
    async fn test_create_versions_table() {
        let driver = create_test_driver().await;

        // Should be idempotent
        driver.create_versions_table().await.unwrap();
        assert!(table_exists(&driver, VERSIONS_TABLE).await);
    }

    #[tokio::test]
    async fn test_apply_migration() {
        let driver = create_test_driver().await;
        let m = migration(
            "20230101000000_init.sql",
            "-- up\nCREATE TABLE t (id INTEGER);\nINSERT INTO t VALUES (1);\n-- down\nDROP TABLE t;\n",
        );

        assert!(!driver.has_applied("20230101000000").await.unwrap());
        driver.apply_migration(&m).await.unwrap();

        assert!(table_exists(&driver, "t").await);
        assert!(driver.has_applied("20230101000000").await.unwrap());
        assert_eq!(
            driver.applied_versions().await.unwrap(),
            vec!["20230101000000".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_apply_rolls_back() {
        let driver = create_test_driver().await;
        let m = migration(
            "20230101000000_init.sql",
            "-- up\nCREATE TABLE t (id INTEGER);\nINSERT INTO missing VALUES (1);\n",
        );

        let result = driver.apply_migration(&m).await;
        assert!(matches!(result, Err(crate::error::MigrateError::Database(_))));

        // Neither the table nor the version record survive
        assert!(!table_exists(&driver, "t").await);
        assert!(!driver.has_applied("20230101000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_bookkeeping_rolls_back_body() {
        let driver = create_test_driver().await;
        sqlx::query("INSERT INTO database_versions (version) VALUES ('20230101000000')")
            .execute(driver.pool())
            .await
            .unwrap();

        let m = migration("20230101000000_init.sql", "CREATE TABLE t (id INTEGER);\n");
        assert!(driver.apply_migration(&m).await.is_err());
        assert!(!table_exists(&driver, "t").await);
    }

    #[tokio::test]
    async fn test_revert_migration() {
        let driver = create_test_driver().await;
        let m = migration(
            "20230101000000_init.sql",
            "-- up\nCREATE TABLE t (id INTEGER);\n-- down\nDROP TABLE t;\n",
        );

        driver.apply_migration(&m).await.unwrap();
        driver.revert_migration(&m).await.unwrap();

        assert!(!table_exists(&driver, "t").await);
        assert!(!driver.has_applied("20230101000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_revert_keeps_record() {
        let driver = create_test_driver().await;
        let m = migration(
            "20230101000000_init.sql",
            "-- up\nCREATE TABLE t (id INTEGER);\n-- down\nDROP TABLE t;\nDROP TABLE missing;\n",
        );

        driver.apply_migration(&m).await.unwrap();
        assert!(driver.revert_migration(&m).await.is_err());

        assert!(table_exists(&driver, "t").await);
        assert!(driver.has_applied("20230101000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_on_spawned_task() {
        let driver = create_test_driver().await;
        let m = migration("20230101000000_init.sql", "CREATE TABLE t (id INTEGER);\n");

        let task_driver = driver.clone();
        tokio::spawn(async move { task_driver.apply_migration(&m).await })
            .await
            .unwrap()
            .unwrap();

        assert!(table_exists(&driver, "t").await);
        assert!(driver.has_applied("20230101000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_reverse_body() {
        let driver = create_test_driver().await;
        let m = migration("20230101000000_seed.sql", "-- up\nCREATE TABLE t (id INTEGER);\n");

        driver.apply_migration(&m).await.unwrap();
        driver.revert_migration(&m).await.unwrap();

        assert!(!driver.has_applied("20230101000000").await.unwrap());
        assert!(table_exists(&driver, "t").await);
    }
}
