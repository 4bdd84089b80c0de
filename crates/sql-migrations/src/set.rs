//! Ordered migration sets.
//!
//! This module holds the apply/revert policy: migrations form a linear log
//! ordered by version. Applying catches the database up to the newest
//! version, reverting undoes exactly one step.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::driver::Driver;
use crate::error::{MigrateError, Result};
use crate::migration::{Migration, Version};
use crate::source;

/// Migrations sorted by ascending version.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

/// Applied state of one migration, as reported by [`MigrationSet::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// File name of the migration.
    pub name: String,
    /// Migration version.
    pub version: Version,
    /// Whether the driver has the version recorded.
    pub applied: bool,
}

impl MigrationSet {
    /// Creates a set from migrations in any order.
    ///
    /// Migrations sharing a version keep their relative order.
    #[must_use]
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { migrations }
    }

    /// Loads every `.sql` migration of `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let migrations = source::load_dir(dir)?;
        debug!(dir = %dir.display(), count = migrations.len(), "Loaded migrations");
        Ok(Self::new(migrations))
    }

    /// Returns the migrations in ascending version order.
    #[must_use]
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Returns the number of migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Returns whether the set holds no migrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Applies every migration not yet recorded, oldest first.
    ///
    /// Stops at the first failure; later migrations are not attempted and
    /// earlier ones stay applied.
    pub async fn apply<D: Driver>(&self, driver: &D) -> Result<usize> {
        self.apply_with(driver, |_| {}).await
    }

    /// Like [`apply`](Self::apply), calling `before_each` with every
    /// migration right before its forward body is executed.
    pub async fn apply_with<D, F>(&self, driver: &D, mut before_each: F) -> Result<usize>
    where
        D: Driver,
        F: FnMut(&Migration),
    {
        driver.create_versions_table().await?;

        let mut applied = 0;
        for migration in &self.migrations {
            if is_applied(driver, migration).await? {
                debug!(name = %migration.name, "Migration already applied, skipping");
                continue;
            }

            info!(
                name = %migration.name,
                version = %migration.version,
                "Applying migration"
            );
            before_each(migration);

            driver
                .apply_migration(migration)
                .await
                .map_err(|err| MigrateError::in_migration(&migration.name, err))?;
            applied += 1;
        }

        info!(applied, "Migrations applied successfully");
        Ok(applied)
    }

    /// Reverts the newest applied migration, if any, and returns it.
    ///
    /// Only one migration is reverted per call.
    pub async fn revert<D: Driver>(&self, driver: &D) -> Result<Option<&Migration>> {
        driver.create_versions_table().await?;

        for migration in self.migrations.iter().rev() {
            if !is_applied(driver, migration).await? {
                continue;
            }

            info!(
                name = %migration.name,
                version = %migration.version,
                "Reverting migration"
            );
            driver
                .revert_migration(migration)
                .await
                .map_err(|err| MigrateError::in_migration(&migration.name, err))?;

            info!(name = %migration.name, "Migration reverted successfully");
            return Ok(Some(migration));
        }

        info!("No applied migration to revert");
        Ok(None)
    }

    /// Returns the migrations the driver has not recorded, oldest first.
    pub async fn pending<D: Driver>(&self, driver: &D) -> Result<Vec<&Migration>> {
        driver.create_versions_table().await?;

        let mut pending = Vec::new();
        for migration in &self.migrations {
            if !is_applied(driver, migration).await? {
                pending.push(migration);
            }
        }
        Ok(pending)
    }

    /// Reports the applied state of every migration, oldest first.
    pub async fn status<D: Driver>(&self, driver: &D) -> Result<Vec<MigrationStatus>> {
        driver.create_versions_table().await?;

        let mut statuses = Vec::with_capacity(self.migrations.len());
        for migration in &self.migrations {
            statuses.push(MigrationStatus {
                name: migration.name.clone(),
                version: migration.version,
                applied: is_applied(driver, migration).await?,
            });
        }
        Ok(statuses)
    }
}

async fn is_applied<D: Driver>(driver: &D, migration: &Migration) -> Result<bool> {
    driver
        .has_applied(&migration.version_string())
        .await
        .map_err(|err| MigrateError::in_migration(&migration.name, err))
}

impl From<Vec<Migration>> for MigrationSet {
    fn from(migrations: Vec<Migration>) -> Self {
        Self::new(migrations)
    }
}

impl<'a> IntoIterator for &'a MigrationSet {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.migrations.iter()
    }
}
