//! Migration files on disk.
//!
//! Reads `.sql` change-sets from a directory and scaffolds new ones.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, Version, DOWN_MARKER, UP_MARKER};

/// File suffix of migration files.
pub const MIGRATION_SUFFIX: &str = ".sql";

/// Loads every `.sql` file of `dir`, in directory listing order.
///
/// Subdirectories and files without the `.sql` suffix are skipped. Any
/// listing, read or version error aborts the whole load.
pub fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    let read_dir_err = |source| MigrateError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut migrations = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        if entry.file_type().map_err(read_dir_err)?.is_dir() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.ends_with(MIGRATION_SUFFIX) {
            debug!(file = %file_name, "Skipping non-migration file");
            continue;
        }

        migrations.push(load_file(&entry.path(), file_name)?);
    }

    Ok(migrations)
}

fn load_file(path: &Path, file_name: String) -> Result<Migration> {
    let content = fs::read_to_string(path).map_err(|source| MigrateError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Migration::parse(file_name, &content)
}

/// Builds a migration file name such as `20230101000000_add_users.sql`.
#[must_use]
pub fn migration_file_name(version: Version, description: &str) -> String {
    let slug = description
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>();
    let slug = slug.trim_matches('_');

    if slug.is_empty() {
        format!("{version}{MIGRATION_SUFFIX}")
    } else {
        format!("{version}_{slug}{MIGRATION_SUFFIX}")
    }
}

/// Writes an empty migration stamped with `now` into `dir`.
///
/// The directory is created when missing. An existing file with the same
/// name is never overwritten.
pub fn create_migration_file(dir: &Path, description: &str, now: NaiveDateTime) -> Result<PathBuf> {
    let file_name = migration_file_name(Version::from(now), description);
    let path = dir.join(file_name);

    fs::create_dir_all(dir)?;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(MigrateError::MigrationExists(path));
        }
        Err(err) => return Err(err.into()),
    };
    write!(file, "{UP_MARKER}\n\n{DOWN_MARKER}\n")?;
    Ok(path)
}
