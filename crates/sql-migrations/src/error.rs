//! Error types for the migration system.

use std::path::PathBuf;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The migrations directory could not be listed.
    #[error("Failed to read migrations directory '{path}': {source}")]
    ReadDir {
        /// Directory that was scanned.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A migration file could not be read.
    #[error("Failed to read migration file '{path}': {source}")]
    ReadFile {
        /// Path to the migration file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file name does not start with a `YYYYMMDDHHMMSS` version.
    #[error("Invalid version in migration file name '{name}': {message}")]
    InvalidVersion {
        /// File name of the migration.
        name: String,
        /// Error message.
        message: String,
    },

    /// A driver call failed while running a migration.
    #[error("Migration '{name}' failed: {source}")]
    Migration {
        /// File name of the offending migration.
        name: String,
        /// The driver error.
        #[source]
        source: Box<MigrateError>,
    },

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// Database error during migration execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Wraps a driver error with the name of the migration it happened in.
    #[must_use]
    pub fn in_migration(name: impl Into<String>, source: Self) -> Self {
        Self::Migration {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
