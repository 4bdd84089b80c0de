//! Plain SQL file migrations for Rust.
//!
//! `sql-migrations` discovers versioned `.sql` change-sets in a directory,
//! tracks which ones a database has applied, and applies or reverts them in
//! version order, each inside its own transaction.
//!
//! # Migration files
//!
//! A migration file name starts with a `YYYYMMDDHHMMSS` version. The body is
//! split in two by `-- up` and `-- down` marker lines:
//!
//! ```sql
//! -- 20230101000000_init.sql
//! -- up
//! CREATE TABLE t (id INTEGER);
//! -- down
//! DROP TABLE t;
//! ```
//!
//! # Architecture
//!
//! - **Migration** - One parsed file: version plus forward and reverse SQL
//! - **Source** - Loads migration files from disk and scaffolds new ones
//! - **MigrationSet** - Ordered migrations with the apply/revert policy
//! - **Driver** - Version bookkeeping and transactional execution for one database
//!
//! # Example
//!
//! ```rust,ignore
//! use sql_migrations::prelude::*;
//! use sqlx::sqlite::SqlitePoolOptions;
//!
//! let pool = SqlitePoolOptions::new().connect("sqlite:app.db").await?;
//! let driver = SqliteDriver::new(pool);
//!
//! let set = MigrationSet::from_dir("migrations")?;
//! set.apply(&driver).await?;
//!
//! // Undo the newest applied migration
//! set.revert(&driver).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Apply pending migrations
//! sql-migrations up
//!
//! # Revert the newest applied migration
//! sql-migrations down
//!
//! # Show migration status
//! sql-migrations status
//!
//! # Create an empty migration file
//! sql-migrations new add_users
//! ```

pub mod driver;
pub mod error;
pub mod migration;
pub mod set;
pub mod source;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::driver::{Driver, SqliteDriver};
    pub use crate::error::{MigrateError, Result};
    pub use crate::migration::{Migration, Version};
    pub use crate::set::{MigrationSet, MigrationStatus};
    pub use crate::source::create_migration_file;
}
