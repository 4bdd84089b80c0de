//! Storage drivers.
//!
//! A driver owns the tracking table of applied versions and runs migration
//! bodies against one database. The migration set only talks to this trait.

mod sqlite;

pub use sqlite::{SqliteDriver, VERSIONS_TABLE};

use std::future::Future;

use crate::error::Result;
use crate::migration::Migration;

/// Version bookkeeping and transactional execution for one database.
pub trait Driver: Send + Sync {
    /// Creates the tracking table if it does not exist yet.
    fn create_versions_table(&self) -> impl Future<Output = Result<()>> + Send;

    /// Returns whether `version` is recorded as applied.
    ///
    /// Must not modify anything. An error here ends the run.
    fn has_applied(&self, version: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Runs the forward body and records the version, as one atomic unit.
    fn apply_migration(&self, migration: &Migration) -> impl Future<Output = Result<()>> + Send;

    /// Runs the reverse body and deletes the version record, as one atomic unit.
    fn revert_migration(&self, migration: &Migration) -> impl Future<Output = Result<()>> + Send;
}
