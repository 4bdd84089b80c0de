//! sql-migrations CLI
//!
//! Command-line tool for applying and reverting SQL file migrations.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use sql_migrations::prelude::*;

/// Plain SQL file migrations.
#[derive(Parser)]
#[command(name = "sql-migrations")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Migrations directory.
    #[arg(short, long, env = "MIGRATIONS_DIR", default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Enable verbose output (prints SQL before it runs).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations.
    Up,

    /// Revert the newest applied migration.
    Down,

    /// Show migration status.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create an empty migration file.
    New {
        /// Migration description, used in the file name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::New { name } => {
            let now = chrono::Utc::now().naive_utc();
            let path = create_migration_file(&cli.migrations_dir, &name, now)?;
            info!("Created migration: {}", path.display());
        }

        Commands::Up => {
            let (set, driver) = open(&cli.database, &cli.migrations_dir).await?;
            let verbose = cli.verbose;
            let applied = set
                .apply_with(&driver, |migration| {
                    if verbose {
                        println!("{}", migration.forward_body);
                    }
                })
                .await?;
            if applied == 0 {
                info!("No migrations to apply.");
            }
        }

        Commands::Down => {
            let (set, driver) = open(&cli.database, &cli.migrations_dir).await?;
            if let Some(migration) = set.revert(&driver).await? {
                info!("Reverted {}", migration.name);
            }
        }

        Commands::Status { json } => {
            let (set, driver) = open(&cli.database, &cli.migrations_dir).await?;
            let statuses = set.status(&driver).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else if statuses.is_empty() {
                info!("No migrations found in {}.", cli.migrations_dir.display());
            } else {
                println!("\nMigrations:");
                println!("{:-<60}", "");
                for status in &statuses {
                    let mark = if status.applied { "X" } else { " " };
                    println!(" [{}] {}", mark, status.name);
                }
                println!();
            }
        }
    }

    Ok(())
}

/// Loads the migrations, then connects to the database.
async fn open(
    database: &str,
    migrations_dir: &Path,
) -> anyhow::Result<(MigrationSet, SqliteDriver)> {
    let set = MigrationSet::from_dir(migrations_dir)?;

    let options = SqliteConnectOptions::from_str(database)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok((set, SqliteDriver::new(pool)))
}
