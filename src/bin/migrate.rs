//! Standalone migration runner, for use in deploy pipelines ahead of
//! starting `api`/`worker` (spec.md §6). Grounded on the teacher's use of
//! `clap` for its dev-cli binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qhse_core::config::Config;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Run or inspect database migrations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations.
    Run,
    /// Print applied migration versions without changing anything.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    match cli.command {
        Commands::Run => {
            qhse_core::MIGRATOR.run(&pool).await.context("migration failed")?;
            println!("migrations applied");
        }
        Commands::Status => {
            let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
                .fetch_all(&pool)
                .await
                .context("failed to read migration status")?;

            for migration in qhse_core::MIGRATOR.iter() {
                let status = if applied.contains(&migration.version) { "applied" } else { "pending" };
                println!("{:<20} {} {}", migration.version, status, migration.description);
            }
        }
    }

    Ok(())
}
