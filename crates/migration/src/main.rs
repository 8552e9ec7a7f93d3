use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|status|clear-cache]";

enum Command {
    Up,
    Down,
    Fresh,
    Status,
    /// Empties the SQL Aggregate Store tables. Monthly entries and
    /// classification hashes are reloaded from the ledger tables on their
    /// next read or delta; year-activity counters start over.
    ClearCache,
}

impl Command {
    fn parse(raw: Option<String>) -> Option<Self> {
        match raw.as_deref().unwrap_or("up") {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "fresh" => Some(Self::Fresh),
            "status" => Some(Self::Status),
            "clear-cache" => Some(Self::ClearCache),
            _ => None,
        }
    }
}

async fn clear_cache(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared("DELETE FROM cache_entries").await?;
    db.execute_unprepared("DELETE FROM cache_hash_fields").await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(command) = Command::parse(std::env::args().nth(1)) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./rollup.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match command {
        Command::Up => migration::Migrator::up(&db, None).await?,
        Command::Down => migration::Migrator::down(&db, None).await?,
        Command::Fresh => migration::Migrator::fresh(&db).await?,
        Command::Status => migration::Migrator::status(&db).await?,
        Command::ClearCache => clear_cache(&db).await?,
    }

    Ok(())
}
