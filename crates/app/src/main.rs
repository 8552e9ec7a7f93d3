use std::{error::Error, sync::Arc};

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use migration::MigratorTrait;
use rollup::{
    AggregateStore, Classification, ClassificationKey, ExpenseFact, MemoryAggregateStore,
    MoneyCents, Reported, Rollups, SqlAggregateStore, SqlLedger, YearMonth,
};
use sea_orm::{Database, DatabaseConnection};
use settings::{CacheBackend, Settings};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "rollup_admin")]
#[command(about = "Inspect and repair partner financial rollups")]
struct Cli {
    /// Settings file, without extension.
    #[arg(long, default_value = "settings")]
    config: String,

    /// Database connection string (also read from `DATABASE_URL`). Overrides
    /// the `[database]` settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly totals, through the cache.
    Month(MonthArgs),
    /// Yearly summary folded from the monthly totals.
    Year(YearArgs),
    /// Years with registered activity.
    Years(PartnerArgs),
    /// Realized totals per classification.
    Classes(ClassesArgs),
    /// Reload a month's cache entry from the ledger.
    Refresh(MonthArgs),
    /// Drop a month's cache entry.
    Invalidate(MonthArgs),
    /// Rebuild cached projections of a month or a whole year.
    Reconcile(ReconcileArgs),
    /// Apply a new expense or installment.
    Record(ExpenseArgs),
    /// Mark an unpaid installment as paid.
    Settle(ExpenseArgs),
    /// Withdraw a deleted expense or installment.
    Remove(ExpenseArgs),
}

#[derive(Args, Debug)]
struct PartnerArgs {
    #[arg(long)]
    partner: i64,
}

#[derive(Args, Debug)]
struct MonthArgs {
    #[arg(long)]
    partner: i64,
    /// Period as `YYYYMM`.
    #[arg(long)]
    ym: YearMonth,
}

#[derive(Args, Debug)]
struct YearArgs {
    #[arg(long)]
    partner: i64,
    #[arg(long)]
    year: i32,
}

#[derive(Args, Debug)]
struct ClassesArgs {
    #[arg(long)]
    partner: i64,
    #[arg(long)]
    ym: YearMonth,
    /// Print the ledger rows instead of the cached totals.
    #[arg(long)]
    ledger: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ReconcileScope {
    #[arg(long)]
    ym: Option<YearMonth>,
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    #[arg(long)]
    partner: i64,
    #[command(flatten)]
    scope: ReconcileScope,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Status {
    Paid,
    Unpaid,
}

#[derive(Args, Debug)]
struct ExpenseArgs {
    #[arg(long)]
    partner: i64,
    /// Amount such as `100.00`.
    #[arg(long)]
    amount: MoneyCents,
    /// Registration date, `YYYY-MM-DD`.
    #[arg(long)]
    date: NaiveDate,
    /// Due date; defaults to the registration date.
    #[arg(long)]
    due: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = Status::Paid)]
    status: Status,
    /// Classification as `category:sub_category`.
    #[arg(long)]
    class: Option<ClassificationKey>,
    #[arg(long, default_value = "", requires = "class")]
    category_label: String,
    #[arg(long, default_value = "", requires = "class")]
    sub_category_label: String,
}

impl ExpenseArgs {
    fn fact(&self) -> ExpenseFact {
        let due = self.due.unwrap_or(self.date);
        let fact = match self.status {
            Status::Paid => ExpenseFact {
                due_on: due,
                ..ExpenseFact::immediate(self.partner, self.amount, self.date)
            },
            Status::Unpaid => ExpenseFact::installment(self.partner, self.amount, self.date, due),
        };
        match self.class {
            Some(key) => fact.classified(Classification::new(
                key,
                self.category_label.as_str(),
                self.sub_category_label.as_str(),
            )),
            None => fact,
        }
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn report<T>(reported: Reported<T>) -> T {
    for advisory in &reported.advisories {
        if advisory.needs_reconciliation() {
            tracing::warn!(?advisory, "cache is stale, run `reconcile` once it is back");
        } else {
            tracing::info!(?advisory, "advisory");
        }
    }
    reported.into_inner()
}

fn print_month(ym: YearMonth, realized: MoneyCents, to_pay: MoneyCents) {
    println!("{ym}  realized {realized}  to_pay {to_pay}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "rollup_admin={level},rollup={level}",
            level = settings.app.level
        ))
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;

    let cache: Arc<dyn AggregateStore> = match settings.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryAggregateStore::new()),
        CacheBackend::Sql => Arc::new(SqlAggregateStore::new(db.clone())),
    };
    let rollups = Rollups::builder()
        .ledger(SqlLedger::new(db))
        .shared_cache(cache)
        .namespace(settings.cache.namespace.as_str())
        .build()?;
    tracing::debug!(
        namespace = rollups.keys().namespace(),
        backend = ?settings.cache.backend,
        "rollups ready"
    );

    match cli.command {
        Command::Month(args) => {
            let month = report(rollups.monthly_get(args.partner, args.ym).await?);
            print_month(args.ym, month.realized, month.to_pay);
        }
        Command::Year(args) => {
            let year = report(rollups.yearly_load(args.partner, args.year).await?);
            println!(
                "{}  realized {}  to_pay {}  active months {}  average {}  pending {}",
                year.year,
                year.realized,
                year.to_pay,
                year.active_months,
                year.average_month,
                year.pending_count
            );
        }
        Command::Years(args) => {
            for entry in rollups.year_list(args.partner).await? {
                println!("{}  {}", entry.year, entry.count);
            }
        }
        Command::Classes(args) if args.ledger => {
            for row in rollups
                .classification_list_by_partner(args.partner, Some(args.ym))
                .await?
            {
                println!(
                    "{}  {}  {} / {}",
                    row.key, row.realized, row.category_label, row.sub_category_label
                );
            }
        }
        Command::Classes(args) => {
            for total in report(rollups.classification_totals(args.partner, args.ym).await?) {
                println!("{}  {}", total.key, total.realized);
            }
        }
        Command::Refresh(args) => {
            let month = report(rollups.monthly_refresh(args.partner, args.ym).await?);
            print_month(args.ym, month.realized, month.to_pay);
        }
        Command::Invalidate(args) => {
            report(rollups.monthly_invalidate(args.partner, args.ym).await?);
            println!("invalidated {}", rollups.keys().monthly(args.partner, args.ym));
        }
        Command::Reconcile(args) => {
            let months = match (args.scope.ym, args.scope.year) {
                (Some(ym), _) => {
                    vec![report(rollups.reconcile_month(args.partner, ym).await?)]
                }
                (None, Some(year)) => report(rollups.reconcile_year(args.partner, year).await?),
                (None, None) => Vec::new(),
            };
            for month in months {
                print_month(month.ym, month.monthly.realized, month.monthly.to_pay);
            }
        }
        Command::Record(args) => {
            let fact = args.fact();
            let month = report(rollups.record_expense(&fact).await?);
            print_month(fact.period()?, month.realized, month.to_pay);
            tracing::info!(year = fact.registered_on.year(), "counted activity");
        }
        Command::Settle(args) => {
            let fact = ExpenseFact {
                paid: false,
                ..args.fact()
            };
            let month = report(rollups.settle_installment(&fact).await?);
            print_month(fact.period()?, month.realized, month.to_pay);
        }
        Command::Remove(args) => {
            let fact = args.fact();
            let month = report(rollups.remove_expense(&fact).await?);
            print_month(fact.period()?, month.realized, month.to_pay);
        }
    }

    Ok(())
}
