use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use migration::MigratorTrait;
use rollup::{
    Advisory, AggregateStore, AggregateStoreError, Bucket, Classification, ClassificationKey,
    ClassificationOptions, ExpenseFact, LedgerStore, MemoryAggregateStore, MoneyCents,
    MonthlyRollup, RollupError, Rollups, SqlAggregateStore, SqlLedger, YearCount, YearMonth,
};

async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn rollups_with_db() -> (Rollups, Arc<MemoryAggregateStore>, DatabaseConnection) {
    let db = database().await;
    let cache = Arc::new(MemoryAggregateStore::new());
    let rollups = Rollups::builder()
        .ledger(SqlLedger::new(db.clone()))
        .shared_cache(cache.clone())
        .build()
        .unwrap();
    (rollups, cache, db)
}

async fn rollups_with_file_db() -> (Rollups, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = root.join(format!("rollups_{}_{nanos}.db", std::process::id()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let rollups = Rollups::builder()
        .ledger(SqlLedger::new(db.clone()))
        .cache(MemoryAggregateStore::new())
        .build()
        .unwrap();
    (rollups, db, path)
}

fn ym(raw: &str) -> YearMonth {
    raw.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn eur(cents: i64) -> MoneyCents {
    MoneyCents::new(cents)
}

fn office_rent() -> Classification {
    Classification::new(ClassificationKey::new(1, 2), "Office", "Rent")
}

fn office_power() -> Classification {
    Classification::new(ClassificationKey::new(1, 3), "Office", "Power")
}

#[tokio::test]
async fn unwritten_month_reads_zero_without_ledger_row() {
    let (rollups, _cache, db) = rollups_with_db().await;

    let first = rollups.monthly_get(42, ym("202401")).await.unwrap();
    let second = rollups.monthly_get(42, ym("202401")).await.unwrap();

    assert!(first.is_clean());
    assert_eq!(first.value, MonthlyRollup::ZERO);
    assert_eq!(second.value, MonthlyRollup::ZERO);
    let ledger = SqlLedger::new(db);
    assert_eq!(ledger.find_monthly(42, ym("202401")).await.unwrap(), None);
}

#[tokio::test]
async fn deltas_accumulate_in_cache_and_ledger() {
    let (rollups, _cache, db) = rollups_with_db().await;
    let period = ym("202403");

    for amount in [100_00, 50_00, -30_00] {
        rollups
            .monthly_apply_delta(7, period, eur(amount), Bucket::Realized)
            .await
            .unwrap();
    }
    rollups
        .monthly_apply_delta(7, period, eur(12_50), Bucket::ToPay)
        .await
        .unwrap();

    let cached = rollups.monthly_get(7, period).await.unwrap();
    assert!(cached.is_clean());
    assert_eq!(cached.value, MonthlyRollup::new(eur(120_00), eur(12_50)));

    let stored = SqlLedger::new(db).find_monthly(7, period).await.unwrap();
    assert_eq!(stored, Some(cached.value));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deltas_on_file_db_are_all_counted() {
    let (rollups, db, path) = rollups_with_file_db().await;
    let period = ym("202401");

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let rollups = rollups.clone();
            tokio::spawn(async move {
                rollups
                    .monthly_apply_delta(42, period, eur(1_00), Bucket::Realized)
                    .await
            })
        })
        .collect();
    let mut failures = Vec::new();
    for task in tasks {
        if let Err(err) = task.await.unwrap() {
            failures.push(err.to_string());
        }
    }
    assert!(failures.is_empty(), "failed deltas: {failures:?}");

    // The cache entry is last-writer-wins between refreshes; the ledger row is exact.
    let refreshed = rollups.monthly_refresh(42, period).await.unwrap();
    assert_eq!(refreshed.value.realized, eur(40_00));
    let stored = SqlLedger::new(db.clone())
        .find_monthly(42, period)
        .await
        .unwrap();
    assert_eq!(stored, Some(MonthlyRollup::new(eur(40_00), MoneyCents::ZERO)));

    db.close().await.unwrap();
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn negative_delta_on_empty_month_clamps_to_zero() {
    let (rollups, _cache, _db) = rollups_with_db().await;

    let reported = rollups
        .monthly_apply_delta(42, ym("202401"), eur(-40_00), Bucket::Realized)
        .await
        .unwrap();

    assert_eq!(reported.value, MonthlyRollup::ZERO);
    assert_eq!(
        reported.advisories,
        vec![Advisory::InconsistentState {
            key: String::from("erp:42:exp:202401:despesa"),
            field: String::from("realized"),
            shortfall: eur(40_00),
        }]
    );

    let after = rollups
        .monthly_apply_delta(42, ym("202401"), eur(10_00), Bucket::Realized)
        .await
        .unwrap();
    assert!(after.is_clean());
    assert_eq!(after.value.realized, eur(10_00));
}

#[tokio::test]
async fn move_amount_keeps_month_total() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    let period = ym("202405");
    rollups
        .monthly_apply_delta(3, period, eur(80_00), Bucket::ToPay)
        .await
        .unwrap();

    let moved = rollups
        .move_amount(3, date(2024, 5, 9), eur(-30_00), Bucket::ToPay, Bucket::Realized)
        .await
        .unwrap();

    assert!(moved.is_clean());
    assert_eq!(moved.value, MonthlyRollup::new(eur(30_00), eur(50_00)));
    assert_eq!(moved.value.total(), eur(80_00));

    let same = rollups
        .move_amount(3, date(2024, 5, 9), eur(30_00), Bucket::ToPay, Bucket::ToPay)
        .await
        .unwrap();
    assert_eq!(same.value, moved.value);
}

#[tokio::test]
async fn yearly_load_folds_active_months() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    rollups
        .monthly_apply_delta(42, ym("202401"), eur(100_00), Bucket::Realized)
        .await
        .unwrap();
    rollups
        .monthly_apply_delta(42, ym("202403"), eur(50_01), Bucket::Realized)
        .await
        .unwrap();
    rollups
        .monthly_apply_delta(42, ym("202403"), eur(20_00), Bucket::ToPay)
        .await
        .unwrap();
    // Netted out to zero: no activity.
    rollups
        .monthly_apply_delta(42, ym("202402"), eur(10_00), Bucket::Realized)
        .await
        .unwrap();
    rollups
        .monthly_apply_delta(42, ym("202402"), eur(-10_00), Bucket::Realized)
        .await
        .unwrap();

    let yearly = rollups.yearly_load(42, 2024).await.unwrap().into_inner();

    let mut realized = MoneyCents::ZERO;
    for month in YearMonth::months_of(2024).unwrap() {
        realized += rollups.monthly_get(42, month).await.unwrap().value.realized;
    }
    assert_eq!(yearly.realized, realized);
    assert_eq!(yearly.realized, eur(150_01));
    assert_eq!(yearly.to_pay, eur(20_00));
    assert_eq!(yearly.active_months, 2);
    assert_eq!(yearly.average_month, eur(75_01));
    assert_eq!(yearly.pending_count, 1);
}

#[tokio::test]
async fn yearly_load_rejects_bad_year() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    assert!(matches!(
        rollups.yearly_load(42, 12).await,
        Err(RollupError::InvalidPeriod(_))
    ));
}

#[tokio::test]
async fn expense_paid_then_installment_settled() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    let paid = ExpenseFact::immediate(42, eur(100_00), date(2024, 1, 15));

    rollups.record_expense(&paid).await.unwrap();
    let month = rollups.monthly_get(42, ym("202401")).await.unwrap();
    assert_eq!(month.value, MonthlyRollup::new(eur(100_00), MoneyCents::ZERO));

    rollups.remove_expense(&paid).await.unwrap();
    let installment =
        ExpenseFact::installment(42, eur(100_00), date(2024, 1, 2), date(2024, 1, 15));
    let pending = rollups.record_expense(&installment).await.unwrap();
    assert_eq!(pending.value, MonthlyRollup::new(MoneyCents::ZERO, eur(100_00)));

    let settled = rollups
        .move_amount(42, date(2024, 1, 15), eur(100_00), Bucket::ToPay, Bucket::Realized)
        .await
        .unwrap();
    assert_eq!(settled.value, MonthlyRollup::new(eur(100_00), MoneyCents::ZERO));
}

#[tokio::test]
async fn deleted_expense_leaves_zero_month() {
    let (rollups, cache, _db) = rollups_with_db().await;
    rollups
        .monthly_apply_delta(42, ym("202401"), eur(100_00), Bucket::Realized)
        .await
        .unwrap();

    let deleted = rollups
        .monthly_apply_delta(42, ym("202401"), eur(-100_00), Bucket::Realized)
        .await
        .unwrap();

    assert!(deleted.is_clean());
    assert_eq!(deleted.value, MonthlyRollup::ZERO);
    let key = rollups.keys().monthly(42, ym("202401"));
    assert!(cache.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn reads_bypass_an_unavailable_cache() {
    let (rollups, cache, _db) = rollups_with_db().await;
    rollups
        .monthly_apply_delta(42, ym("202401"), eur(25_00), Bucket::ToPay)
        .await
        .unwrap();

    cache.set_offline(true);
    let reported = rollups.monthly_get(42, ym("202401")).await.unwrap();

    assert_eq!(reported.value.to_pay, eur(25_00));
    assert!(matches!(
        reported.advisories.as_slice(),
        [Advisory::CacheUnavailable { operation: "get", .. }]
    ));
    assert!(reported.advisories[0].needs_reconciliation());
}

#[tokio::test]
async fn writes_survive_an_unavailable_cache_until_refresh() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202402");
    rollups
        .monthly_apply_delta(42, period, eur(100_00), Bucket::Realized)
        .await
        .unwrap();

    cache.set_offline(true);
    let written = rollups
        .monthly_apply_delta(42, period, eur(50_00), Bucket::Realized)
        .await
        .unwrap();
    assert_eq!(written.value.realized, eur(150_00));
    assert!(!written.is_clean());

    cache.set_offline(false);
    let stale = rollups.monthly_get(42, period).await.unwrap();
    assert_eq!(stale.value.realized, eur(100_00));

    let refreshed = rollups.monthly_refresh(42, period).await.unwrap();
    assert_eq!(refreshed.value.realized, eur(150_00));
    let read = rollups.monthly_get(42, period).await.unwrap();
    assert_eq!(read.value.realized, eur(150_00));
}

#[tokio::test]
async fn ledger_failure_is_fatal() {
    let (rollups, _cache, db) = rollups_with_db().await;
    db.execute_unprepared("DROP TABLE monthly_rollups")
        .await
        .unwrap();

    let result = rollups
        .monthly_apply_delta(42, ym("202401"), eur(1_00), Bucket::Realized)
        .await;
    assert!(matches!(result, Err(RollupError::Ledger(_))));
}

#[tokio::test]
async fn corrupt_cache_entry_is_replaced() {
    let (rollups, cache, _db) = rollups_with_db().await;
    rollups
        .monthly_apply_delta(42, ym("202401"), eur(9_99), Bucket::Realized)
        .await
        .unwrap();
    let key = rollups.keys().monthly(42, ym("202401"));
    cache.set(&key, b"{not json".to_vec()).await.unwrap();

    let healed = rollups.monthly_get(42, ym("202401")).await.unwrap();
    assert_eq!(healed.value.realized, eur(9_99));
    assert_eq!(healed.advisories, vec![Advisory::CorruptEntry { key }]);

    let again = rollups.monthly_get(42, ym("202401")).await.unwrap();
    assert!(again.is_clean());
}

#[tokio::test]
async fn invalidate_drops_only_the_cache_entry() {
    let (rollups, cache, _db) = rollups_with_db().await;
    rollups
        .monthly_apply_delta(42, ym("202401"), eur(5_00), Bucket::Realized)
        .await
        .unwrap();
    let key = rollups.keys().monthly(42, ym("202401"));

    rollups.monthly_invalidate(42, ym("202401")).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), None);

    let read = rollups.monthly_get(42, ym("202401")).await.unwrap();
    assert_eq!(read.value.realized, eur(5_00));
}

#[tokio::test]
async fn classification_rows_and_totals() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    let period = ym("202401");
    let options = ClassificationOptions::default();

    rollups
        .classification_apply_delta(42, period, &office_power(), eur(30_00), options)
        .await
        .unwrap();
    let rent = rollups
        .classification_apply_delta(42, period, &office_rent(), eur(100_00), options)
        .await
        .unwrap();
    assert!(rent.is_clean());
    assert_eq!(rent.value.realized, eur(100_00));
    assert_eq!(rent.value.category_label, "Office");

    let found = rollups
        .classification_find(42, period, ClassificationKey::new(1, 2))
        .await
        .unwrap();
    assert_eq!(found, rent.value);

    let missing = rollups
        .classification_find(42, period, ClassificationKey::new(9, 9))
        .await;
    assert!(matches!(missing, Err(RollupError::NotFound(_))));

    let totals = rollups
        .classification_totals(42, period)
        .await
        .unwrap()
        .into_inner();
    let keys: Vec<String> = totals.iter().map(|total| total.key.to_string()).collect();
    assert_eq!(keys, vec!["1:2", "1:3"]);
    assert_eq!(totals[0].realized, eur(100_00));

    let listed = rollups
        .classification_list_by_partner(42, None)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn classification_removal_prunes_field() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202401");
    rollups
        .classification_apply_delta(42, period, &office_rent(), eur(40_00), Default::default())
        .await
        .unwrap();
    rollups
        .classification_apply_delta(42, period, &office_power(), eur(10_00), Default::default())
        .await
        .unwrap();

    rollups
        .classification_apply_delta(
            42,
            period,
            &office_rent(),
            eur(-40_00),
            ClassificationOptions::removal(),
        )
        .await
        .unwrap();

    let key = rollups.keys().classification(42, period);
    let fields = cache.hash_get_all(&key).await.unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("1:3"), Some(&10_00));
}

#[tokio::test]
async fn classification_clamp_reports_once() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202406");

    let reported = rollups
        .classification_apply_delta(42, period, &office_rent(), eur(-15_00), Default::default())
        .await
        .unwrap();

    assert_eq!(reported.value.realized, MoneyCents::ZERO);
    assert!(matches!(
        reported.advisories.as_slice(),
        [Advisory::InconsistentState { shortfall, .. }] if *shortfall == eur(15_00)
    ));
    let key = rollups.keys().classification(42, period);
    assert_eq!(cache.hash_get(&key, "1:2").await.unwrap(), Some(0));
}

#[tokio::test]
async fn classification_totals_rebuild_from_ledger() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202401");
    rollups
        .classification_apply_delta(42, period, &office_rent(), eur(70_00), Default::default())
        .await
        .unwrap();
    let key = rollups.keys().classification(42, period);
    cache.del(&key).await.unwrap();

    let totals = rollups.classification_totals(42, period).await.unwrap();
    assert!(totals.is_clean());
    assert_eq!(totals.value.len(), 1);
    assert_eq!(cache.hash_get(&key, "1:2").await.unwrap(), Some(70_00));

    cache.set_offline(true);
    let degraded = rollups.classification_totals(42, period).await.unwrap();
    assert_eq!(degraded.value, totals.value);
    assert!(!degraded.is_clean());
}

#[tokio::test]
async fn classification_field_lost_by_cache_is_restored_from_ledger() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202401");
    rollups
        .classification_apply_delta(42, period, &office_rent(), eur(100_00), Default::default())
        .await
        .unwrap();
    let key = rollups.keys().classification(42, period);
    cache.del(&key).await.unwrap();

    let applied = rollups
        .classification_apply_delta(42, period, &office_rent(), eur(50_00), Default::default())
        .await
        .unwrap();
    assert!(applied.is_clean());
    assert_eq!(applied.value.realized, eur(150_00));
    assert_eq!(cache.hash_get(&key, "1:2").await.unwrap(), Some(150_00));

    let totals = rollups
        .classification_totals(42, period)
        .await
        .unwrap()
        .into_inner();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].realized, eur(150_00));
}

#[tokio::test]
async fn year_counter_never_goes_below_zero() {
    let (rollups, cache, _db) = rollups_with_db().await;

    rollups.year_decr(42, 2024).await.unwrap();
    assert!(rollups.year_list(42).await.unwrap().is_empty());

    rollups.year_incr(42, 2024).await.unwrap();
    rollups.year_incr(42, 2023).await.unwrap();
    rollups.year_decr(42, 2024).await.unwrap();
    rollups.year_decr(42, 2024).await.unwrap();

    assert_eq!(
        rollups.year_list(42).await.unwrap(),
        vec![YearCount {
            year: 2023,
            count: 1
        }]
    );
    let key = rollups.keys().year_activity(42);
    assert_eq!(cache.hash_get(&key, "2024").await.unwrap(), Some(0));
}

#[tokio::test]
async fn year_decr_names_the_failing_operation() {
    let (rollups, cache, _db) = rollups_with_db().await;
    rollups.year_incr(42, 2024).await.unwrap();
    cache.set_offline(true);

    let reported = rollups.year_decr(42, 2024).await.unwrap();

    assert!(matches!(
        reported.advisories.as_slice(),
        [Advisory::CacheUnavailable { operation: "hash_get", .. }]
    ));
    cache.set_offline(false);
    assert_eq!(
        rollups.year_list(42).await.unwrap(),
        vec![YearCount {
            year: 2024,
            count: 1
        }]
    );
}

#[tokio::test]
async fn year_list_fails_without_cache() {
    let (rollups, cache, _db) = rollups_with_db().await;
    cache.set_offline(true);

    let incr = rollups.year_incr(42, 2024).await.unwrap();
    assert!(!incr.is_clean());
    assert!(matches!(
        rollups.year_list(42).await,
        Err(RollupError::Cache(AggregateStoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn installment_lifecycle_moves_classification() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    let installment =
        ExpenseFact::installment(42, eur(60_00), date(2024, 1, 2), date(2024, 2, 10))
            .classified(office_rent());

    rollups.record_expense(&installment).await.unwrap();
    let missing = rollups
        .classification_find(42, ym("202402"), ClassificationKey::new(1, 2))
        .await;
    assert!(matches!(missing, Err(RollupError::NotFound(_))));

    let settled = rollups.settle_installment(&installment).await.unwrap();
    assert_eq!(settled.value, MonthlyRollup::new(eur(60_00), MoneyCents::ZERO));
    let row = rollups
        .classification_find(42, ym("202402"), ClassificationKey::new(1, 2))
        .await
        .unwrap();
    assert_eq!(row.realized, eur(60_00));

    let paid = ExpenseFact {
        paid: true,
        ..installment.clone()
    };
    let again = rollups.settle_installment(&paid).await.unwrap();
    assert_eq!(again.value, settled.value);

    let unsettled = rollups.unsettle_installment(&paid).await.unwrap();
    assert_eq!(unsettled.value, MonthlyRollup::new(MoneyCents::ZERO, eur(60_00)));

    let removed = rollups.remove_expense(&installment).await.unwrap();
    assert!(removed.is_clean());
    assert_eq!(removed.value, MonthlyRollup::ZERO);
    assert!(
        rollups
            .classification_totals(42, ym("202402"))
            .await
            .unwrap()
            .value
            .is_empty()
    );
    assert!(rollups.year_list(42).await.unwrap().is_empty());
}

#[tokio::test]
async fn revised_expense_moves_between_months_and_years() {
    let (rollups, _cache, _db) = rollups_with_db().await;
    let before =
        ExpenseFact::immediate(42, eur(45_00), date(2023, 12, 28)).classified(office_rent());
    let after = ExpenseFact::immediate(42, eur(50_00), date(2024, 1, 3)).classified(office_rent());

    rollups.record_expense(&before).await.unwrap();
    let revised = rollups.revise_expense(&before, &after).await.unwrap();

    assert_eq!(revised.value.realized, eur(50_00));
    assert_eq!(
        rollups.monthly_get(42, ym("202312")).await.unwrap().value,
        MonthlyRollup::ZERO
    );
    assert_eq!(
        rollups.year_list(42).await.unwrap(),
        vec![YearCount {
            year: 2024,
            count: 1
        }]
    );
    let row = rollups
        .classification_find(42, ym("202401"), ClassificationKey::new(1, 2))
        .await
        .unwrap();
    assert_eq!(row.realized, eur(50_00));
}

#[tokio::test]
async fn out_of_range_dates_are_rejected_before_ledger_writes() {
    let (rollups, cache, db) = rollups_with_db().await;
    let far = date(10000, 3, 1);

    let recorded = rollups
        .record_expense(&ExpenseFact::immediate(42, eur(1_00), far).classified(office_rent()))
        .await;
    assert!(matches!(recorded, Err(RollupError::InvalidPeriod(_))));

    let late_registration =
        ExpenseFact::installment(42, eur(1_00), far, date(2024, 1, 10)).classified(office_rent());
    assert!(matches!(
        rollups.record_expense(&late_registration).await,
        Err(RollupError::InvalidPeriod(_))
    ));
    assert!(matches!(
        rollups
            .move_amount(42, far, eur(1_00), Bucket::ToPay, Bucket::Realized)
            .await,
        Err(RollupError::InvalidPeriod(_))
    ));

    assert!(
        rollups
            .classification_list_by_partner(42, None)
            .await
            .unwrap()
            .is_empty()
    );
    let ledger = SqlLedger::new(db);
    assert_eq!(ledger.find_monthly(42, ym("202401")).await.unwrap(), None);
    let activity = cache
        .hash_get_all(&rollups.keys().year_activity(42))
        .await
        .unwrap();
    assert!(activity.is_empty());
}

#[tokio::test]
async fn reconcile_month_restores_diverged_cache() {
    let (rollups, cache, _db) = rollups_with_db().await;
    let period = ym("202401");
    rollups
        .record_expense(
            &ExpenseFact::immediate(42, eur(20_00), date(2024, 1, 9)).classified(office_rent()),
        )
        .await
        .unwrap();

    let class_key = rollups.keys().classification(42, period);
    cache.hash_set(&class_key, "1:2", 999_99).await.unwrap();
    cache.hash_set(&class_key, "7:7", 5_00).await.unwrap();
    cache
        .set(&rollups.keys().monthly(42, period), br#"{"realized":1,"to_pay":1}"#.to_vec())
        .await
        .unwrap();

    let reconciled = rollups.reconcile_month(42, period).await.unwrap();
    assert!(reconciled.is_clean());
    assert_eq!(reconciled.value.classifications, 1);
    assert_eq!(reconciled.value.monthly.realized, eur(20_00));

    let fields = cache.hash_get_all(&class_key).await.unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("1:2"), Some(&20_00));
    let month = rollups.monthly_get(42, period).await.unwrap();
    assert_eq!(month.value.realized, eur(20_00));

    let year = rollups.reconcile_year(42, 2024).await.unwrap();
    assert_eq!(year.value.len(), 12);
}

#[tokio::test]
async fn sql_aggregate_store_round_trips_values_and_hashes() {
    let store = SqlAggregateStore::new(database().await);

    assert_eq!(store.get("k").await.unwrap(), None);
    store.set("k", b"one".to_vec()).await.unwrap();
    store.set("k", b"two".to_vec()).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
    store.del("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);

    assert_eq!(store.hash_incr("h", "a", 5).await.unwrap(), 5);
    assert_eq!(store.hash_incr("h", "a", -7).await.unwrap(), -2);
    store.hash_set("h", "b", 3).await.unwrap();
    assert_eq!(store.hash_get("h", "a").await.unwrap(), Some(-2));
    store.hash_del("h", "a").await.unwrap();
    let fields = store.hash_get_all("h").await.unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("b"), Some(&3));
}

#[tokio::test]
async fn rollups_over_sql_cache() {
    let db = database().await;
    let rollups = Rollups::builder()
        .ledger(SqlLedger::new(db.clone()))
        .cache(SqlAggregateStore::new(db))
        .namespace("acme")
        .build()
        .unwrap();

    rollups
        .record_expense(
            &ExpenseFact::immediate(5, eur(12_34), date(2024, 8, 1)).classified(office_rent()),
        )
        .await
        .unwrap();

    assert_eq!(
        rollups.keys().monthly(5, ym("202408")),
        "acme:5:exp:202408:despesa"
    );
    let month = rollups.monthly_get(5, ym("202408")).await.unwrap();
    assert!(month.is_clean());
    assert_eq!(month.value.realized, eur(12_34));
    let totals = rollups.classification_totals(5, ym("202408")).await.unwrap();
    assert_eq!(totals.value[0].realized, eur(12_34));
    assert_eq!(rollups.year_list(5).await.unwrap()[0].count, 1);
}

#[tokio::test]
async fn builder_requires_a_ledger() {
    let result = Rollups::builder().cache(MemoryAggregateStore::new()).build();
    assert!(matches!(
        result,
        Err(RollupError::MissingComponent("ledger store"))
    ));
}
