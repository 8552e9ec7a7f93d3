//! Partner financial rollups.
//!
//! Keeps running monthly `{realized, to_pay}` totals, per-classification
//! realized totals and a per-year activity counter for every partner. The
//! relational [`LedgerStore`] is the source of truth; the key-value
//! [`AggregateStore`] is a derived, best-effort projection that can always be
//! rebuilt from it.
//!
//! Everything is reached through [`Rollups`]:
//!
//! ```rust,no_run
//! # async fn demo(db: sea_orm::DatabaseConnection) -> Result<(), rollup::RollupError> {
//! use rollup::{Bucket, MoneyCents, Rollups, SqlLedger, MemoryAggregateStore};
//!
//! let rollups = Rollups::builder()
//!     .ledger(SqlLedger::new(db))
//!     .cache(MemoryAggregateStore::new())
//!     .namespace("acme")
//!     .build()?;
//!
//! let ym = "202401".parse()?;
//! rollups
//!     .monthly_apply_delta(42, ym, MoneyCents::new(100_00), Bucket::Realized)
//!     .await?;
//! let month = rollups.monthly_get(42, ym).await?.into_inner();
//! assert_eq!(month.realized, MoneyCents::new(100_00));
//! # Ok(())
//! # }
//! ```

pub use classification_rollups::{
    Classification, ClassificationKey, ClassificationRollup, ClassificationTotal,
};
pub use error::{Advisory, AggregateStoreError, Reported, RollupError};
pub use keys::{DEFAULT_NAMESPACE, KeySpace};
pub use ledger::{Increment, LedgerStore, SqlLedger};
pub use money::MoneyCents;
pub use monthly_rollups::{Bucket, MonthlyRollup};
pub use ops::{
    ClassificationOptions, ExpenseFact, MonthReconciliation, Rollups, RollupsBuilder, YearCount,
    YearlyRollup,
};
pub use period::YearMonth;
pub use store::{AggregateStore, MemoryAggregateStore, SqlAggregateStore};

mod classification_rollups;
mod error;
mod keys;
mod ledger;
mod money;
mod monthly_rollups;
mod ops;
mod period;
mod store;

/// Tenant identifier.
pub type PartnerId = i64;

type ResultRollup<T> = Result<T, RollupError>;
