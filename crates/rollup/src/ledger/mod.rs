//! The Ledger Store: durable source of truth for every rollup row.
//!
//! Implementations must apply increments as one atomic server-side statement
//! and never let a stored total go below zero.

use async_trait::async_trait;

use crate::{
    Bucket, Classification, ClassificationKey, ClassificationRollup, MoneyCents, MonthlyRollup,
    PartnerId, ResultRollup, YearMonth,
};

mod sql;

pub use sql::SqlLedger;

/// Result of a clamped increment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Increment<T> {
    /// The row as stored after the increment.
    pub row: T,
    /// Part of a negative delta absorbed by the zero clamp (`ZERO` when the
    /// delta applied in full).
    pub shortfall: MoneyCents,
}

impl<T> Increment<T> {
    #[must_use]
    pub fn was_clamped(&self) -> bool {
        self.shortfall.is_positive()
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_monthly(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Option<MonthlyRollup>>;

    /// Adds `delta` to `bucket`, creating the row on first use.
    async fn increment_monthly(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        bucket: Bucket,
        delta: MoneyCents,
    ) -> ResultRollup<Increment<MonthlyRollup>>;

    async fn find_classification(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        key: ClassificationKey,
    ) -> ResultRollup<Option<ClassificationRollup>>;

    /// Rows of `partner_id`, optionally restricted to one month, ordered by
    /// `(ym, category_id, sub_category_id)`.
    async fn list_classifications(
        &self,
        partner_id: PartnerId,
        ym: Option<YearMonth>,
    ) -> ResultRollup<Vec<ClassificationRollup>>;

    /// Adds `delta` to the realized total of the classification, creating the
    /// row on first use. Labels are overwritten with the given ones.
    async fn increment_classification(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        classification: &Classification,
        delta: MoneyCents,
    ) -> ResultRollup<Increment<ClassificationRollup>>;
}
