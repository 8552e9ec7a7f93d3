use crate::{Advisory, MonthlyRollup, PartnerId, Reported, ResultRollup, YearMonth};

use super::Rollups;

/// What a month's reconciliation rewrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthReconciliation {
    pub ym: YearMonth,
    pub monthly: MonthlyRollup,
    /// Classification fields written back to the cached hash.
    pub classifications: usize,
}

impl Rollups {
    /// Rebuilds every cached projection of a month from the Ledger Store:
    /// the monthly totals entry and the classification hash.
    pub async fn reconcile_month(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Reported<MonthReconciliation>> {
        let mut advisories = Vec::new();
        let monthly = self
            .monthly_refresh(partner_id, ym)
            .await?
            .drain_into(&mut advisories);

        let rows = self.ledger.list_classifications(partner_id, Some(ym)).await?;
        let key = self.keys.classification(partner_id, ym);
        let mut classifications = 0;

        match self.cache.del(&key).await {
            Ok(()) => {
                for row in rows.iter().filter(|row| row.realized.is_positive()) {
                    if let Err(err) = self
                        .cache
                        .hash_set(&key, &row.key.to_string(), row.realized.cents())
                        .await
                    {
                        advisories.push(Advisory::cache_unavailable(&key, "hash_set", &err));
                        break;
                    }
                    classifications += 1;
                }
            }
            Err(err) => advisories.push(Advisory::cache_unavailable(&key, "del", &err)),
        }

        tracing::info!(
            partner_id,
            %ym,
            classifications,
            clean = advisories.is_empty(),
            "reconciled month"
        );
        Ok(Reported::with(
            MonthReconciliation {
                ym,
                monthly,
                classifications,
            },
            advisories,
        ))
    }

    /// [`reconcile_month`](Self::reconcile_month) for the twelve months of
    /// `year`.
    pub async fn reconcile_year(
        &self,
        partner_id: PartnerId,
        year: i32,
    ) -> ResultRollup<Reported<Vec<MonthReconciliation>>> {
        let mut advisories = Vec::new();
        let mut months = Vec::with_capacity(12);
        for ym in YearMonth::months_of(year)? {
            months.push(
                self.reconcile_month(partner_id, ym)
                    .await?
                    .drain_into(&mut advisories),
            );
        }
        Ok(Reported::with(months, advisories))
    }
}
