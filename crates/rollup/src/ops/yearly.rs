use serde::Serialize;

use crate::{
    Advisory, AggregateStoreError, MoneyCents, PartnerId, Reported, ResultRollup, YearMonth,
    period::ensure_year,
};

use super::Rollups;

/// Totals of a year, folded from its twelve monthly rollups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct YearlyRollup {
    pub year: i32,
    pub realized: MoneyCents,
    pub to_pay: MoneyCents,
    /// Months with any non-zero total.
    pub active_months: u32,
    /// `realized / max(1, active_months)`.
    pub average_month: MoneyCents,
    /// Months with something still to pay.
    pub pending_count: u32,
}

/// One field of the year-activity hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: i64,
}

impl Rollups {
    /// Folds the twelve months of `year`.
    ///
    /// All-zero months count as "no activity" and stay out of the average's
    /// denominator, whether they were never written or netted out to zero.
    pub async fn yearly_load(
        &self,
        partner_id: PartnerId,
        year: i32,
    ) -> ResultRollup<Reported<YearlyRollup>> {
        let mut advisories = Vec::new();
        let mut yearly = YearlyRollup {
            year,
            ..Default::default()
        };

        for ym in YearMonth::months_of(year)? {
            let month = self
                .monthly_get(partner_id, ym)
                .await?
                .drain_into(&mut advisories);
            if month.is_empty() {
                continue;
            }
            yearly.realized += month.realized;
            yearly.to_pay += month.to_pay;
            yearly.active_months += 1;
            if month.to_pay.is_positive() {
                yearly.pending_count += 1;
            }
        }
        yearly.average_month = yearly.realized.div_rounded(yearly.active_months);

        Ok(Reported::with(yearly, advisories))
    }

    /// Counts one more ledger entry registered in `year`.
    pub async fn year_incr(&self, partner_id: PartnerId, year: i32) -> ResultRollup<Reported<()>> {
        ensure_year(year)?;
        let key = self.keys.year_activity(partner_id);
        let advisories = match self.cache.hash_incr(&key, &year.to_string(), 1).await {
            Ok(_) => Vec::new(),
            Err(err) => vec![Advisory::cache_unavailable(&key, "hash_incr", &err)],
        };
        Ok(Reported::with((), advisories))
    }

    /// Counts one ledger entry of `year` less. Never goes below zero: a
    /// decrement of an absent or zero counter does nothing.
    pub async fn year_decr(&self, partner_id: PartnerId, year: i32) -> ResultRollup<Reported<()>> {
        ensure_year(year)?;
        let key = self.keys.year_activity(partner_id);
        let field = year.to_string();

        let result: Result<(), (&'static str, AggregateStoreError)> = async {
            let stored = self
                .cache
                .hash_get(&key, &field)
                .await
                .map_err(|err| ("hash_get", err))?;
            let floor_at_zero = match stored {
                Some(count) if count > 0 => {
                    let count = self
                        .cache
                        .hash_incr(&key, &field, -1)
                        .await
                        .map_err(|err| ("hash_incr", err))?;
                    // Below zero only when a concurrent decrement won the race.
                    count < 0
                }
                Some(count) => count < 0,
                None => false,
            };
            if floor_at_zero {
                self.cache
                    .hash_set(&key, &field, 0)
                    .await
                    .map_err(|err| ("hash_set", err))?;
            }
            Ok(())
        }
        .await;

        let advisories = match result {
            Ok(()) => Vec::new(),
            Err((operation, err)) => vec![Advisory::cache_unavailable(&key, operation, &err)],
        };
        Ok(Reported::with((), advisories))
    }

    /// Years with registered activity, oldest first. Counters that dropped
    /// back to zero are left out.
    ///
    /// The counter only lives in the Aggregate Store, so an outage here is an
    /// error rather than a fallback.
    pub async fn year_list(&self, partner_id: PartnerId) -> ResultRollup<Vec<YearCount>> {
        let key = self.keys.year_activity(partner_id);
        let fields = self.cache.hash_get_all(&key).await?;

        let mut years: Vec<YearCount> = fields
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .filter_map(|(field, count)| match field.parse::<i32>() {
                Ok(year) => Some(YearCount { year, count }),
                Err(_) => {
                    tracing::warn!(%key, %field, "skipping non-year field in activity hash");
                    None
                }
            })
            .collect();
        years.sort_by_key(|entry| entry.year);
        Ok(years)
    }
}
