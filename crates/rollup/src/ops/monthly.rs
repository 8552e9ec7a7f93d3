use crate::{
    Advisory, Bucket, MoneyCents, MonthlyRollup, PartnerId, Reported, ResultRollup, YearMonth,
};

use super::Rollups;

impl Rollups {
    /// Read-through lookup of the monthly totals.
    ///
    /// - Hit: the cached value, verbatim.
    /// - Miss: the Ledger Store row, or `{0, 0}` when there is none; either
    ///   way the result is cached with no expiry.
    /// - Aggregate Store down: served straight from the Ledger Store without
    ///   caching, with a [`Advisory::CacheUnavailable`].
    pub async fn monthly_get(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let key = self.keys.monthly(partner_id, ym);
        let mut advisories = Vec::new();

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<MonthlyRollup>(&bytes) {
                Ok(cached) => {
                    tracing::debug!(%key, "monthly rollup cache hit");
                    return Ok(Reported::clean(cached));
                }
                Err(err) => advisories.push(Advisory::corrupt(&key, &err)),
            },
            Ok(None) => tracing::debug!(%key, "monthly rollup cache miss"),
            Err(err) => {
                advisories.push(Advisory::cache_unavailable(&key, "get", &err));
                let loaded = self.load_monthly(partner_id, ym).await?;
                return Ok(Reported::with(loaded, advisories));
            }
        }

        let loaded = self.load_monthly(partner_id, ym).await?;
        advisories.extend(self.store_monthly(&key, &loaded).await);
        Ok(Reported::with(loaded, advisories))
    }

    /// Reloads the totals from the Ledger Store and overwrites the cache
    /// entry, whatever it held.
    pub async fn monthly_refresh(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let key = self.keys.monthly(partner_id, ym);
        let loaded = self.load_monthly(partner_id, ym).await?;
        let advisories = self.store_monthly(&key, &loaded).await.into_iter().collect();
        Ok(Reported::with(loaded, advisories))
    }

    /// Drops the cache entry; the next [`monthly_get`](Self::monthly_get)
    /// repopulates it.
    pub async fn monthly_invalidate(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Reported<()>> {
        let key = self.keys.monthly(partner_id, ym);
        let advisories = match self.cache.del(&key).await {
            Ok(()) => Vec::new(),
            Err(err) => vec![Advisory::cache_unavailable(&key, "del", &err)],
        };
        Ok(Reported::with((), advisories))
    }

    /// Adds `amount` (possibly negative) to `bucket`.
    ///
    /// The Ledger Store is incremented first and the cache is then refreshed
    /// from it, so the cache never holds a value the ledger does not. A
    /// result that would fall below zero is stored as zero and reported as
    /// [`Advisory::InconsistentState`].
    pub async fn monthly_apply_delta(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        amount: MoneyCents,
        bucket: Bucket,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let increment = self
            .ledger
            .increment_monthly(partner_id, ym, bucket, amount)
            .await?;

        let mut advisories = Vec::new();
        if increment.was_clamped() {
            advisories.push(Advisory::clamped(
                &self.keys.monthly(partner_id, ym),
                bucket.as_str(),
                increment.shortfall,
            ));
        }

        let refreshed = self
            .monthly_refresh(partner_id, ym)
            .await?
            .drain_into(&mut advisories);
        Ok(Reported::with(refreshed, advisories))
    }

    async fn load_monthly(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<MonthlyRollup> {
        Ok(self
            .ledger
            .find_monthly(partner_id, ym)
            .await?
            .unwrap_or_default())
    }

    async fn store_monthly(&self, key: &str, rollup: &MonthlyRollup) -> Option<Advisory> {
        let bytes = match serde_json::to_vec(rollup) {
            Ok(bytes) => bytes,
            Err(err) => return Some(Advisory::corrupt(key, &err)),
        };
        self.cache
            .set(key, bytes)
            .await
            .err()
            .map(|err| Advisory::cache_unavailable(key, "set", &err))
    }
}
