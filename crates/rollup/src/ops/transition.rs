use chrono::NaiveDate;

use crate::{Bucket, MoneyCents, MonthlyRollup, PartnerId, Reported, ResultRollup, YearMonth};

use super::Rollups;

impl Rollups {
    /// Moves `amount` from one monthly bucket to the other, in the month of
    /// `date`.
    ///
    /// The sign of `amount` is ignored: `from` always loses and `to` always
    /// gains `|amount|`. Each half is its own durable
    /// [`monthly_apply_delta`](Self::monthly_apply_delta); if the second one
    /// fails, the first has already landed and both stores still agree on
    /// the partial result. `from == to` changes nothing and returns the
    /// current totals. A date whose year does not fit the `YYYYMM` key is
    /// rejected before anything is written.
    pub async fn move_amount(
        &self,
        partner_id: PartnerId,
        date: NaiveDate,
        amount: MoneyCents,
        from: Bucket,
        to: Bucket,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let ym = YearMonth::try_from(date)?;
        if from == to {
            return self.monthly_get(partner_id, ym).await;
        }

        let amount = amount.abs();
        let mut advisories = Vec::new();
        self.monthly_apply_delta(partner_id, ym, -amount, from)
            .await?
            .drain_into(&mut advisories);
        let moved = self
            .monthly_apply_delta(partner_id, ym, amount, to)
            .await?
            .drain_into(&mut advisories);

        tracing::debug!(partner_id, %ym, %amount, %from, %to, "moved amount between buckets");
        Ok(Reported::with(moved, advisories))
    }
}
