//! Entry points for the services that create, change and delete expenses
//! and accounts-payable installments.
//!
//! Every call fans out to the monthly totals, the classification totals and
//! the year-activity counter. Those are independent writes: a failure in one
//! leaves the others applied, and the Ledger Store rows stay the reference
//! for [`Rollups::reconcile_month`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    Bucket, Classification, MoneyCents, MonthlyRollup, PartnerId, Reported, ResultRollup,
    YearMonth, period::ensure_year,
};

use super::{ClassificationOptions, Rollups};

/// A ledger fact as the rollups see it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseFact {
    pub partner_id: PartnerId,
    /// Taken as an absolute value.
    pub amount: MoneyCents,
    /// Date the entry was registered; drives the year-activity counter.
    pub registered_on: NaiveDate,
    /// Date the obligation falls due; drives the month.
    pub due_on: NaiveDate,
    pub paid: bool,
    pub classification: Option<Classification>,
}

impl ExpenseFact {
    /// An expense settled on the spot.
    pub fn immediate(partner_id: PartnerId, amount: MoneyCents, date: NaiveDate) -> Self {
        Self {
            partner_id,
            amount,
            registered_on: date,
            due_on: date,
            paid: true,
            classification: None,
        }
    }

    /// An unpaid installment due on `due_on`.
    pub fn installment(
        partner_id: PartnerId,
        amount: MoneyCents,
        registered_on: NaiveDate,
        due_on: NaiveDate,
    ) -> Self {
        Self {
            partner_id,
            amount,
            registered_on,
            due_on,
            paid: false,
            classification: None,
        }
    }

    #[must_use]
    pub fn classified(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        if self.paid {
            Bucket::Realized
        } else {
            Bucket::ToPay
        }
    }

    /// Month the fact counts in. Fails when the due date's year does not fit
    /// a `YYYYMM` key.
    pub fn period(&self) -> ResultRollup<YearMonth> {
        YearMonth::try_from(self.due_on)
    }

    /// Checks both dates before anything is written.
    fn validate(&self) -> ResultRollup<YearMonth> {
        ensure_year(self.registered_on.year())?;
        self.period()
    }
}

impl Rollups {
    /// A new ledger fact was stored.
    pub async fn record_expense(
        &self,
        fact: &ExpenseFact,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        fact.validate()?;
        let mut advisories = Vec::new();
        let month = self
            .contribute(fact, fact.amount.abs(), ClassificationOptions::default())
            .await?
            .drain_into(&mut advisories);
        self.year_incr(fact.partner_id, fact.registered_on.year())
            .await?
            .drain_into(&mut advisories);
        Ok(Reported::with(month, advisories))
    }

    /// A ledger fact was deleted.
    pub async fn remove_expense(
        &self,
        fact: &ExpenseFact,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        fact.validate()?;
        let mut advisories = Vec::new();
        let month = self
            .contribute(fact, -fact.amount.abs(), ClassificationOptions::removal())
            .await?
            .drain_into(&mut advisories);
        self.year_decr(fact.partner_id, fact.registered_on.year())
            .await?
            .drain_into(&mut advisories);
        Ok(Reported::with(month, advisories))
    }

    /// A ledger fact was edited: withdraws what `before` contributed and adds
    /// what `after` contributes. Returns the totals of `after`'s month.
    pub async fn revise_expense(
        &self,
        before: &ExpenseFact,
        after: &ExpenseFact,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        before.validate()?;
        after.validate()?;
        let mut advisories = Vec::new();
        self.contribute(before, -before.amount.abs(), ClassificationOptions::removal())
            .await?
            .drain_into(&mut advisories);
        let month = self
            .contribute(after, after.amount.abs(), ClassificationOptions::default())
            .await?
            .drain_into(&mut advisories);

        let before_year = (before.partner_id, before.registered_on.year());
        let after_year = (after.partner_id, after.registered_on.year());
        if before_year != after_year {
            self.year_decr(before_year.0, before_year.1)
                .await?
                .drain_into(&mut advisories);
            self.year_incr(after_year.0, after_year.1)
                .await?
                .drain_into(&mut advisories);
        }
        Ok(Reported::with(month, advisories))
    }

    /// An unpaid installment was paid: its amount moves from `to_pay` to
    /// `realized` and starts counting for its classification. Already paid
    /// facts are left alone.
    pub async fn settle_installment(
        &self,
        fact: &ExpenseFact,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        if fact.paid {
            return self.monthly_get(fact.partner_id, fact.period()?).await;
        }
        self.shift(fact, Bucket::ToPay, Bucket::Realized).await
    }

    /// A paid installment was marked unpaid again.
    pub async fn unsettle_installment(
        &self,
        fact: &ExpenseFact,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        if !fact.paid {
            return self.monthly_get(fact.partner_id, fact.period()?).await;
        }
        self.shift(fact, Bucket::Realized, Bucket::ToPay).await
    }

    async fn shift(
        &self,
        fact: &ExpenseFact,
        from: Bucket,
        to: Bucket,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let ym = fact.period()?;
        let amount = fact.amount.abs();
        let mut advisories = Vec::new();
        let month = self
            .move_amount(fact.partner_id, fact.due_on, amount, from, to)
            .await?
            .drain_into(&mut advisories);

        if let Some(classification) = &fact.classification {
            let (delta, options) = match to {
                Bucket::Realized => (amount, ClassificationOptions::default()),
                Bucket::ToPay => (-amount, ClassificationOptions::removal()),
            };
            self.classification_apply_delta(
                fact.partner_id,
                ym,
                classification,
                delta,
                options,
            )
            .await?
            .drain_into(&mut advisories);
        }
        Ok(Reported::with(month, advisories))
    }

    /// Applies `amount` to the fact's bucket, and to its classification when
    /// the fact is realized.
    async fn contribute(
        &self,
        fact: &ExpenseFact,
        amount: MoneyCents,
        options: ClassificationOptions,
    ) -> ResultRollup<Reported<MonthlyRollup>> {
        let ym = fact.period()?;
        let bucket = fact.bucket();
        let mut advisories = Vec::new();

        let month = self
            .monthly_apply_delta(fact.partner_id, ym, amount, bucket)
            .await?
            .drain_into(&mut advisories);

        if bucket == Bucket::Realized
            && let Some(classification) = &fact.classification
        {
            self.classification_apply_delta(fact.partner_id, ym, classification, amount, options)
                .await?
                .drain_into(&mut advisories);
        }
        Ok(Reported::with(month, advisories))
    }
}
