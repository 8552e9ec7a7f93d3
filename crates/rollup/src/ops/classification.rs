use std::collections::HashMap;

use crate::{
    Advisory, AggregateStoreError, Classification, ClassificationKey, ClassificationRollup,
    ClassificationTotal, MoneyCents, PartnerId, Reported, ResultRollup, RollupError, YearMonth,
};

use super::Rollups;

/// How a classification delta treats the cached hash field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassificationOptions {
    /// Reset a field that went negative back to zero.
    pub clamp_totals_at_zero: bool,
    /// Remove a field that ended at exactly zero.
    pub prune_zero_members: bool,
}

impl ClassificationOptions {
    /// Options used when a ledger fact is deleted: clamp and prune.
    #[must_use]
    pub const fn removal() -> Self {
        Self {
            clamp_totals_at_zero: true,
            prune_zero_members: true,
        }
    }
}

impl Default for ClassificationOptions {
    fn default() -> Self {
        Self {
            clamp_totals_at_zero: true,
            prune_zero_members: false,
        }
    }
}

/// A hash field right after `hash_incr`, next to its ledger row.
#[derive(Clone, Copy, Debug)]
struct FieldUpdate {
    cached: i64,
    delta: i64,
    stored: i64,
}

impl FieldUpdate {
    /// The field was absent before the increment yet the ledger row disagrees
    /// with the delta alone.
    fn restarted(self) -> bool {
        self.cached == self.delta && self.cached != self.stored
    }
}

impl Rollups {
    /// Adds `amount` to the realized total of a classification.
    ///
    /// The ledger row is upserted first; a ledger failure returns before the
    /// cached hash is touched. The hash field then gets the same signed
    /// delta. A field that had gone missing from the hash (cache restart,
    /// `del`) is rewritten with the ledger total instead of restarting at the
    /// delta. A hash failure leaves the hash stale and is reported as a
    /// [`Advisory::CacheUnavailable`] to be fixed by
    /// [`reconcile_month`](Self::reconcile_month).
    pub async fn classification_apply_delta(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        classification: &Classification,
        amount: MoneyCents,
        options: ClassificationOptions,
    ) -> ResultRollup<Reported<ClassificationRollup>> {
        let increment = self
            .ledger
            .increment_classification(partner_id, ym, classification, amount)
            .await?;

        let key = self.keys.classification(partner_id, ym);
        let field = classification.key.to_string();
        let mut advisories = Vec::new();
        if increment.was_clamped() {
            advisories.push(Advisory::clamped(&key, &field, increment.shortfall));
        }

        match self.cache.hash_incr(&key, &field, amount.cents()).await {
            Ok(value) => {
                if let Err((operation, err)) = self
                    .settle_classification_field(
                        &key,
                        &field,
                        FieldUpdate {
                            cached: value,
                            delta: amount.cents(),
                            stored: increment.row.realized.cents(),
                        },
                        options,
                        !increment.was_clamped(),
                        &mut advisories,
                    )
                    .await
                {
                    advisories.push(Advisory::cache_unavailable(&key, operation, &err));
                }
            }
            Err(err) => advisories.push(Advisory::cache_unavailable(&key, "hash_incr", &err)),
        }

        Ok(Reported::with(increment.row, advisories))
    }

    async fn settle_classification_field(
        &self,
        key: &str,
        field: &str,
        update: FieldUpdate,
        options: ClassificationOptions,
        report_clamp: bool,
        advisories: &mut Vec<Advisory>,
    ) -> Result<(), (&'static str, AggregateStoreError)> {
        let mut value = update.cached;
        if update.restarted() {
            // The cache tier lost the field; the ledger row holds the full total.
            value = update.stored;
        } else if value < 0 && options.clamp_totals_at_zero {
            if report_clamp {
                advisories.push(Advisory::clamped(key, field, MoneyCents::new(-value)));
            }
            value = 0;
        }
        if value != update.cached {
            self.cache
                .hash_set(key, field, value)
                .await
                .map_err(|err| ("hash_set", err))?;
        }
        if value == 0 && options.prune_zero_members {
            self.cache
                .hash_del(key, field)
                .await
                .map_err(|err| ("hash_del", err))?;
        }
        Ok(())
    }

    /// The ledger row of one classification.
    pub async fn classification_find(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        key: ClassificationKey,
    ) -> ResultRollup<ClassificationRollup> {
        self.ledger
            .find_classification(partner_id, ym, key)
            .await?
            .ok_or_else(|| RollupError::NotFound(format!("{partner_id}/{ym}/{key}")))
    }

    /// Ledger rows of a partner, for one month or for all of them.
    pub async fn classification_list_by_partner(
        &self,
        partner_id: PartnerId,
        ym: Option<YearMonth>,
    ) -> ResultRollup<Vec<ClassificationRollup>> {
        self.ledger.list_classifications(partner_id, ym).await
    }

    /// Bulk read of a month's classification totals from the cached hash.
    ///
    /// Values are never reported below zero. An empty hash is rebuilt from
    /// the Ledger Store; an unreachable Aggregate Store is bypassed.
    pub async fn classification_totals(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Reported<Vec<ClassificationTotal>>> {
        let key = self.keys.classification(partner_id, ym);
        let mut advisories = Vec::new();

        let repopulate = match self.cache.hash_get_all(&key).await {
            Ok(fields) if !fields.is_empty() => {
                return Ok(Reported::clean(totals_from_fields(&key, fields)));
            }
            Ok(_) => true,
            Err(err) => {
                advisories.push(Advisory::cache_unavailable(&key, "hash_get_all", &err));
                false
            }
        };

        let totals: Vec<ClassificationTotal> = self
            .ledger
            .list_classifications(partner_id, Some(ym))
            .await?
            .iter()
            .filter(|row| row.realized.is_positive())
            .map(ClassificationTotal::from)
            .collect();

        if repopulate {
            for total in &totals {
                if let Err(err) = self
                    .cache
                    .hash_set(&key, &total.key.to_string(), total.realized.cents())
                    .await
                {
                    advisories.push(Advisory::cache_unavailable(&key, "hash_set", &err));
                    break;
                }
            }
        }

        Ok(Reported::with(totals, advisories))
    }
}

fn totals_from_fields(key: &str, fields: HashMap<String, i64>) -> Vec<ClassificationTotal> {
    let mut totals: Vec<ClassificationTotal> = fields
        .into_iter()
        .filter_map(|(field, cents)| match field.parse::<ClassificationKey>() {
            Ok(class_key) => Some(ClassificationTotal {
                key: class_key,
                realized: MoneyCents::new(cents).non_negative(),
            }),
            Err(err) => {
                tracing::warn!(key, %field, "skipping classification field: {err}");
                None
            }
        })
        .collect();
    totals.sort_by_key(|total| total.key);
    totals
}
