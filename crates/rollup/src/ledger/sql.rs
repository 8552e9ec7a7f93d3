use async_trait::async_trait;
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::{Expr, OnConflict, SimpleExpr},
};

use super::{Increment, LedgerStore};
use crate::{
    Bucket, Classification, ClassificationKey, ClassificationRollup, MoneyCents, MonthlyRollup,
    PartnerId, ResultRollup, RollupError, YearMonth, classification_rollups, monthly_rollups,
};

/// [`LedgerStore`] over `sea-orm`.
///
/// Increments are single `INSERT .. ON CONFLICT DO UPDATE` statements whose
/// update clause is `MAX(0, <column> + delta)`, so concurrent deltas on the
/// same key never overwrite each other.
#[derive(Clone, Debug)]
pub struct SqlLedger {
    database: DatabaseConnection,
}

impl SqlLedger {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

/// `MAX(0, "<column>" + delta)`, evaluated against the existing row.
fn clamped_increment(column: &str, delta: MoneyCents) -> SimpleExpr {
    Expr::cust_with_values(format!("MAX(0, \"{column}\" + ?)"), [delta.cents()])
}

/// How much of `delta` the zero clamp swallowed, given the value before.
fn shortfall(previous: MoneyCents, delta: MoneyCents) -> MoneyCents {
    (-(previous + delta)).non_negative()
}

#[async_trait]
impl LedgerStore for SqlLedger {
    async fn find_monthly(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
    ) -> ResultRollup<Option<MonthlyRollup>> {
        let model = monthly_rollups::Entity::find_by_id((partner_id, ym.to_string()))
            .one(&self.database)
            .await?;
        Ok(model.as_ref().map(MonthlyRollup::from))
    }

    async fn increment_monthly(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        bucket: Bucket,
        delta: MoneyCents,
    ) -> ResultRollup<Increment<MonthlyRollup>> {
        let id = (partner_id, ym.to_string());
        let initial = |b: Bucket| {
            if b == bucket {
                delta.non_negative().cents()
            } else {
                0
            }
        };

        let db_tx = self.database.begin().await?;
        let previous = monthly_rollups::Entity::find_by_id(id.clone())
            .one(&db_tx)
            .await?
            .map(|model| MonthlyRollup::from(&model).get(bucket))
            .unwrap_or_default();

        let row = monthly_rollups::ActiveModel {
            partner_id: ActiveValue::Set(partner_id),
            ym: ActiveValue::Set(id.1.clone()),
            realized: ActiveValue::Set(initial(Bucket::Realized)),
            to_pay: ActiveValue::Set(initial(Bucket::ToPay)),
        };
        monthly_rollups::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    monthly_rollups::Column::PartnerId,
                    monthly_rollups::Column::Ym,
                ])
                .value(
                    monthly_rollups::Column::for_bucket(bucket),
                    clamped_increment(bucket.as_str(), delta),
                )
                .to_owned(),
            )
            .exec_without_returning(&db_tx)
            .await?;

        let stored = monthly_rollups::Entity::find_by_id(id)
            .one(&db_tx)
            .await?
            .ok_or_else(|| RollupError::NotFound(format!("monthly rollup {partner_id}/{ym}")))?;
        db_tx.commit().await?;

        Ok(Increment {
            row: MonthlyRollup::from(&stored),
            shortfall: shortfall(previous, delta),
        })
    }

    async fn find_classification(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        key: ClassificationKey,
    ) -> ResultRollup<Option<ClassificationRollup>> {
        classification_rollups::Entity::find_by_id((
            partner_id,
            ym.to_string(),
            key.category_id,
            key.sub_category_id,
        ))
        .one(&self.database)
        .await?
        .map(ClassificationRollup::try_from)
        .transpose()
    }

    async fn list_classifications(
        &self,
        partner_id: PartnerId,
        ym: Option<YearMonth>,
    ) -> ResultRollup<Vec<ClassificationRollup>> {
        let mut query = classification_rollups::Entity::find()
            .filter(classification_rollups::Column::PartnerId.eq(partner_id));
        if let Some(ym) = ym {
            query = query.filter(classification_rollups::Column::Ym.eq(ym.to_string()));
        }

        query
            .order_by_asc(classification_rollups::Column::Ym)
            .order_by_asc(classification_rollups::Column::CategoryId)
            .order_by_asc(classification_rollups::Column::SubCategoryId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ClassificationRollup::try_from)
            .collect()
    }

    async fn increment_classification(
        &self,
        partner_id: PartnerId,
        ym: YearMonth,
        classification: &Classification,
        delta: MoneyCents,
    ) -> ResultRollup<Increment<ClassificationRollup>> {
        let key = classification.key;
        let id = (
            partner_id,
            ym.to_string(),
            key.category_id,
            key.sub_category_id,
        );

        let db_tx = self.database.begin().await?;
        let previous = classification_rollups::Entity::find_by_id(id.clone())
            .one(&db_tx)
            .await?
            .map(|model| MoneyCents::new(model.realized))
            .unwrap_or_default();

        let row = classification_rollups::ActiveModel {
            partner_id: ActiveValue::Set(partner_id),
            ym: ActiveValue::Set(id.1.clone()),
            category_id: ActiveValue::Set(key.category_id),
            sub_category_id: ActiveValue::Set(key.sub_category_id),
            realized: ActiveValue::Set(delta.non_negative().cents()),
            category_label: ActiveValue::Set(classification.category_label.clone()),
            sub_category_label: ActiveValue::Set(classification.sub_category_label.clone()),
        };
        classification_rollups::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    classification_rollups::Column::PartnerId,
                    classification_rollups::Column::Ym,
                    classification_rollups::Column::CategoryId,
                    classification_rollups::Column::SubCategoryId,
                ])
                .update_columns([
                    classification_rollups::Column::CategoryLabel,
                    classification_rollups::Column::SubCategoryLabel,
                ])
                .value(
                    classification_rollups::Column::Realized,
                    clamped_increment("realized", delta),
                )
                .to_owned(),
            )
            .exec_without_returning(&db_tx)
            .await?;

        let stored = classification_rollups::Entity::find_by_id(id)
            .one(&db_tx)
            .await?
            .ok_or_else(|| {
                RollupError::NotFound(format!("classification rollup {partner_id}/{ym}/{key}"))
            })?;
        db_tx.commit().await?;

        Ok(Increment {
            row: ClassificationRollup::try_from(stored)?,
            shortfall: shortfall(previous, delta),
        })
    }
}
