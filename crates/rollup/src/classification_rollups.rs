//! Realized totals per `(partner, ym, category, sub-category)`.

use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{MoneyCents, PartnerId, ResultRollup, RollupError, YearMonth};

/// Identity of a classification: the numeric category / sub-category pair.
///
/// Rendered as `"<categoryId>:<subCategoryId>"` when used as a hash field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassificationKey {
    pub category_id: i64,
    pub sub_category_id: i64,
}

impl ClassificationKey {
    #[must_use]
    pub const fn new(category_id: i64, sub_category_id: i64) -> Self {
        Self {
            category_id,
            sub_category_id,
        }
    }
}

impl fmt::Display for ClassificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category_id, self.sub_category_id)
    }
}

impl FromStr for ClassificationKey {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            RollupError::InvalidClassification(format!(
                "expected <category>:<sub-category>, got {s:?}"
            ))
        };
        let (category, sub_category) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            category_id: category.trim().parse().map_err(|_| invalid())?,
            sub_category_id: sub_category.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// A classification as the caller knows it: the key plus display labels.
///
/// Labels ride along to spare a join on read; they never identify the row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub key: ClassificationKey,
    pub category_label: String,
    pub sub_category_label: String,
}

impl Classification {
    pub fn new(
        key: ClassificationKey,
        category_label: impl Into<String>,
        sub_category_label: impl Into<String>,
    ) -> Self {
        Self {
            key,
            category_label: category_label.into(),
            sub_category_label: sub_category_label.into(),
        }
    }
}

/// Ledger row of the classification rollup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRollup {
    pub partner_id: PartnerId,
    pub ym: YearMonth,
    pub key: ClassificationKey,
    pub realized: MoneyCents,
    pub category_label: String,
    pub sub_category_label: String,
}

/// One field of the cached per-month classification hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassificationTotal {
    pub key: ClassificationKey,
    pub realized: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "classification_rollups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub partner_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub ym: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub sub_category_id: i64,
    pub realized: i64,
    pub category_label: String,
    pub sub_category_label: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ClassificationRollup {
    type Error = RollupError;

    fn try_from(value: Model) -> ResultRollup<Self> {
        Ok(Self {
            partner_id: value.partner_id,
            ym: value.ym.parse()?,
            key: ClassificationKey::new(value.category_id, value.sub_category_id),
            realized: MoneyCents::new(value.realized),
            category_label: value.category_label,
            sub_category_label: value.sub_category_label,
        })
    }
}

impl From<&ClassificationRollup> for ClassificationTotal {
    fn from(value: &ClassificationRollup) -> Self {
        Self {
            key: value.key,
            realized: value.realized,
        }
    }
}
