//! Monthly `(partner, ym)` totals.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// Which monthly total a ledger fact contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Settled obligations.
    Realized,
    /// Outstanding obligations with a future due date.
    ToPay,
}

impl Bucket {
    /// Column / field name used by both stores.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Realized => "realized",
            Self::ToPay => "to_pay",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two monthly totals of a partner.
///
/// This is also the cached value, serialized as
/// `{"realized":<cents>,"to_pay":<cents>}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub realized: MoneyCents,
    pub to_pay: MoneyCents,
}

impl MonthlyRollup {
    pub const ZERO: MonthlyRollup = MonthlyRollup {
        realized: MoneyCents::ZERO,
        to_pay: MoneyCents::ZERO,
    };

    #[must_use]
    pub const fn new(realized: MoneyCents, to_pay: MoneyCents) -> Self {
        Self { realized, to_pay }
    }

    #[must_use]
    pub const fn get(&self, bucket: Bucket) -> MoneyCents {
        match bucket {
            Bucket::Realized => self.realized,
            Bucket::ToPay => self.to_pay,
        }
    }

    /// `true` when both totals are zero (no activity, or activity that
    /// netted out).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.realized.is_zero() && self.to_pay.is_zero()
    }

    #[must_use]
    pub fn total(&self) -> MoneyCents {
        self.realized + self.to_pay
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "monthly_rollups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub partner_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub ym: String,
    pub realized: i64,
    pub to_pay: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Column {
    pub(crate) fn for_bucket(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Realized => Column::Realized,
            Bucket::ToPay => Column::ToPay,
        }
    }
}

impl From<&Model> for MonthlyRollup {
    fn from(value: &Model) -> Self {
        Self {
            realized: MoneyCents::new(value.realized),
            to_pay: MoneyCents::new(value.to_pay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_json_layout() {
        let rollup = MonthlyRollup::new(MoneyCents::new(10000), MoneyCents::ZERO);
        let json = serde_json::to_string(&rollup).unwrap();
        assert_eq!(json, r#"{"realized":10000,"to_pay":0}"#);
        let back: MonthlyRollup = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rollup);
    }

    #[test]
    fn empty_only_when_both_zero() {
        assert!(MonthlyRollup::ZERO.is_empty());
        assert!(!MonthlyRollup::new(MoneyCents::ZERO, MoneyCents::new(1)).is_empty());
    }
}
