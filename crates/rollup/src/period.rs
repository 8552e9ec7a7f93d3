//! Year-month period keys (`ym`).

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{ResultRollup, RollupError};

const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 9999;

/// A calendar month, rendered as the 6-digit `YYYYMM` key used by both stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> ResultRollup<Self> {
        ensure_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(RollupError::InvalidPeriod(format!(
                "month must be 1..=12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The twelve months of `year`, January first.
    pub fn months_of(year: i32) -> ResultRollup<impl Iterator<Item = YearMonth>> {
        ensure_year(year)?;
        Ok((1..=12).map(move |month| YearMonth { year, month }))
    }
}

/// Validates a calendar year for use in period keys.
pub(crate) fn ensure_year(year: i32) -> ResultRollup<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(RollupError::InvalidPeriod(format!(
            "year must have four digits, got {year}"
        )));
    }
    Ok(())
}

impl TryFrom<NaiveDate> for YearMonth {
    type Error = RollupError;

    fn try_from(date: NaiveDate) -> Result<Self, Self::Error> {
        YearMonth::new(date.year(), date.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RollupError::InvalidPeriod(format!("expected YYYYMM, got {s:?}"));
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..].parse().map_err(|_| invalid())?;
        YearMonth::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = RollupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let ym: YearMonth = "202401".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 1);
        assert_eq!(ym.to_string(), "202401");
    }

    #[test]
    fn rejects_bad_keys() {
        assert!("2024-1".parse::<YearMonth>().is_err());
        assert!("202413".parse::<YearMonth>().is_err());
        assert!("202400".parse::<YearMonth>().is_err());
        assert!("2024011".parse::<YearMonth>().is_err());
        assert!("0999 1".parse::<YearMonth>().is_err());
    }

    #[test]
    fn from_date_uses_calendar_month() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(YearMonth::try_from(date).unwrap().to_string(), "202412");
    }

    #[test]
    fn from_date_rejects_years_outside_the_key() {
        let late = NaiveDate::from_ymd_opt(10000, 3, 1).unwrap();
        let early = NaiveDate::from_ymd_opt(999, 12, 31).unwrap();
        assert!(matches!(
            YearMonth::try_from(late),
            Err(RollupError::InvalidPeriod(_))
        ));
        assert!(YearMonth::try_from(early).is_err());
    }

    #[test]
    fn months_of_year_in_order() {
        let months: Vec<String> = YearMonth::months_of(2023)
            .unwrap()
            .map(|ym| ym.to_string())
            .collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months.first().unwrap(), "202301");
        assert_eq!(months.last().unwrap(), "202312");
        assert!(YearMonth::months_of(99).is_err());
    }
}
