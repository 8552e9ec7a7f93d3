//! Errors and advisories raised by the rollup service.
//!
//! Failures come in two tiers:
//!
//! - [`RollupError`] is fatal: the logical operation was aborted and the
//!   caller must see it (Ledger Store failures, unknown rows, bad input).
//! - [`Advisory`] is swallowed: the operation completed against the Ledger
//!   Store, but the cache tier misbehaved or a decrement had to be clamped.
//!   Advisories are logged when raised and handed back inside [`Reported`].
use sea_orm::DbErr;
use thiserror::Error;

use crate::MoneyCents;

/// Fatal rollup errors.
#[derive(Error, Debug)]
pub enum RollupError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Ledger store unavailable: {0}")]
    Ledger(#[from] DbErr),
    #[error("Aggregate store unavailable: {0}")]
    Cache(#[from] AggregateStoreError),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid classification: {0}")]
    InvalidClassification(String),
    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}

impl PartialEq for RollupError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Ledger(a), Self::Ledger(b)) => a.to_string() == b.to_string(),
            (Self::Cache(a), Self::Cache(b)) => a == b,
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidClassification(a), Self::InvalidClassification(b)) => a == b,
            (Self::MissingComponent(a), Self::MissingComponent(b)) => a == b,
            _ => false,
        }
    }
}

/// Errors returned by an [`AggregateStore`](crate::AggregateStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateStoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt value: {0}")]
    Corrupt(String),
}

/// A non-fatal problem met while serving a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advisory {
    /// The Aggregate Store failed; the cached value for `key` may be stale
    /// until the next refresh or reconciliation.
    CacheUnavailable {
        key: String,
        operation: &'static str,
        reason: String,
    },
    /// A decrement would have driven `field` below zero and was clamped.
    InconsistentState {
        key: String,
        field: String,
        shortfall: MoneyCents,
    },
    /// A cached entry could not be decoded and was replaced.
    CorruptEntry { key: String },
}

impl Advisory {
    pub(crate) fn cache_unavailable(
        key: &str,
        operation: &'static str,
        err: &AggregateStoreError,
    ) -> Self {
        tracing::warn!(key, operation, "aggregate store degraded: {err}");
        Self::CacheUnavailable {
            key: key.to_string(),
            operation,
            reason: err.to_string(),
        }
    }

    pub(crate) fn clamped(key: &str, field: &str, shortfall: MoneyCents) -> Self {
        tracing::warn!(
            key,
            field,
            %shortfall,
            "decrement would go below zero, clamped"
        );
        Self::InconsistentState {
            key: key.to_string(),
            field: field.to_string(),
            shortfall,
        }
    }

    pub(crate) fn corrupt(key: &str, err: &serde_json::Error) -> Self {
        tracing::warn!(key, "discarding undecodable cache entry: {err}");
        Self::CorruptEntry {
            key: key.to_string(),
        }
    }

    /// `true` when the advisory means the cache tier is out of date and a
    /// reconciliation should run.
    #[must_use]
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, Self::CacheUnavailable { .. })
    }
}

/// A successful result plus the advisories raised while producing it.
#[derive(Clone, Debug, PartialEq)]
pub struct Reported<T> {
    pub value: T,
    pub advisories: Vec<Advisory>,
}

impl<T> Reported<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }

    pub fn with(value: T, advisories: Vec<Advisory>) -> Self {
        Self { value, advisories }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.advisories.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reported<U> {
        Reported {
            value: f(self.value),
            advisories: self.advisories,
        }
    }

    /// Moves the advisories out, leaving the value.
    pub(crate) fn drain_into(self, sink: &mut Vec<Advisory>) -> T {
        sink.extend(self.advisories);
        self.value
    }
}
