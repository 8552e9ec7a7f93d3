use std::sync::Arc;

use crate::{AggregateStore, KeySpace, LedgerStore, MemoryAggregateStore, ResultRollup, RollupError};

mod classification;
mod expenses;
mod monthly;
mod reconcile;
mod transition;
mod yearly;

pub use classification::ClassificationOptions;
pub use expenses::ExpenseFact;
pub use reconcile::MonthReconciliation;
pub use yearly::{YearCount, YearlyRollup};

/// The rollup service.
///
/// Holds the injected store clients; cloning is cheap and clones share the
/// same stores.
#[derive(Clone)]
pub struct Rollups {
    ledger: Arc<dyn LedgerStore>,
    cache: Arc<dyn AggregateStore>,
    keys: KeySpace,
}

impl Rollups {
    /// Return a builder for `Rollups`. Help to build the struct.
    pub fn builder() -> RollupsBuilder {
        RollupsBuilder::default()
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }
}

impl std::fmt::Debug for Rollups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rollups")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// The builder for `Rollups`
#[derive(Default)]
pub struct RollupsBuilder {
    ledger: Option<Arc<dyn LedgerStore>>,
    cache: Option<Arc<dyn AggregateStore>>,
    keys: KeySpace,
}

impl RollupsBuilder {
    /// Pass the required Ledger Store
    pub fn ledger(self, ledger: impl LedgerStore + 'static) -> RollupsBuilder {
        self.shared_ledger(Arc::new(ledger))
    }

    pub fn shared_ledger(mut self, ledger: Arc<dyn LedgerStore>) -> RollupsBuilder {
        self.ledger = Some(ledger);
        self
    }

    /// Pass the Aggregate Store. Defaults to a fresh [`MemoryAggregateStore`].
    pub fn cache(self, cache: impl AggregateStore + 'static) -> RollupsBuilder {
        self.shared_cache(Arc::new(cache))
    }

    pub fn shared_cache(mut self, cache: Arc<dyn AggregateStore>) -> RollupsBuilder {
        self.cache = Some(cache);
        self
    }

    /// Key namespace. Defaults to [`DEFAULT_NAMESPACE`](crate::DEFAULT_NAMESPACE).
    pub fn namespace(mut self, namespace: impl Into<String>) -> RollupsBuilder {
        self.keys = KeySpace::new(namespace);
        self
    }

    /// Construct `Rollups`
    pub fn build(self) -> ResultRollup<Rollups> {
        let ledger = self
            .ledger
            .ok_or(RollupError::MissingComponent("ledger store"))?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryAggregateStore::new()));
        Ok(Rollups {
            ledger,
            cache,
            keys: self.keys,
        })
    }
}
