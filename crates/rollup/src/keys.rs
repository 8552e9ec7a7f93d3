//! Aggregate Store key layout.
//!
//! Keys are shared with already-deployed cache data, so the layout is fixed:
//!
//! - monthly totals: `<ns>:<partner>:exp:<ym>:despesa`
//! - year activity hash: `<ns>:<partner>:exp:despesa-ano`
//! - classification hash: `<ns>:<partner>:exp:<ym>:despesa-class`

use crate::{PartnerId, YearMonth};

pub const DEFAULT_NAMESPACE: &str = "erp";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn monthly(&self, partner_id: PartnerId, ym: YearMonth) -> String {
        format!("{}:{partner_id}:exp:{ym}:despesa", self.namespace)
    }

    pub fn year_activity(&self, partner_id: PartnerId) -> String {
        format!("{}:{partner_id}:exp:despesa-ano", self.namespace)
    }

    pub fn classification(&self, partner_id: PartnerId, ym: YearMonth) -> String {
        format!("{}:{partner_id}:exp:{ym}:despesa-class", self.namespace)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}
