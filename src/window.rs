use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::DomainStat;
use crate::store::CounterStore;

// How many domains a statistics query returns
pub const TOP_DOMAINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    LastMinute,
    LastHour,
}

impl WindowKind {
    /// Epoch-second range `[from, to)` of the last complete minute or hour
    /// before `now`. The partial current minute/hour is never included.
    pub fn bounds(self, now: DateTime<Utc>) -> (i64, i64) {
        let (elapsed, span) = match self {
            Self::LastMinute => (i64::from(now.second()), 60),
            Self::LastHour => (i64::from(now.second() + now.minute() * 60), 60 * 60),
        };
        let to = now.timestamp() - elapsed;
        (to - span, to)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::LastMinute => "last_minute",
            Self::LastHour => "last_hour",
        }
    }
}

// Turns a window into a range query against the counter store
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn CounterStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn top_domains(
        &self,
        kind: WindowKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainStat>, StoreError> {
        let (from, to) = kind.bounds(now);
        self.store.top_n_by_range(from, to, TOP_DOMAINS)
    }
}
