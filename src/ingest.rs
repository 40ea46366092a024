use serde_json::{Number, Value};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::metrics::{COUNTER_RECORDS, INGEST_BATCHES, UPSERT_FAILURES, UPSERTS};
use crate::store::CounterStore;

// Wire quirk: the batch is a flat object and this one key is the shared
// bucket timestamp, every other key is a domain name.
pub const TIMESTAMP_KEY: &str = "timestamp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestBatch {
    pub timestamp: i64,
    pub counts: BTreeMap<String, u64>,
}

impl IngestBatch {
    // Validates the whole payload before anything is written
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::NotAnObject);
        };

        let timestamp = fields
            .remove(TIMESTAMP_KEY)
            .ok_or(ValidationError::MissingTimestamp)?;
        let timestamp = match &timestamp {
            Value::Number(n) => as_integer(n).ok_or(ValidationError::InvalidTimestamp)?,
            _ => return Err(ValidationError::InvalidTimestamp),
        };

        let mut counts = BTreeMap::new();
        for (name, value) in fields {
            if name.is_empty() {
                return Err(ValidationError::EmptyDomain);
            }
            let count = match &value {
                Value::Number(n) => as_count(n),
                _ => None,
            };
            let Some(count) = count else {
                return Err(ValidationError::InvalidCount { name });
            };
            counts.insert(name, count);
        }

        Ok(Self { timestamp, counts })
    }
}

// JavaScript clients send integral floats such as 1.7e9
fn as_integer(n: &Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn as_count(n: &Number) -> Option<u64> {
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub failed: usize,
}

/// Upserts every domain of the batch independently.
///
/// A failed upsert is logged and counted, the remaining domains are still
/// attempted. The batch is not atomic.
pub fn ingest(store: &dyn CounterStore, batch: &IngestBatch) -> IngestReport {
    INGEST_BATCHES.inc();

    let mut report = IngestReport::default();
    for (name, count) in &batch.counts {
        match store.upsert(batch.timestamp, name, *count) {
            Ok(()) => {
                UPSERTS.inc();
                report.accepted += 1;
            }
            Err(e) => {
                UPSERT_FAILURES.inc();
                report.failed += 1;
                tracing::warn!(
                    domain = %name,
                    timestamp = batch.timestamp,
                    error = %e,
                    "failed to upsert domain counter"
                );
            }
        }
    }

    COUNTER_RECORDS.set(store.len() as i64);
    report
}
