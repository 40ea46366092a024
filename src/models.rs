use serde::{Deserialize, Serialize};

// Uniqueness key of a counter row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    pub timestamp: i64,
    pub name: String,
}

impl CounterKey {
    pub fn new(timestamp: i64, name: impl Into<String>) -> Self {
        Self {
            timestamp,
            name: name.into(),
        }
    }
}

/// One accumulated counter per (timestamp bucket, domain name).
///
/// `id` is assigned on creation and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub id: u64,
    pub timestamp: i64,
    pub name: String,
    pub requests: u64,
}

impl CounterRecord {
    pub fn key(&self) -> CounterKey {
        CounterKey::new(self.timestamp, self.name.clone())
    }
}

// Aggregated row returned by the statistics endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStat {
    pub name: String,
    pub requests: u64,
}

// Statistics endpoint response format
#[derive(Debug, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub success: String,
    pub domains: Vec<DomainStat>,
}

// Ingestion endpoint response format
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: String,
    pub accepted: usize,
    pub failed: usize,
}
