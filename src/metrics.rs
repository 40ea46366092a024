use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};

lazy_static! {
    pub static ref INGEST_BATCHES: IntCounter =
        register_int_counter!("requesty_ingest_batches_total", "Total ingested batches").unwrap();
    pub static ref UPSERTS: IntCounter =
        register_int_counter!("requesty_upserts_total", "Total successful upserts").unwrap();
    pub static ref UPSERT_FAILURES: IntCounter =
        register_int_counter!("requesty_upsert_failures_total", "Total failed upserts").unwrap();
    pub static ref STATISTICS_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "requesty_statistics_requests_total",
        "Total statistics requests by window",
        &["window"]
    )
    .unwrap();
    pub static ref STATISTICS_LATENCY: Histogram = register_histogram!(
        "requesty_statistics_latency_seconds",
        "Statistics query latency in seconds"
    )
    .unwrap();
    pub static ref COUNTER_RECORDS: IntGauge =
        register_int_gauge!("requesty_counter_records", "Current counter records").unwrap();
}
