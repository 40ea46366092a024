pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod shutdown;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod window;

pub use error::{ApiError, StoreError, ValidationError};
pub use state::AppState;
pub use store::{CounterStore, MemoryStore};
pub use window::{Aggregator, WindowKind};
