use std::sync::Arc;
use crate::store::CounterStore;
use crate::window::Aggregator;
// app's shared state, handed to every handler

pub struct AppState {
    pub store: Arc<dyn CounterStore>,
    pub aggregator: Aggregator, // window queries over the same store
}

impl AppState {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            aggregator: Aggregator::new(Arc::clone(&store)),
            store,
        }
    }
}
