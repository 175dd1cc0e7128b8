use std::sync::Arc;
use std::time::Instant;

use crate::store::PlatformStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PlatformStore>,
    pub default_actor: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<PlatformStore>, default_actor: String) -> Self {
        assert!(store.is_open(), "State requires an opened store");
        assert!(
            !default_actor.trim().is_empty(),
            "Default audit actor must be non-empty"
        );
        Self {
            store,
            default_actor,
            start_time: Instant::now(),
        }
    }
}
